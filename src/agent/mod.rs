//! # DQN Agent
//!
//! The agent ties together the replay memory, the epsilon-greedy policy and
//! the primary/target network pair.
//!
//! ## Update cycle
//!
//! Each [`DqnAgent::update`] call:
//!
//! 1. samples one minibatch (with replacement) from the replay memory,
//! 2. evaluates every non-terminal successor with the target network,
//! 3. builds one-hot masked targets `r` or `r + γ · max_a' Q_target(s', a')`,
//! 4. trains the primary network for one step on those targets,
//! 5. copies the primary into the target when the iteration counter is a
//!    multiple of `clone_frequency`.
//!
//! Steps 2 and 3 live in [`update`] as pure functions so they can be driven
//! with any [`ValueFunction`](crate::network::ValueFunction).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hfo_dqn::agent::DqnAgentBuilder;
//!
//! let mut agent = DqnAgentBuilder::new()
//!     .gamma(0.99)
//!     .clone_frequency(10_000)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//! assert_eq!(agent.current_iteration(), 0);
//! ```

mod dqn;
pub mod update;

pub use dqn::{DqnAgent, DqnAgentBuilder, UpdateStats};
pub use update::{build_minibatch, td_target, Minibatch};
