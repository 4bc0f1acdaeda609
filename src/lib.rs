//! # HFO DQN - Deep Q-Network agent for Half Field Offense
//!
//! A value-based reinforcement learning agent for the robotic-soccer
//! environment. Observations are fixed-length feature vectors; the agent
//! stacks the most recent two into an input history, picks actions
//! epsilon-greedily from a multilayer perceptron and learns from uniformly
//! replayed transitions against a periodically refreshed target network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hfo_dqn::agent::DqnAgent;
//! use hfo_dqn::config::DqnConfig;
//! use hfo_dqn::types::{InputHistory, StateObservation, Transition, STATE_DATA_SIZE};
//!
//! let mut agent = DqnAgent::new(DqnConfig::default())?;
//! agent.initialize()?;
//!
//! let first = StateObservation::new(vec![0.0; STATE_DATA_SIZE]);
//! let history = InputHistory::repeat(first)?;
//! let action = agent.select_action(&history, 0.1)?;
//!
//! let next = history.push(StateObservation::new(vec![0.5; STATE_DATA_SIZE]))?;
//! agent.add_transition(Transition::continuing(history, action, 0.0, next))?;
//! # Ok::<(), hfo_dqn::error::DqnError>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Hidden-layer activation functions
//! - [`agent`] - The DQN agent and its update engine
//! - [`config`] - Serializable agent configuration
//! - [`error`] - Error types and result handling
//! - [`layers`] - Dense layers and weight initialization
//! - [`loss`] - Masked Euclidean loss
//! - [`network`] - Primary and target value networks
//! - [`optimizer`] - Solver, optimizers, learning-rate schedules, clipping
//! - [`policy`] - Epsilon-greedy action selection
//! - [`replay_buffer`] - Bounded FIFO replay memory
//! - [`types`] - Observations, histories, transitions and fixed dimensions

pub mod activations;
pub mod agent;
pub mod config;
pub mod error;
pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizer;
pub mod policy;
pub mod replay_buffer;
pub mod types;

#[cfg(test)]
mod tests;

pub use agent::{DqnAgent, DqnAgentBuilder, UpdateStats};
pub use config::DqnConfig;
pub use error::{DqnError, Result};
pub use types::{Action, InputHistory, StateObservation, Successor, Transition};
