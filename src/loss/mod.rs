//! Losses for training the value network.

pub mod functions;

pub use functions::{Loss, MaskedEuclideanLoss};
