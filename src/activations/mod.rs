//! # Activation Functions Module
//!
//! Element-wise non-linearities applied by the dense layers of the value
//! network. Hidden layers default to ReLU; the output layer is always
//! linear so Q-values are unbounded.

pub mod functions;

pub use functions::Activation;
