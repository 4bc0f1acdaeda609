use thiserror::Error;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, DqnError>;

/// Main error type for the DQN agent
#[derive(Debug, Error)]
pub enum DqnError {
    /// Invalid dimensions for an operation
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid configuration value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Action outside of the legal action set
    #[error("Invalid action {action}: must be less than {max_actions}")]
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Not enough transitions stored to draw a minibatch
    #[error("Insufficient data: need {required} transitions, have {available}")]
    InsufficientData {
        required: usize,
        available: usize,
    },

    /// An operation was called before `initialize()`
    #[error("Agent not initialized: call initialize() first")]
    NotInitialized,

    /// Numerical computation errors
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// IO errors (model and solver files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON configuration errors
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

// Helper functions for common error patterns
impl DqnError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DqnError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DqnError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
