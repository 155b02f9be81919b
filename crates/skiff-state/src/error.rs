//! Error types for state persistence.

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur loading or saving the cluster state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to read state file: {0}")]
    Read(String),

    #[error("failed to write state file: {0}")]
    Write(String),

    #[error("failed to serialize state: {0}")]
    Serialize(String),

    #[error("failed to deserialize state: {0}")]
    Deserialize(String),
}
