//! Error types for the bootstrap transport.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur during transport operations.
///
/// Every variant carries the target host plus enough context to name
/// the operation that failed; callers decide whether the failure is
/// fatal.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("copy {} -> {host}:{remote} failed: {reason}", local.display())]
    Copy {
        host: String,
        local: PathBuf,
        remote: String,
        reason: String,
    },

    #[error("fetch {host}:{remote} -> {} failed: {reason}", local.display())]
    Fetch {
        host: String,
        remote: String,
        local: PathBuf,
        reason: String,
    },

    #[error("exec `{command}` on {host} failed: {reason}")]
    Exec {
        host: String,
        command: String,
        reason: String,
    },

    #[error("host {host} unreachable: {reason}")]
    Unreachable { host: String, reason: String },
}

impl TransportError {
    /// The host the failed operation targeted.
    pub fn host(&self) -> &str {
        match self {
            Self::Copy { host, .. }
            | Self::Fetch { host, .. }
            | Self::Exec { host, .. }
            | Self::Unreachable { host, .. } => host,
        }
    }
}
