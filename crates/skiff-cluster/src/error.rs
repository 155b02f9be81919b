//! Error taxonomy for cluster orchestration.
//!
//! Control-plane-formation failures propagate unmodified to the
//! top-level caller; per-host join/removal/cleanup failures are caught
//! at the assembler/teardown boundary, logged, and never propagate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use skiff_state::StateError;
use skiff_transport::TransportError;

/// Result type alias for orchestration operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Which step of the per-host bootstrap sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    CopyAgent,
    CopySelf,
    SelfCheck,
    InitScript,
    HostsEntry,
    JoinScript,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CopyAgent => "copy agent binary",
            Self::CopySelf => "copy skiff binary",
            Self::SelfCheck => "self check",
            Self::InitScript => "init script",
            Self::HostsEntry => "hosts entry",
            Self::JoinScript => "join script",
        };
        f.write_str(name)
    }
}

/// A failure inside the per-host bootstrap sequence, tagged with the
/// host, the step that failed, and the underlying transport cause.
#[derive(Debug, Error)]
#[error("bootstrap of {host} failed at {step}: {source}")]
pub struct BootstrapError {
    pub host: String,
    pub step: BootstrapStep,
    #[source]
    pub source: TransportError,
}

/// Errors that can surface from the orchestration core.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("control plane not ready after {attempts} attempts")]
    ReadinessTimeout { attempts: u32 },

    #[error(transparent)]
    State(#[from] StateError),

    #[error("failed to write manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("no master candidates provided")]
    NoMasters,

    #[error("no cluster state found, initialize a cluster first")]
    NoCluster,
}
