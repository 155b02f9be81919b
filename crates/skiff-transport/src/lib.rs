//! skiff-transport — the bootstrap transport for skiff.
//!
//! Everything skiff does to a host goes through the [`Transport`] trait:
//! push a file, pull a file, run a command, probe reachability. The
//! default implementation ([`SshTransport`]) shells out to the system
//! `ssh`/`scp` binaries; tests use the in-memory [`ScriptedTransport`],
//! which records every call and can be programmed to fail.
//!
//! All operations block their caller until the remote side returns.
//! The transport never retries — retry policy belongs to the caller.

use std::path::Path;

use async_trait::async_trait;

pub mod error;
pub mod script;
pub mod ssh;

pub use error::{TransportError, TransportResult};
pub use script::ScriptedTransport;
pub use ssh::{SshCredentials, SshTransport};

/// Remote-execution channel used to configure hosts.
///
/// Implementations must be shareable across tasks: teardown fans out
/// one task per host over a single transport handle.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Push a local file to a path on the remote host.
    async fn copy(&self, host: &str, local: &Path, remote: &str) -> TransportResult<()>;

    /// Pull a remote file to a local path.
    async fn fetch(&self, host: &str, remote: &str, local: &Path) -> TransportResult<()>;

    /// Run a command on the remote host and wait for it to finish.
    async fn exec(&self, host: &str, command: &str) -> TransportResult<()>;

    /// Check whether the host is reachable over the transport.
    async fn probe(&self, host: &str) -> TransportResult<()>;
}
