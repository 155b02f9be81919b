//! Per-host bootstrap — pushes binaries and runs the install scripts.
//!
//! The sequence is fixed: agent binary, skiff binary, self check, init
//! script, control-plane hosts entry, join script. Any transport
//! failure aborts this host's bootstrap with the step tagged in the
//! error. Retry policy belongs to the caller.

use std::sync::Arc;

use tracing::{debug, info};

use skiff_transport::{Transport, TransportError};

use crate::error::{BootstrapError, BootstrapStep};
use crate::paths::{self, ClusterPaths};

/// Bootstraps one host into the cluster.
#[derive(Clone)]
pub struct NodeBootstrapper {
    transport: Arc<dyn Transport>,
    paths: ClusterPaths,
}

impl NodeBootstrapper {
    pub fn new(transport: Arc<dyn Transport>, paths: ClusterPaths) -> Self {
        Self { transport, paths }
    }

    /// Run the full bootstrap sequence against `host`, wiring it to the
    /// control plane at `control_plane` (for the init node the two are
    /// the same address).
    pub async fn bootstrap(&self, host: &str, control_plane: &str) -> Result<(), BootstrapError> {
        let fail = |step: BootstrapStep, source: TransportError| BootstrapError {
            host: host.to_string(),
            step,
            source,
        };

        debug!(%host, %control_plane, "bootstrapping node");

        let agent_bin = paths::agent_bin_local(&self.paths.data_dir);
        self.transport
            .copy(host, &agent_bin, paths::AGENT_BIN_REMOTE)
            .await
            .map_err(|e| fail(BootstrapStep::CopyAgent, e))?;

        self.transport
            .copy(host, &self.paths.self_bin, paths::SELF_BIN_REMOTE)
            .await
            .map_err(|e| fail(BootstrapStep::CopySelf, e))?;

        self.transport
            .exec(host, paths::SELF_CHECK_COMMAND)
            .await
            .map_err(|e| fail(BootstrapStep::SelfCheck, e))?;

        self.transport
            .exec(host, &paths::init_script(&self.paths.data_dir))
            .await
            .map_err(|e| fail(BootstrapStep::InitScript, e))?;
        info!(%host, "init script complete");

        // Pin the control-plane DNS name in /etc/hosts so bootstrap
        // never depends on real DNS. Replace any stale entry first.
        let hosts_entry = format!(
            "sed -i '/ {dns}$/d' /etc/hosts && echo '{addr} {dns}' >> /etc/hosts",
            dns = paths::CONTROL_PLANE_DNS,
            addr = control_plane,
        );
        self.transport
            .exec(host, &hosts_entry)
            .await
            .map_err(|e| fail(BootstrapStep::HostsEntry, e))?;

        self.transport
            .exec(host, &paths::join_script(&self.paths.data_dir))
            .await
            .map_err(|e| fail(BootstrapStep::JoinScript, e))?;
        info!(%host, "node bootstrap complete");

        Ok(())
    }
}
