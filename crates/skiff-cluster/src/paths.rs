//! Fixed paths consumed during bootstrap.
//!
//! Remote paths are contracts with the on-host scripts: the init script
//! expects the agent binary, the skiff binary, and the rendered service
//! definition at these exact locations.

use std::io;
use std::path::{Path, PathBuf};

/// Remote path of the agent (k3s) binary.
pub const AGENT_BIN_REMOTE: &str = "/usr/local/bin/k3s";

/// Remote path of skiff's own binary, used for the on-host self check.
pub const SELF_BIN_REMOTE: &str = "/usr/local/bin/skiff";

/// Remote path of the rendered per-host service definition.
pub const AGENT_SERVICE_REMOTE: &str = "/etc/systemd/system/k3s.service";

/// Static DNS name mapped to the control-plane address in /etc/hosts,
/// so bootstrap never depends on real DNS.
pub const CONTROL_PLANE_DNS: &str = "kubeapi.skiff.local";

/// Remote path of the generated client credentials on the control plane.
pub const REMOTE_KUBECONFIG: &str = "/etc/rancher/k3s/k3s.yaml";

/// Command run on every freshly bootstrapped host to verify the copied
/// skiff binary works before any scripts run.
pub const SELF_CHECK_COMMAND: &str = "/usr/local/bin/skiff version";

/// NodePort where the system workload answers once the cluster serves it.
pub const WORKLOAD_PORT: u16 = 32379;

/// Remote path of the host-level init script (idempotent).
pub fn init_script(data_dir: &Path) -> String {
    format!("{}/scripts/init.sh", data_dir.display())
}

/// Remote path of the node-join script.
pub fn join_script(data_dir: &Path) -> String {
    format!("{}/scripts/node.sh", data_dir.display())
}

/// Remote path of the teardown script.
pub fn clean_script(data_dir: &Path) -> String {
    format!("{}/scripts/cleankube.sh", data_dir.display())
}

/// Local path of the platform-specific agent binary to push.
pub fn agent_bin_local(data_dir: &Path) -> PathBuf {
    data_dir.join("bin").join(format!(
        "k3s-{}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    ))
}

/// Local filesystem layout, passed explicitly into every component.
#[derive(Debug, Clone)]
pub struct ClusterPaths {
    /// Data directory; mirrors the remote layout for scripts and binaries.
    pub data_dir: PathBuf,
    /// Local cache of rendered per-host manifests.
    pub cache_dir: PathBuf,
    /// Local path the fetched control-plane credentials are written to.
    pub kubeconfig: PathBuf,
    /// This orchestrator's own executable, pushed to every host.
    pub self_bin: PathBuf,
}

impl ClusterPaths {
    pub fn new(data_dir: impl Into<PathBuf>, self_bin: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            cache_dir: data_dir.join("cache"),
            kubeconfig: data_dir.join("kubeconfig"),
            data_dir,
            self_bin: self_bin.into(),
        }
    }

    /// Build paths using the currently running executable as `self_bin`.
    pub fn discover(data_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let self_bin = std::env::current_exe()?;
        Ok(Self::new(data_dir, self_bin))
    }

    /// Default location of the persisted cluster state.
    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("cluster.json")
    }
}
