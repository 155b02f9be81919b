//! Membership deregistration through the fetched kubeconfig.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use skiff_cluster::MembershipApi;

/// Deregisters nodes by shelling out to `kubectl` with the kubeconfig
/// fetched during control-plane initialization.
pub struct KubectlMembership {
    kubeconfig: PathBuf,
}

impl KubectlMembership {
    pub fn new(kubeconfig: PathBuf) -> Self {
        Self { kubeconfig }
    }
}

#[async_trait]
impl MembershipApi for KubectlMembership {
    async fn remove_node(&self, host: &str) -> anyhow::Result<()> {
        debug!(%host, "deregistering node via kubectl");
        let output = Command::new("kubectl")
            .arg("--kubeconfig")
            .arg(&self.kubeconfig)
            .args(["delete", "node", host])
            .output()
            .await
            .context("spawning kubectl")?;
        if !output.status.success() {
            anyhow::bail!(
                "kubectl delete node {host}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
