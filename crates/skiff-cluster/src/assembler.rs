//! Cluster assembly — sequencing and failure policy.
//!
//! The control plane is a hard single dependency: its failure halts
//! everything. Individual nodes are independent: an unreachable or
//! failed candidate is logged and skipped, and the remaining candidates
//! are still attempted. Joins run strictly sequentially because each
//! join depends on the control-plane address being resolvable.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use skiff_state::{ClusterState, NodeRole, StateFile};
use skiff_transport::Transport;

use crate::error::{ClusterError, ClusterResult};
use crate::paths::ClusterPaths;
use crate::provision::{ControlPlaneInitializer, NodeJoiner};
use crate::readiness::BackoffConfig;
use crate::spec::ClusterSpec;

/// Sequences dedup, control-plane formation, and best-effort joins.
pub struct ClusterAssembler {
    transport: Arc<dyn Transport>,
    state_file: StateFile,
    paths: ClusterPaths,
    backoff: BackoffConfig,
}

impl ClusterAssembler {
    pub fn new(
        transport: Arc<dyn Transport>,
        state_file: StateFile,
        paths: ClusterPaths,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            transport,
            state_file,
            paths,
            backoff,
        }
    }

    /// Create a cluster from scratch: the first master candidate
    /// becomes the control plane, every other candidate is attempted
    /// best-effort. Only control-plane failure surfaces as an error;
    /// completion means every candidate was attempted.
    pub async fn init_node(&self, spec: &ClusterSpec) -> ClusterResult<ClusterState> {
        info!("initializing cluster");
        let masters = dedup(&spec.masters);
        let workers = dedup(&spec.workers);

        let Some((control_plane, other_masters)) = masters.split_first() else {
            return Err(ClusterError::NoMasters);
        };

        let initializer =
            ControlPlaneInitializer::new(self.transport.clone(), self.paths.clone(), self.backoff);
        let mut state = initializer.init(control_plane, spec, &self.state_file).await?;

        self.admit(other_masters, NodeRole::Master, &mut state).await;
        self.admit(&workers, NodeRole::Worker, &mut state).await;

        info!(nodes = state.nodes.len(), "cluster assembly complete");
        Ok(state)
    }

    /// Extend an existing cluster: every candidate is an incremental
    /// join with the same probe/join/skip policy, no control-plane
    /// step.
    pub async fn join_node(&self, spec: &ClusterSpec) -> ClusterResult<ClusterState> {
        info!("joining nodes to existing cluster");
        let mut state = self.state_file.load()?;
        if state.init_node().is_none() {
            return Err(ClusterError::NoCluster);
        }

        let masters = dedup(&spec.masters);
        let workers = dedup(&spec.workers);
        self.admit(&masters, NodeRole::Master, &mut state).await;
        self.admit(&workers, NodeRole::Worker, &mut state).await;

        info!(nodes = state.nodes.len(), "join complete");
        Ok(state)
    }

    /// Probe/join/skip every candidate in order. Failures are logged
    /// with host and cause and never abort the remaining candidates.
    async fn admit(&self, hosts: &[String], role: NodeRole, state: &mut ClusterState) {
        let joiner = NodeJoiner::new(self.transport.clone(), self.paths.clone());
        for host in hosts {
            debug!(%host, ?role, "probing candidate");
            if let Err(e) = self.transport.probe(host).await {
                warn!(%host, ?role, error = %e, "skipping unreachable candidate");
                continue;
            }
            if let Err(e) = joiner.join(host, role, state, &self.state_file).await {
                warn!(%host, ?role, error = %e, "join failed, skipping candidate");
            }
        }
    }
}

/// Stable deduplication: first occurrence wins, order preserved.
fn dedup(hosts: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for host in hosts {
        if seen.insert(host.clone()) {
            out.push(host.clone());
        }
    }
    out
}
