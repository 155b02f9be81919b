//! Control-plane formation and incremental node admission.
//!
//! `ControlPlaneInitializer` runs exactly once per cluster and is the
//! only place cluster identity is minted. `NodeJoiner` admits one
//! additional host at a time, persisting state immediately after each
//! success so a crash mid-batch loses at most the in-flight host.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use skiff_state::{ClusterState, Node, NodeRole, StateFile};
use skiff_transport::Transport;

use crate::bootstrap::NodeBootstrapper;
use crate::error::{ClusterError, ClusterResult};
use crate::manifest::NodeManifest;
use crate::paths::{self, ClusterPaths};
use crate::readiness::{BackoffConfig, ReadinessWaiter};
use crate::spec::ClusterSpec;

/// Length of the generated control-plane join token.
const TOKEN_LEN: usize = 16;

/// Forms the first cluster member.
pub struct ControlPlaneInitializer {
    transport: Arc<dyn Transport>,
    paths: ClusterPaths,
    backoff: BackoffConfig,
}

impl ControlPlaneInitializer {
    pub fn new(transport: Arc<dyn Transport>, paths: ClusterPaths, backoff: BackoffConfig) -> Self {
        Self {
            transport,
            paths,
            backoff,
        }
    }

    /// Bring up the control plane on `host` and persist the freshly
    /// minted cluster state. Any failure here is fatal to the whole
    /// creation operation; no partial node records are persisted.
    pub async fn init(
        &self,
        host: &str,
        spec: &ClusterSpec,
        state_file: &StateFile,
    ) -> ClusterResult<ClusterState> {
        info!(%host, "initializing control plane");

        let manifest = NodeManifest {
            init_node: true,
            master: true,
            control_plane_dns: paths::CONTROL_PLANE_DNS.to_string(),
            token: join_token(),
            data_dir: spec.data_dir.clone(),
            pod_cidr: spec.pod_cidr.clone(),
            service_cidr: spec.service_cidr.clone(),
            cni: spec.cni.clone(),
            datastore: String::new(),
            local_storage: true,
        };

        let cached = write_cache(
            &self.paths.cache_dir,
            &manifest.cache_file_name(host),
            &manifest.render(),
        )?;
        self.transport
            .copy(host, &cached, paths::AGENT_SERVICE_REMOTE)
            .await?;

        NodeBootstrapper::new(self.transport.clone(), self.paths.clone())
            // The init node is its own control plane.
            .bootstrap(host, host)
            .await?;

        ReadinessWaiter::new(
            self.transport.clone(),
            self.backoff,
            self.paths.kubeconfig.clone(),
        )
        .wait_ready(host)
        .await?;

        let cluster_id = Uuid::new_v4();
        let mut state = ClusterState {
            id: Some(cluster_id),
            token: manifest.token.clone(),
            pod_cidr: spec.pod_cidr.clone(),
            service_cidr: spec.service_cidr.clone(),
            cni: spec.cni.clone(),
            datastore: manifest.datastore.clone(),
            data_dir: spec.data_dir.clone(),
            ..ClusterState::default()
        };
        state.add_node(Node {
            host: host.to_string(),
            role: NodeRole::Master,
            init: true,
        });
        state_file.save(&state)?;

        info!(%cluster_id, %host, "control plane initialized");
        Ok(state)
    }
}

/// Admits one additional master or worker into an existing cluster.
pub struct NodeJoiner {
    transport: Arc<dyn Transport>,
    paths: ClusterPaths,
}

impl NodeJoiner {
    pub fn new(transport: Arc<dyn Transport>, paths: ClusterPaths) -> Self {
        Self { transport, paths }
    }

    /// Join `host` with the given role, reusing the token, data dir,
    /// and datastore already in the state. CIDRs are control-plane
    /// owned and never carried by joining nodes. On success the node
    /// record is appended and persisted immediately.
    pub async fn join(
        &self,
        host: &str,
        role: NodeRole,
        state: &mut ClusterState,
        state_file: &StateFile,
    ) -> ClusterResult<()> {
        let control_plane = state.init_node().ok_or(ClusterError::NoCluster)?.host.clone();
        info!(%host, ?role, "joining node");

        let manifest = NodeManifest {
            init_node: false,
            master: role == NodeRole::Master,
            control_plane_dns: paths::CONTROL_PLANE_DNS.to_string(),
            token: state.token.clone(),
            data_dir: state.data_dir.clone(),
            pod_cidr: String::new(),
            service_cidr: String::new(),
            cni: String::new(),
            datastore: state.datastore.clone(),
            local_storage: true,
        };

        let cached = write_cache(
            &self.paths.cache_dir,
            &manifest.cache_file_name(host),
            &manifest.render(),
        )?;
        self.transport
            .copy(host, &cached, paths::AGENT_SERVICE_REMOTE)
            .await?;

        NodeBootstrapper::new(self.transport.clone(), self.paths.clone())
            .bootstrap(host, &control_plane)
            .await?;

        state.add_node(Node {
            host: host.to_string(),
            role,
            init: false,
        });
        state_file.save(state)?;
        info!(%host, ?role, "node joined");
        Ok(())
    }
}

/// Fresh random alphanumeric join token.
fn join_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Write a rendered manifest into the local cache, keyed by host.
fn write_cache(cache_dir: &Path, name: &str, contents: &str) -> ClusterResult<PathBuf> {
    let path = cache_dir.join(name);
    fs::create_dir_all(cache_dir).map_err(|e| ClusterError::Manifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(&path, contents).map_err(|e| ClusterError::Manifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_transport::script::{Op, ScriptedTransport};
    use std::time::Duration;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        paths: ClusterPaths,
        state_file: StateFile,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let paths = ClusterPaths::new(dir.path(), "/usr/local/bin/skiff");
        let state_file = StateFile::new(paths.state_file());
        Fixture {
            transport: Arc::new(ScriptedTransport::new()),
            paths,
            state_file,
            _dir: dir,
        }
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            interval: Duration::from_millis(1),
            factor: 1.0,
            max_attempts: 2,
        }
    }

    fn spec() -> ClusterSpec {
        ClusterSpec::default()
    }

    #[tokio::test]
    async fn control_plane_init_persists_minted_state() {
        let f = fixture();
        let initializer =
            ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff());

        let state = initializer
            .init("10.0.0.1", &spec(), &f.state_file)
            .await
            .unwrap();

        assert!(state.id.is_some());
        assert_eq!(state.token.len(), TOKEN_LEN);
        assert_eq!(state.pod_cidr, "10.42.0.0/16");
        assert_eq!(state.nodes.len(), 1);
        let init = state.init_node().unwrap();
        assert_eq!(init.host, "10.0.0.1");
        assert_eq!(init.role, NodeRole::Master);

        // The record survived to disk.
        let reloaded = f.state_file.load().unwrap();
        assert_eq!(reloaded, state);
    }

    #[tokio::test]
    async fn control_plane_init_copies_manifest_before_bootstrap() {
        let f = fixture();
        ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff())
            .init("10.0.0.1", &spec(), &f.state_file)
            .await
            .unwrap();

        let calls = f.transport.calls_for("10.0.0.1");
        assert_eq!(calls[0].op, Op::Copy);
        assert_eq!(calls[0].detail, paths::AGENT_SERVICE_REMOTE);
        // Readiness fetch happened after bootstrap.
        assert_eq!(f.transport.count(Op::Fetch, "10.0.0.1"), 1);
    }

    #[tokio::test]
    async fn control_plane_bootstrap_failure_persists_nothing() {
        let f = fixture();
        f.transport.fail_exec("10.0.0.1", "init.sh");

        let err = ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff())
            .init("10.0.0.1", &spec(), &f.state_file)
            .await
            .unwrap_err();

        assert!(matches!(err, ClusterError::Bootstrap(_)));
        assert_eq!(f.state_file.load().unwrap(), ClusterState::default());
    }

    #[tokio::test]
    async fn control_plane_readiness_timeout_persists_nothing() {
        let f = fixture();
        f.transport.fail_fetch("10.0.0.1");

        let err = ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff())
            .init("10.0.0.1", &spec(), &f.state_file)
            .await
            .unwrap_err();

        assert!(matches!(err, ClusterError::ReadinessTimeout { attempts: 2 }));
        assert!(f.state_file.load().unwrap().nodes.is_empty());
    }

    #[tokio::test]
    async fn join_appends_and_saves_immediately() {
        let f = fixture();
        let initializer =
            ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff());
        let mut state = initializer
            .init("10.0.0.1", &spec(), &f.state_file)
            .await
            .unwrap();

        NodeJoiner::new(f.transport.clone(), f.paths.clone())
            .join("10.0.0.2", NodeRole::Worker, &mut state, &f.state_file)
            .await
            .unwrap();

        let reloaded = f.state_file.load().unwrap();
        assert_eq!(reloaded.nodes.len(), 2);
        assert_eq!(reloaded.nodes[1].host, "10.0.0.2");
        assert_eq!(reloaded.nodes[1].role, NodeRole::Worker);
        assert!(!reloaded.nodes[1].init);
    }

    #[tokio::test]
    async fn join_uses_init_node_as_control_plane() {
        let f = fixture();
        let mut state =
            ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff())
                .init("10.0.0.1", &spec(), &f.state_file)
                .await
                .unwrap();

        NodeJoiner::new(f.transport.clone(), f.paths.clone())
            .join("10.0.0.3", NodeRole::Master, &mut state, &f.state_file)
            .await
            .unwrap();

        let entry = f
            .transport
            .exec_commands("10.0.0.3")
            .into_iter()
            .find(|c| c.contains("/etc/hosts"))
            .unwrap();
        assert!(entry.contains(&format!("10.0.0.1 {}", paths::CONTROL_PLANE_DNS)));
    }

    #[tokio::test]
    async fn join_manifest_carries_no_cidrs() {
        let f = fixture();
        let mut state =
            ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff())
                .init("10.0.0.1", &spec(), &f.state_file)
                .await
                .unwrap();

        NodeJoiner::new(f.transport.clone(), f.paths.clone())
            .join("10.0.0.2", NodeRole::Master, &mut state, &f.state_file)
            .await
            .unwrap();

        let cached = f.paths.cache_dir.join("master.10.0.0.2");
        let unit = fs::read_to_string(cached).unwrap();
        assert!(!unit.contains("--cluster-cidr"));
        assert!(!unit.contains("--cluster-init"));
        assert!(unit.contains(&state.token));
    }

    #[tokio::test]
    async fn join_without_cluster_is_rejected() {
        let f = fixture();
        let mut state = ClusterState::default();

        let err = NodeJoiner::new(f.transport.clone(), f.paths.clone())
            .join("10.0.0.2", NodeRole::Worker, &mut state, &f.state_file)
            .await
            .unwrap_err();

        assert!(matches!(err, ClusterError::NoCluster));
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn join_failure_returns_error_without_state_change() {
        let f = fixture();
        let mut state =
            ControlPlaneInitializer::new(f.transport.clone(), f.paths.clone(), fast_backoff())
                .init("10.0.0.1", &spec(), &f.state_file)
                .await
                .unwrap();
        f.transport.fail_exec("10.0.0.2", "node.sh");

        let err = NodeJoiner::new(f.transport.clone(), f.paths.clone())
            .join("10.0.0.2", NodeRole::Worker, &mut state, &f.state_file)
            .await
            .unwrap_err();

        assert!(matches!(err, ClusterError::Bootstrap(_)));
        assert_eq!(f.state_file.load().unwrap().nodes.len(), 1);
    }

    #[test]
    fn tokens_are_random_alphanumeric() {
        let a = join_token();
        let b = join_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
