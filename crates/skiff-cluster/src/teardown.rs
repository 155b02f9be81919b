//! Node removal and whole-cluster teardown.
//!
//! Removal is best-effort and concurrent: every requested host gets an
//! outcome, and one host's failure never blocks another's cleanup. The
//! init node is protected from `remove` — losing it orphans the whole
//! cluster — and only falls away with `clean_all`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{info, warn};

use skiff_state::StateFile;
use skiff_transport::Transport;

use crate::error::ClusterResult;
use crate::paths;

/// Cluster-side membership operations, decoupled from the transport so
/// teardown can be exercised without a live API server.
#[async_trait]
pub trait MembershipApi: Send + Sync {
    /// Deregister `host` from the cluster's member list.
    async fn remove_node(&self, host: &str) -> anyhow::Result<()>;
}

/// What happened to one host during teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The host-level clean script ran successfully.
    Cleaned,
    /// The host is the init node and was left untouched.
    Protected,
    /// The clean script failed; the host may hold residue.
    CleanFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutcome {
    pub host: String,
    pub outcome: Outcome,
}

/// Removes individual nodes from a running cluster.
pub struct NodeRemover {
    transport: Arc<dyn Transport>,
    membership: Arc<dyn MembershipApi>,
    state_file: StateFile,
}

impl NodeRemover {
    pub fn new(
        transport: Arc<dyn Transport>,
        membership: Arc<dyn MembershipApi>,
        state_file: StateFile,
    ) -> Self {
        Self {
            transport,
            membership,
            state_file,
        }
    }

    /// Remove the given hosts concurrently. Returns one outcome per
    /// requested host, in request order. Membership deregistration is
    /// attempted before the host-level clean and is non-fatal: a node
    /// that already fell out of the cluster still gets its disk wiped.
    pub async fn remove(&self, hosts: &[String]) -> ClusterResult<Vec<HostOutcome>> {
        let state = self.state_file.load()?;
        let init_host = state.init_node().map(|n| n.host.clone());
        let clean = paths::clean_script(&state.data_dir);

        let mut tasks = JoinSet::new();
        let mut outcomes: Vec<Option<HostOutcome>> = vec![None; hosts.len()];

        for (idx, host) in hosts.iter().enumerate() {
            if Some(host) == init_host.as_ref() {
                warn!(%host, "refusing to remove the init node");
                outcomes[idx] = Some(HostOutcome {
                    host: host.clone(),
                    outcome: Outcome::Protected,
                });
                continue;
            }

            let transport = self.transport.clone();
            let membership = self.membership.clone();
            let host = host.clone();
            let clean = clean.clone();
            tasks.spawn(async move {
                if let Err(e) = membership.remove_node(&host).await {
                    warn!(%host, error = %e, "membership deregistration failed");
                }
                let outcome = match transport.exec(&host, &clean).await {
                    Ok(()) => {
                        info!(%host, "node cleaned");
                        Outcome::Cleaned
                    }
                    Err(e) => {
                        warn!(%host, error = %e, "clean script failed");
                        Outcome::CleanFailed(e.to_string())
                    }
                };
                (idx, HostOutcome { host, outcome })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Ok((idx, outcome)) = joined {
                outcomes[idx] = Some(outcome);
            }
        }

        // Checkpoint: node records survive removal so a later clean_all
        // still knows every host that ever joined.
        self.state_file.save(&state)?;

        Ok(outcomes.into_iter().flatten().collect())
    }
}

/// Tears down every host the cluster ever touched, init node included.
pub struct ClusterCleaner {
    transport: Arc<dyn Transport>,
    state_file: StateFile,
}

impl ClusterCleaner {
    pub fn new(transport: Arc<dyn Transport>, state_file: StateFile) -> Self {
        Self {
            transport,
            state_file,
        }
    }

    /// Run the clean script on all recorded hosts concurrently. No
    /// membership calls: the cluster is going away wholesale. State on
    /// disk is left for the operator to discard.
    pub async fn clean_all(&self) -> ClusterResult<Vec<HostOutcome>> {
        let state = self.state_file.load()?;
        let clean = paths::clean_script(&state.data_dir);
        info!(nodes = state.nodes.len(), "cleaning entire cluster");

        let mut tasks = JoinSet::new();
        for host in state.hosts() {
            let transport = self.transport.clone();
            let clean = clean.clone();
            tasks.spawn(async move {
                let outcome = match transport.exec(&host, &clean).await {
                    Ok(()) => Outcome::Cleaned,
                    Err(e) => {
                        warn!(%host, error = %e, "clean script failed");
                        Outcome::CleanFailed(e.to_string())
                    }
                };
                HostOutcome { host, outcome }
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(outcome) = joined {
                outcomes.push(outcome);
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_state::{ClusterState, Node, NodeRole};
    use skiff_transport::script::{Op, ScriptedTransport};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMembership {
        removed: Mutex<Vec<String>>,
        fail: Mutex<Vec<String>>,
    }

    impl RecordingMembership {
        fn fail_for(&self, host: &str) {
            self.fail.lock().unwrap().push(host.to_string());
        }

        fn removed(&self) -> Vec<String> {
            self.removed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MembershipApi for RecordingMembership {
        async fn remove_node(&self, host: &str) -> anyhow::Result<()> {
            self.removed.lock().unwrap().push(host.to_string());
            if self.fail.lock().unwrap().iter().any(|h| h == host) {
                anyhow::bail!("node not found");
            }
            Ok(())
        }
    }

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        membership: Arc<RecordingMembership>,
        state_file: StateFile,
        _dir: tempfile::TempDir,
    }

    fn fixture(hosts: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let state_file = StateFile::new(dir.path().join("cluster.json"));
        let mut state = ClusterState {
            token: "tok".to_string(),
            ..ClusterState::default()
        };
        for (i, host) in hosts.iter().enumerate() {
            state.add_node(Node {
                host: host.to_string(),
                role: if i == 0 {
                    NodeRole::Master
                } else {
                    NodeRole::Worker
                },
                init: i == 0,
            });
        }
        state_file.save(&state).unwrap();
        Fixture {
            transport: Arc::new(ScriptedTransport::new()),
            membership: Arc::new(RecordingMembership::default()),
            state_file,
            _dir: dir,
        }
    }

    fn remover(f: &Fixture) -> NodeRemover {
        NodeRemover::new(
            f.transport.clone(),
            f.membership.clone(),
            f.state_file.clone(),
        )
    }

    #[tokio::test]
    async fn init_node_is_protected_with_no_side_effects() {
        let f = fixture(&["10.0.0.1", "10.0.0.2"]);

        let outcomes = remover(&f)
            .remove(&["10.0.0.1".to_string()])
            .await
            .unwrap();

        assert_eq!(
            outcomes,
            vec![HostOutcome {
                host: "10.0.0.1".to_string(),
                outcome: Outcome::Protected,
            }]
        );
        assert!(f.membership.removed().is_empty());
        assert!(f.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn every_requested_host_gets_an_outcome_despite_failures() {
        let f = fixture(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]);
        f.transport.fail_exec("10.0.0.3", "cleankube.sh");
        f.membership.fail_for("10.0.0.4");

        let hosts: Vec<String> = ["10.0.0.2", "10.0.0.3", "10.0.0.4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let outcomes = remover(&f).remove(&hosts).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].outcome, Outcome::Cleaned);
        assert!(matches!(outcomes[1].outcome, Outcome::CleanFailed(_)));
        // Membership failure is non-fatal: the disk wipe still ran.
        assert_eq!(outcomes[2].outcome, Outcome::Cleaned);
        assert_eq!(f.transport.count(Op::Exec, "10.0.0.4"), 1);
    }

    #[tokio::test]
    async fn removal_deregisters_before_cleaning() {
        let f = fixture(&["10.0.0.1", "10.0.0.2"]);

        remover(&f).remove(&["10.0.0.2".to_string()]).await.unwrap();

        assert_eq!(f.membership.removed(), vec!["10.0.0.2".to_string()]);
        let cmds = f.transport.exec_commands("10.0.0.2");
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].ends_with("scripts/cleankube.sh"));
    }

    #[tokio::test]
    async fn removal_keeps_node_records_on_disk() {
        let f = fixture(&["10.0.0.1", "10.0.0.2"]);

        remover(&f).remove(&["10.0.0.2".to_string()]).await.unwrap();

        let state = f.state_file.load().unwrap();
        assert_eq!(state.hosts(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[tokio::test]
    async fn cleaner_hits_every_recorded_host_including_init() {
        let f = fixture(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        f.transport.fail_exec("10.0.0.2", "cleankube.sh");

        let outcomes = ClusterCleaner::new(f.transport.clone(), f.state_file.clone())
            .clean_all()
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        for host in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            assert_eq!(f.transport.count(Op::Exec, host), 1);
        }
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::CleanFailed(_)))
            .map(|o| o.host.as_str())
            .collect();
        assert_eq!(failed, vec!["10.0.0.2"]);
        // No membership traffic during a full clean.
        assert!(f.membership.removed().is_empty());
    }
}
