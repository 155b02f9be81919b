//! Domain types for the persisted cluster record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a node in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Master,
    Worker,
}

/// One admitted cluster member. The host address is the unique key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub host: String,
    pub role: NodeRole,
    /// True for exactly one node: the one that created the cluster
    /// identity. That node can never be removed.
    #[serde(default)]
    pub init: bool,
}

/// Persisted record of cluster identity and current membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClusterState {
    /// Cluster identifier, minted when the control plane comes up.
    /// `None` until then (the zero-value state).
    pub id: Option<Uuid>,
    /// Shared secret presented by new hosts to be admitted.
    pub token: String,
    /// Ordered membership records, in admission order.
    pub nodes: Vec<Node>,
    pub pod_cidr: String,
    pub service_cidr: String,
    pub cni: String,
    /// External datastore URL; empty means the embedded store.
    pub datastore: String,
    pub data_dir: PathBuf,
}

impl ClusterState {
    /// The node that created the cluster identity, if the cluster exists.
    pub fn init_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.init)
    }

    /// Whether a host is already a member.
    pub fn has_node(&self, host: &str) -> bool {
        self.nodes.iter().any(|n| n.host == host)
    }

    /// Append a membership record. Host addresses are unique within the
    /// state; appending an already-present host is a no-op. Returns
    /// whether the record was added.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.has_node(&node.host) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// All member host addresses, in admission order.
    pub fn hosts(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.host.clone()).collect()
    }
}
