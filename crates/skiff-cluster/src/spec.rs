//! Desired-state input for cluster assembly. Not persisted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use skiff_transport::SshCredentials;

/// Everything needed to create or extend a cluster: candidate hosts,
/// transport credentials, and the network/CNI settings the control
/// plane will own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSpec {
    /// Master candidates in order; the first becomes the control plane
    /// on initial assembly.
    pub masters: Vec<String>,
    /// Worker candidates in order.
    pub workers: Vec<String>,
    pub ssh: SshCredentials,
    pub cni: String,
    pub data_dir: PathBuf,
    pub pod_cidr: String,
    pub service_cidr: String,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            masters: Vec::new(),
            workers: Vec::new(),
            ssh: SshCredentials::default(),
            cni: "flannel".to_string(),
            data_dir: PathBuf::from("/var/lib/skiff"),
            pod_cidr: "10.42.0.0/16".to_string(),
            service_cidr: "10.43.0.0/16".to_string(),
        }
    }
}
