//! Node manifest — the per-host agent service definition.
//!
//! Rendered locally, cached keyed by host, then copied to the fixed
//! remote service path where the join script picks it up. The init node
//! owns the cluster-wide CIDRs; joining nodes carry only the token and
//! the control-plane URL.

use std::path::PathBuf;

use crate::paths;

/// Template inputs for one host's service definition.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeManifest {
    /// Whether this host creates the cluster identity.
    pub init_node: bool,
    /// Whether this host runs control-plane components.
    pub master: bool,
    pub control_plane_dns: String,
    pub token: String,
    pub data_dir: PathBuf,
    /// Control-plane-owned; empty for joining nodes.
    pub pod_cidr: String,
    /// Control-plane-owned; empty for joining nodes.
    pub service_cidr: String,
    pub cni: String,
    /// External datastore URL; empty selects the embedded store.
    pub datastore: String,
    pub local_storage: bool,
}

impl NodeManifest {
    /// Agent command-line arguments for this host's role.
    pub fn agent_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if self.master {
            args.push("server".to_string());
            if self.init_node {
                args.push("--cluster-init".to_string());
                args.push("--tls-san".to_string());
                args.push(self.control_plane_dns.clone());
            } else {
                args.push("--server".to_string());
                args.push(format!("https://{}:6443", self.control_plane_dns));
            }
        } else {
            args.push("agent".to_string());
            args.push("--server".to_string());
            args.push(format!("https://{}:6443", self.control_plane_dns));
        }

        args.push("--token".to_string());
        args.push(self.token.clone());
        args.push("--data-dir".to_string());
        args.push(self.data_dir.display().to_string());

        if self.init_node {
            args.push("--cluster-cidr".to_string());
            args.push(self.pod_cidr.clone());
            args.push("--service-cidr".to_string());
            args.push(self.service_cidr.clone());
            if !self.cni.is_empty() {
                args.push("--flannel-backend".to_string());
                args.push(self.cni.clone());
            }
            if !self.datastore.is_empty() {
                args.push("--datastore-endpoint".to_string());
                args.push(self.datastore.clone());
            }
        }

        if !self.local_storage {
            args.push("--disable".to_string());
            args.push("local-storage".to_string());
        }

        args
    }

    /// Render the systemd service definition consumed by the join script.
    pub fn render(&self) -> String {
        let exec = format!("{} {}", paths::AGENT_BIN_REMOTE, self.agent_args().join(" "));
        format!(
            "[Unit]\n\
             Description=skiff managed kubernetes agent\n\
             After=network-online.target\n\
             \n\
             [Service]\n\
             Type=exec\n\
             ExecStart={exec}\n\
             KillMode=process\n\
             Restart=always\n\
             RestartSec=5s\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n"
        )
    }

    /// Local cache file name, keyed by host.
    pub fn cache_file_name(&self, host: &str) -> String {
        let role = if self.init_node {
            "master0"
        } else if self.master {
            "master"
        } else {
            "worker"
        };
        format!("{role}.{host}")
    }
}
