//! SSH transport — shells out to the system `ssh`/`scp` binaries.
//!
//! Builds one process per operation. Password authentication is
//! delegated to `sshpass` when a password is configured; key-based
//! authentication passes `-i` straight through. Host-key checking is
//! disabled because bootstrap targets are freshly provisioned hosts
//! with no prior known_hosts entries.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{TransportError, TransportResult};
use crate::Transport;

/// Seconds before an unanswered connection attempt counts as failed.
const CONNECT_TIMEOUT_SECS: u32 = 10;

/// Shorter budget for reachability probes.
const PROBE_TIMEOUT_SECS: u32 = 5;

/// Credentials for the SSH transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SshCredentials {
    pub user: String,
    pub port: u16,
    /// Password for `sshpass`-style authentication, if any.
    pub password: Option<String>,
    /// Private key path, if any.
    pub key_path: Option<PathBuf>,
}

impl Default for SshCredentials {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: 22,
            password: None,
            key_path: None,
        }
    }
}

/// Transport implementation over the system `ssh` and `scp` binaries.
pub struct SshTransport {
    creds: SshCredentials,
}

impl SshTransport {
    pub fn new(creds: SshCredentials) -> Self {
        Self { creds }
    }

    fn target(&self, host: &str) -> String {
        format!("{}@{}", self.creds.user, host)
    }

    /// Common `-o` options shared by ssh and scp invocations.
    fn base_options(&self, connect_timeout: u32) -> Vec<String> {
        let mut opts = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={connect_timeout}"),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ];
        if let Some(key) = &self.creds.key_path {
            opts.push("-i".to_string());
            opts.push(key.display().to_string());
        }
        opts
    }

    /// Assemble the program + argument list for a remote command.
    fn ssh_command(&self, host: &str, command: &str, connect_timeout: u32) -> (String, Vec<String>) {
        let mut args = self.base_options(connect_timeout);
        args.push("-p".to_string());
        args.push(self.creds.port.to_string());
        args.push(self.target(host));
        args.push(command.to_string());
        self.wrap_password("ssh", args)
    }

    /// Assemble the program + argument list for an scp transfer.
    fn scp_command(&self, source: &str, dest: &str) -> (String, Vec<String>) {
        let mut args = self.base_options(CONNECT_TIMEOUT_SECS);
        args.push("-P".to_string());
        args.push(self.creds.port.to_string());
        args.push(source.to_string());
        args.push(dest.to_string());
        self.wrap_password("scp", args)
    }

    /// Prefix with `sshpass -p` when password authentication is set.
    fn wrap_password(&self, program: &str, args: Vec<String>) -> (String, Vec<String>) {
        match &self.creds.password {
            Some(password) => {
                let mut wrapped = vec![
                    "-p".to_string(),
                    password.clone(),
                    program.to_string(),
                ];
                wrapped.extend(args);
                ("sshpass".to_string(), wrapped)
            }
            None => (program.to_string(), args),
        }
    }

    async fn run(
        &self,
        program: &str,
        args: &[String],
        on_fail: impl FnOnce(String) -> TransportError,
    ) -> TransportResult<()> {
        debug!(%program, "spawning transport process");
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;
        let output = match spawned {
            Ok(output) => output,
            Err(e) => return Err(on_fail(e.to_string())),
        };

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if stderr.is_empty() {
            format!("exit status {}", output.status)
        } else {
            stderr
        };
        Err(on_fail(reason))
    }
}

#[async_trait::async_trait]
impl Transport for SshTransport {
    async fn copy(&self, host: &str, local: &Path, remote: &str) -> TransportResult<()> {
        let dest = format!("{}:{}", self.target(host), remote);
        let (program, args) = self.scp_command(&local.display().to_string(), &dest);
        self.run(&program, &args, |reason| TransportError::Copy {
            host: host.to_string(),
            local: local.to_path_buf(),
            remote: remote.to_string(),
            reason,
        })
        .await
    }

    async fn fetch(&self, host: &str, remote: &str, local: &Path) -> TransportResult<()> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransportError::Fetch {
                    host: host.to_string(),
                    remote: remote.to_string(),
                    local: local.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }
        let source = format!("{}:{}", self.target(host), remote);
        let (program, args) = self.scp_command(&source, &local.display().to_string());
        self.run(&program, &args, |reason| TransportError::Fetch {
            host: host.to_string(),
            remote: remote.to_string(),
            local: local.to_path_buf(),
            reason,
        })
        .await
    }

    async fn exec(&self, host: &str, command: &str) -> TransportResult<()> {
        let (program, args) = self.ssh_command(host, command, CONNECT_TIMEOUT_SECS);
        self.run(&program, &args, |reason| TransportError::Exec {
            host: host.to_string(),
            command: command.to_string(),
            reason,
        })
        .await
    }

    async fn probe(&self, host: &str) -> TransportResult<()> {
        let (program, args) = self.ssh_command(host, "true", PROBE_TIMEOUT_SECS);
        self.run(&program, &args, |reason| TransportError::Unreachable {
            host: host.to_string(),
            reason,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_creds() -> SshCredentials {
        SshCredentials {
            user: "admin".to_string(),
            port: 2222,
            password: None,
            key_path: Some(PathBuf::from("/home/admin/.ssh/id_ed25519")),
        }
    }

    #[test]
    fn ssh_command_includes_port_and_target() {
        let transport = SshTransport::new(key_creds());
        let (program, args) = transport.ssh_command("10.0.0.1", "uptime", 10);

        assert_eq!(program, "ssh");
        assert!(args.contains(&"-p".to_string()));
        assert!(args.contains(&"2222".to_string()));
        assert!(args.contains(&"admin@10.0.0.1".to_string()));
        assert_eq!(args.last().unwrap(), "uptime");
    }

    #[test]
    fn ssh_command_passes_identity_file() {
        let transport = SshTransport::new(key_creds());
        let (_, args) = transport.ssh_command("10.0.0.1", "true", 5);

        let idx = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[idx + 1], "/home/admin/.ssh/id_ed25519");
    }

    #[test]
    fn scp_command_uses_capital_p_for_port() {
        let transport = SshTransport::new(key_creds());
        let (program, args) = transport.scp_command("/tmp/bin", "admin@10.0.0.1:/usr/local/bin/k3s");

        assert_eq!(program, "scp");
        let idx = args.iter().position(|a| a == "-P").unwrap();
        assert_eq!(args[idx + 1], "2222");
        assert_eq!(args.last().unwrap(), "admin@10.0.0.1:/usr/local/bin/k3s");
    }

    #[test]
    fn password_wraps_with_sshpass() {
        let creds = SshCredentials {
            password: Some("hunter2".to_string()),
            ..SshCredentials::default()
        };
        let transport = SshTransport::new(creds);
        let (program, args) = transport.ssh_command("10.0.0.1", "true", 5);

        assert_eq!(program, "sshpass");
        assert_eq!(args[0], "-p");
        assert_eq!(args[1], "hunter2");
        assert_eq!(args[2], "ssh");
    }

    #[test]
    fn connect_timeout_is_configurable_per_call() {
        let transport = SshTransport::new(SshCredentials::default());
        let (_, args) = transport.ssh_command("10.0.0.1", "true", 5);
        assert!(args.contains(&"ConnectTimeout=5".to_string()));
    }

    #[test]
    fn default_credentials_are_root_on_22() {
        let creds = SshCredentials::default();
        assert_eq!(creds.user, "root");
        assert_eq!(creds.port, 22);
        assert!(creds.password.is_none());
        assert!(creds.key_path.is_none());
    }

    #[tokio::test]
    async fn spawn_failure_maps_to_the_operation_error() {
        let transport = SshTransport::new(SshCredentials::default());

        let err = transport
            .run(
                "skiff-no-such-transport-binary",
                &[],
                |reason| TransportError::Exec {
                    host: "10.0.0.1".to_string(),
                    command: "uptime".to_string(),
                    reason,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Exec { ref host, .. } if host == "10.0.0.1"));
    }
}
