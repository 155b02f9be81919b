//! Scripted transport — in-memory fake for tests.
//!
//! Records every call in order and can be programmed to fail specific
//! operations, so callers can assert sequencing, per-host isolation,
//! and retry bounds without any real hosts.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{TransportError, TransportResult};
use crate::Transport;

/// Which transport operation a recorded call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Copy,
    Fetch,
    Exec,
    Probe,
}

/// One recorded transport call.
#[derive(Debug, Clone)]
pub struct Call {
    pub op: Op,
    pub host: String,
    /// Remote path for copy/fetch, command line for exec, empty for probe.
    pub detail: String,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    unreachable: HashSet<String>,
    copy_failures: HashSet<String>,
    /// Exec fails when the command contains the paired substring.
    exec_failures: Vec<(String, String)>,
    /// Remaining fetch failures per host; `u32::MAX` means always fail.
    fetch_failures: HashMap<String, u32>,
}

/// Programmable in-memory transport.
#[derive(Default)]
pub struct ScriptedTransport {
    inner: Mutex<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `probe` fail for the given host.
    pub fn fail_probe(&self, host: &str) {
        self.inner.lock().unwrap().unreachable.insert(host.to_string());
    }

    /// Make every `copy` to the given host fail.
    pub fn fail_copy(&self, host: &str) {
        self.inner.lock().unwrap().copy_failures.insert(host.to_string());
    }

    /// Make `exec` fail on the given host for commands containing `needle`.
    pub fn fail_exec(&self, host: &str, needle: &str) {
        self.inner
            .lock()
            .unwrap()
            .exec_failures
            .push((host.to_string(), needle.to_string()));
    }

    /// Make every `fetch` from the given host fail.
    pub fn fail_fetch(&self, host: &str) {
        self.fail_fetch_times(host, u32::MAX);
    }

    /// Make the next `n` fetches from the given host fail, then succeed.
    pub fn fail_fetch_times(&self, host: &str, n: u32) {
        self.inner
            .lock()
            .unwrap()
            .fetch_failures
            .insert(host.to_string(), n);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Recorded calls targeting one host, in order.
    pub fn calls_for(&self, host: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.host == host).collect()
    }

    /// How many calls of one kind hit the given host.
    pub fn count(&self, op: Op, host: &str) -> usize {
        self.calls_for(host).iter().filter(|c| c.op == op).count()
    }

    /// Commands executed on the given host, in order.
    pub fn exec_commands(&self, host: &str) -> Vec<String> {
        self.calls_for(host)
            .into_iter()
            .filter(|c| c.op == Op::Exec)
            .map(|c| c.detail)
            .collect()
    }

    fn record(&self, op: Op, host: &str, detail: &str) {
        self.inner.lock().unwrap().calls.push(Call {
            op,
            host: host.to_string(),
            detail: detail.to_string(),
        });
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn copy(&self, host: &str, local: &Path, remote: &str) -> TransportResult<()> {
        self.record(Op::Copy, host, remote);
        if self.inner.lock().unwrap().copy_failures.contains(host) {
            return Err(TransportError::Copy {
                host: host.to_string(),
                local: local.to_path_buf(),
                remote: remote.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch(&self, host: &str, remote: &str, local: &Path) -> TransportResult<()> {
        self.record(Op::Fetch, host, remote);
        let mut inner = self.inner.lock().unwrap();
        if let Some(remaining) = inner.fetch_failures.get_mut(host) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(TransportError::Fetch {
                    host: host.to_string(),
                    remote: remote.to_string(),
                    local: local.to_path_buf(),
                    reason: "scripted failure".to_string(),
                });
            }
        }
        Ok(())
    }

    async fn exec(&self, host: &str, command: &str) -> TransportResult<()> {
        self.record(Op::Exec, host, command);
        let inner = self.inner.lock().unwrap();
        let scripted = inner
            .exec_failures
            .iter()
            .any(|(h, needle)| h == host && command.contains(needle));
        if scripted {
            return Err(TransportError::Exec {
                host: host.to_string(),
                command: command.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn probe(&self, host: &str) -> TransportResult<()> {
        self.record(Op::Probe, host, "");
        if self.inner.lock().unwrap().unreachable.contains(host) {
            return Err(TransportError::Unreachable {
                host: host.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}
