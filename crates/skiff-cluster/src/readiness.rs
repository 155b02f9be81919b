//! Readiness polling for the control plane.
//!
//! Readiness means the control plane has produced usable client
//! credentials: each attempt tries to fetch the generated kubeconfig
//! over the transport. A failed fetch is "not ready yet", never an
//! error; exhausting the attempt budget is a timeout.
//!
//! The backoff is parameterized with a growth factor but configured at
//! 1.0, i.e. constant-interval retry. That literal behavior is kept.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use skiff_transport::Transport;

use crate::error::{ClusterError, ClusterResult};
use crate::paths;

/// Soft cap on the post-install system readiness wait.
const SYSTEM_READY_TIMEOUT: Duration = Duration::from_secs(180);
const SYSTEM_READY_INTERVAL: Duration = Duration::from_secs(10);

/// Retry schedule for readiness polling. Passed explicitly into the
/// waiter's constructor; there is no process-wide default state.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Initial spacing between attempts.
    pub interval: Duration,
    /// Multiplier applied to the spacing after each failed attempt.
    pub factor: f64,
    /// Total attempts before the wait times out.
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6),
            factor: 1.0,
            max_attempts: 10,
        }
    }
}

/// Polls control-plane health with bounded backoff.
pub struct ReadinessWaiter {
    transport: Arc<dyn Transport>,
    backoff: BackoffConfig,
    /// Local path the fetched credentials are written to, consumed by
    /// the downstream API client.
    kubeconfig: PathBuf,
}

impl ReadinessWaiter {
    pub fn new(transport: Arc<dyn Transport>, backoff: BackoffConfig, kubeconfig: PathBuf) -> Self {
        Self {
            transport,
            backoff,
            kubeconfig,
        }
    }

    /// Block until the control plane at `host` yields its credentials
    /// file, or the attempt budget runs out. Sleeps only between
    /// attempts.
    pub async fn wait_ready(&self, host: &str) -> ClusterResult<()> {
        info!(%host, "waiting for control plane readiness");
        let mut interval = self.backoff.interval;

        for attempt in 1..=self.backoff.max_attempts {
            debug!(attempt, max = self.backoff.max_attempts, "readiness check");
            match self
                .transport
                .fetch(host, paths::REMOTE_KUBECONFIG, &self.kubeconfig)
                .await
            {
                Ok(()) => {
                    info!(%host, attempt, "control plane ready, credentials fetched");
                    return Ok(());
                }
                Err(e) => debug!(%host, error = %e, "control plane not ready yet"),
            }
            if attempt < self.backoff.max_attempts {
                tokio::time::sleep(interval).await;
                interval = interval.mul_f64(self.backoff.factor);
            }
        }

        Err(ClusterError::ReadinessTimeout {
            attempts: self.backoff.max_attempts,
        })
    }
}

/// Soft wait for the system workload to answer on `addr`.
///
/// Times out after three minutes with a warning; the timeout is never
/// promoted to an error — the caller proceeds either way.
pub async fn wait_system_ready(addr: &str) {
    info!(%addr, "waiting for system workload");
    let started = tokio::time::Instant::now();

    loop {
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => {
                info!(%addr, elapsed = ?started.elapsed(), "system workload ready");
                return;
            }
            Err(e) => debug!(%addr, error = %e, "system workload not ready yet"),
        }
        if started.elapsed() >= SYSTEM_READY_TIMEOUT {
            warn!(%addr, "system readiness wait timed out, check cluster status later");
            return;
        }
        tokio::time::sleep(SYSTEM_READY_INTERVAL).await;
    }
}
