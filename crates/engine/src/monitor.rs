// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background detection of remote IDE server restarts.
//!
//! A restarted server mints a new join link, so a changed link between two
//! checks means the session's client is talking to a dead server. A server
//! that stops answering altogether is caught by counting consecutive failed
//! checks.

use crate::probe::RemoteServerStatusProbe;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wsc_adapters::ClusterAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub check_timeout: Duration,
    pub failure_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            check_timeout: Duration::from_secs(2),
            failure_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    JoinLinkChanged { previous: String, current: String },
    ProbeFailures { failures: u32 },
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::JoinLinkChanged { .. } => f.write_str("join link changed"),
            RestartReason::ProbeFailures { failures } => {
                write!(f, "{failures} consecutive status checks failed")
            }
        }
    }
}

/// Decides, check by check, whether the server restarted.
#[derive(Debug, Clone)]
pub struct RestartDetector {
    previous: Option<String>,
    failures: u32,
    threshold: u32,
}

fn non_blank(link: Option<&str>) -> Option<&str> {
    link.map(str::trim).filter(|l| !l.is_empty())
}

impl RestartDetector {
    pub fn new(initial_join_link: Option<&str>, failure_threshold: u32) -> Self {
        Self {
            previous: non_blank(initial_join_link).map(str::to_string),
            failures: 0,
            threshold: failure_threshold.max(1),
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// A check that returned a status. A blank link keeps the previous one.
    pub fn observe_link(&mut self, current: Option<&str>) -> Option<RestartReason> {
        self.failures = 0;
        let current = non_blank(current)?;
        let reason = match self.previous.as_deref() {
            Some(previous) if previous != current => Some(RestartReason::JoinLinkChanged {
                previous: previous.to_string(),
                current: current.to_string(),
            }),
            _ => None,
        };
        self.previous = Some(current.to_string());
        reason
    }

    /// A check that failed or timed out.
    pub fn observe_failure(&mut self) -> Option<RestartReason> {
        self.failures += 1;
        if self.failures < self.threshold {
            return None;
        }
        let failures = self.failures;
        self.failures = 0;
        Some(RestartReason::ProbeFailures { failures })
    }
}

/// Periodic restart checks for one session. Dropping the monitor stops it.
pub struct ConnectionMonitor {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectionMonitor {
    pub fn start<C: ClusterAdapter>(
        probe: Arc<RemoteServerStatusProbe<C>>,
        initial_join_link: Option<String>,
        config: MonitorConfig,
        restart_tx: mpsc::Sender<RestartReason>,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let detector = RestartDetector::new(initial_join_link.as_deref(), config.failure_threshold);
        let task = tokio::spawn(run(probe, detector, config, restart_tx, cancel.clone()));
        Self {
            cancel,
            task: Some(task),
        }
    }

    pub fn stop(&mut self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("monitor stopped");
        }
        self.cancel.cancel();
        self.task.take();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<C: ClusterAdapter>(
    probe: Arc<RemoteServerStatusProbe<C>>,
    mut detector: RestartDetector,
    config: MonitorConfig,
    restart_tx: mpsc::Sender<RestartReason>,
    cancel: CancellationToken,
) {
    let workspace = probe.workspace().clone();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(config.interval) => {}
        }

        // Each check runs in its own task so a panic is just a failed check
        let check = tokio::spawn({
            let probe = Arc::clone(&probe);
            let cancel = cancel.child_token();
            async move {
                tokio::time::timeout(config.check_timeout, probe.get_status(&cancel)).await
            }
        });
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            joined = check => joined,
        };

        let restart = match outcome {
            Ok(Ok(Ok(status))) => detector.observe_link(status.join_link()),
            Ok(Ok(Err(e))) if e.is_cancelled() => return,
            Ok(Ok(Err(e))) => {
                tracing::debug!(%workspace, error = %e, "health check failed");
                detector.observe_failure()
            }
            Ok(Err(_)) => {
                tracing::debug!(%workspace, "health check timed out");
                detector.observe_failure()
            }
            Err(e) => {
                tracing::warn!(%workspace, error = %e, "health check aborted");
                detector.observe_failure()
            }
        };

        if let Some(reason) = restart {
            tracing::info!(%workspace, ?reason, "server restart detected");
            if restart_tx.send(reason).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
