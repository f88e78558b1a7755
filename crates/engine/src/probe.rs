// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IDE server status probe

use crate::exec::{ExecChannel, ExecError};
use crate::poll::{Poller, Tick};
use crate::resolver::{PodResolver, ResolveError};
use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClusterAdapter, ClusterError};
use wsc_core::{PodContainerRef, RemoteServerStatus, WorkspaceRef};

/// Script run inside the container. HOME is overridden because some images
/// mount it read-only and the server script writes there.
const STATUS_SCRIPT: &str =
    "export HOME=/tmp; /idea-server/bin/remote-dev-server.sh status $PROJECT_SOURCE";

pub fn status_command() -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string(), STATUS_SCRIPT.to_string()]
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    /// Bound on a single status exec
    pub exec_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            exec_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error("status command timed out")]
    Timeout,
    #[error("server not ready after {}s{}", .timeout.as_secs(), last_error_suffix(.last_error))]
    NotReady {
        timeout: Duration,
        last_error: Option<String>,
    },
    #[error("probe cancelled")]
    Cancelled,
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(": {e}"),
        None => String::new(),
    }
}

impl ProbeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProbeError::Cancelled | ProbeError::Exec(ExecError::Cancelled))
    }

    /// The workspace has no unique pod or no server container. Polling
    /// again cannot change that.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            ProbeError::Resolve(
                ResolveError::NotRunning { .. } | ResolveError::ServerContainerMissing { .. }
            )
        )
    }

    fn is_pod_gone(&self) -> bool {
        matches!(
            self,
            ProbeError::Exec(ExecError::Cluster(ClusterError::NotFound(_)))
                | ProbeError::Resolve(ResolveError::NotRunning { .. })
        )
    }
}

/// Queries the remote IDE server's status in one workspace.
///
/// The pod/container is resolved on first use and cached until an exec
/// reports the pod gone.
pub struct RemoteServerStatusProbe<C> {
    workspace: WorkspaceRef,
    resolver: PodResolver<C>,
    exec: ExecChannel<C>,
    config: ProbeConfig,
    target: Mutex<Option<PodContainerRef>>,
}

impl<C: ClusterAdapter> RemoteServerStatusProbe<C> {
    pub fn new(cluster: C, workspace: WorkspaceRef, config: ProbeConfig) -> Self {
        Self {
            workspace,
            resolver: PodResolver::new(cluster.clone()),
            exec: ExecChannel::new(cluster),
            config,
            target: Mutex::new(None),
        }
    }

    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Resolved pod/container, resolving on first use
    pub async fn target(&self) -> Result<PodContainerRef, ProbeError> {
        if let Some(target) = self.target.lock().clone() {
            return Ok(target);
        }
        let target = self.resolver.resolve(&self.workspace).await?;
        *self.target.lock() = Some(target.clone());
        Ok(target)
    }

    pub async fn get_status(&self, cancel: &CancellationToken) -> Result<RemoteServerStatus, ProbeError> {
        self.status_within(self.config.exec_timeout, cancel).await
    }

    async fn status_within(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RemoteServerStatus, ProbeError> {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }
        let target = self.target().await?;
        let result = self
            .exec
            .exec(&target, &status_command(), timeout, cancel)
            .await
            .map_err(ProbeError::from);
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                if e.is_pod_gone() {
                    self.target.lock().take();
                }
                return Err(e);
            }
        };
        if output.timed_out() {
            return Err(ProbeError::Timeout);
        }
        if !output.success() {
            tracing::debug!(
                workspace = %self.workspace,
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "status command exited non-zero"
            );
        }
        Ok(RemoteServerStatus::parse(&output.stdout))
    }

    /// Poll until the server reports a join link. Transient status failures
    /// are retried; resolution failures end the wait at once.
    pub async fn wait_server_ready(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RemoteServerStatus, ProbeError> {
        let mut poller = Poller::new(self.config.poll_interval, Some(timeout), cancel);
        loop {
            let budget = poller
                .remaining()
                .map_or(self.config.exec_timeout, |r| r.min(self.config.exec_timeout));
            let last_error = match self.status_within(budget, cancel).await {
                Ok(status) if status.is_ready() => {
                    tracing::info!(workspace = %self.workspace, "server ready");
                    return Ok(status);
                }
                Ok(_) => "server reported no join link".to_string(),
                Err(e) if e.is_cancelled() => return Err(ProbeError::Cancelled),
                Err(e) if e.is_resolution() => return Err(e),
                Err(e) => {
                    tracing::debug!(workspace = %self.workspace, error = %e, "status poll failed");
                    e.to_string()
                }
            };
            match poller.tick().await {
                Tick::Ready => {}
                Tick::Cancelled => return Err(ProbeError::Cancelled),
                Tick::Timeout => {
                    return Err(ProbeError::NotReady {
                        timeout,
                        last_error: Some(last_error),
                    })
                }
            }
        }
    }

    /// Poll until the server no longer reports a join link. False on
    /// timeout. A vanished pod counts as terminated; other status failures
    /// prove nothing and are polled again.
    pub async fn wait_server_terminated(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, ProbeError> {
        let mut poller = Poller::new(self.config.poll_interval, Some(timeout), cancel);
        loop {
            let budget = poller
                .remaining()
                .map_or(self.config.exec_timeout, |r| r.min(self.config.exec_timeout));
            match self.status_within(budget, cancel).await {
                Ok(status) if !status.is_ready() => return Ok(true),
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Err(ProbeError::Cancelled),
                Err(e) if e.is_pod_gone() => {
                    tracing::debug!(workspace = %self.workspace, error = %e, "pod gone, server terminated");
                    return Ok(true);
                }
                Err(e) => {
                    tracing::debug!(workspace = %self.workspace, error = %e, "status check failed, still waiting");
                }
            }
            match poller.tick().await {
                Tick::Ready => {}
                Tick::Cancelled => return Err(ProbeError::Cancelled),
                Tick::Timeout => return Ok(false),
            }
        }
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
