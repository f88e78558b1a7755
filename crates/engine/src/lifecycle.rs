// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace start/stop and phase waits

use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClusterAdapter, ClusterError, ResourceKind, WatchEvent};
use wsc_core::{SnapshotError, WorkspacePhase, WorkspaceRef, WorkspaceSnapshot};

/// Delay before re-issuing a broken watch.
pub const WATCH_RECONNECT_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("wait cancelled")]
    Cancelled,
}

/// Reads and drives the `spec.started` flag of a workspace.
#[derive(Clone)]
pub struct WorkspaceLifecycle<C> {
    cluster: C,
    reconnect_backoff: Duration,
}

impl<C: ClusterAdapter> WorkspaceLifecycle<C> {
    pub fn new(cluster: C) -> Self {
        Self {
            cluster,
            reconnect_backoff: WATCH_RECONNECT_BACKOFF,
        }
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub async fn snapshot(&self, workspace: &WorkspaceRef) -> Result<WorkspaceSnapshot, LifecycleError> {
        let object = self
            .cluster
            .get_object(&ResourceKind::DEV_WORKSPACE, &workspace.namespace, &workspace.name)
            .await?;
        Ok(WorkspaceSnapshot::from_object(&object)?)
    }

    /// Set `spec.started=true`. Returns false when already started.
    pub async fn start(&self, workspace: &WorkspaceRef) -> Result<bool, LifecycleError> {
        self.set_started(workspace, true).await
    }

    /// Set `spec.started=false`. Returns false when already stopped.
    pub async fn stop(&self, workspace: &WorkspaceRef) -> Result<bool, LifecycleError> {
        self.set_started(workspace, false).await
    }

    async fn set_started(&self, workspace: &WorkspaceRef, started: bool) -> Result<bool, LifecycleError> {
        let current = self.snapshot(workspace).await?;
        if current.started == started {
            tracing::debug!(%workspace, started, "workspace already in requested state");
            return Ok(false);
        }
        self.cluster
            .patch_object(
                &ResourceKind::DEV_WORKSPACE,
                &workspace.namespace,
                &workspace.name,
                &json!({ "spec": { "started": started } }),
            )
            .await?;
        tracing::info!(%workspace, started, "workspace patched");
        Ok(true)
    }

    /// Wait until the workspace reports `phase`. False on timeout.
    pub async fn wait_phase(
        &self,
        workspace: &WorkspaceRef,
        phase: WorkspacePhase,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<bool, LifecycleError> {
        let reached = self
            .wait_phase_changes(workspace, &[phase], timeout, cancel)
            .await?;
        Ok(reached.is_some())
    }

    /// Wait until the workspace reports any of `phases`; returns the phase
    /// observed, or `None` on timeout.
    pub async fn wait_phase_changes(
        &self,
        workspace: &WorkspaceRef,
        phases: &[WorkspacePhase],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<WorkspacePhase>, LifecycleError> {
        let deadline = Instant::now() + timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LifecycleError::Cancelled),
            waited = tokio::time::timeout_at(deadline, self.observe_until(workspace, phases)) => {
                match waited {
                    Ok(result) => result.map(Some),
                    Err(_) => {
                        tracing::info!(%workspace, ?phases, "timed out waiting for phase");
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Read the current object, then follow its watch until a wanted phase
    /// shows up. Broken watches are re-issued from the last seen version.
    async fn observe_until(
        &self,
        workspace: &WorkspaceRef,
        phases: &[WorkspacePhase],
    ) -> Result<WorkspacePhase, LifecycleError> {
        let current = self.snapshot(workspace).await?;
        if phases.contains(&current.phase) {
            return Ok(current.phase);
        }
        let mut version = current.resource_version.unwrap_or_default();
        let selector = format!("metadata.name={}", workspace.name);

        loop {
            let watch = self
                .cluster
                .watch_objects(
                    &ResourceKind::DEV_WORKSPACE,
                    &workspace.namespace,
                    Some(&selector),
                    &version,
                )
                .await;
            let mut relist = false;
            match watch {
                Ok(mut stream) => {
                    while let Some(event) = stream.next().await {
                        let object = match event {
                            Ok(WatchEvent::Added(object) | WatchEvent::Modified(object)) => object,
                            Ok(WatchEvent::Deleted(_)) => {
                                tracing::warn!(%workspace, "workspace deleted while waiting");
                                continue;
                            }
                            Ok(WatchEvent::Bookmark { resource_version }) => {
                                version = resource_version;
                                continue;
                            }
                            Err(ClusterError::Gone(_)) => {
                                relist = true;
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(%workspace, error = %e, "workspace watch failed");
                                break;
                            }
                        };
                        match WorkspaceSnapshot::from_object(&object) {
                            Ok(snapshot) => {
                                if let Some(v) = snapshot.resource_version.clone() {
                                    version = v;
                                }
                                tracing::debug!(%workspace, phase = %snapshot.phase, "phase observed");
                                if snapshot.workspace == *workspace && phases.contains(&snapshot.phase) {
                                    return Ok(snapshot.phase);
                                }
                            }
                            Err(e) => tracing::warn!(%workspace, error = %e, "undecodable workspace event"),
                        }
                    }
                }
                Err(ClusterError::Gone(_)) => relist = true,
                Err(e) => tracing::warn!(%workspace, error = %e, "failed to open workspace watch"),
            }

            if relist {
                let current = self.snapshot(workspace).await?;
                if phases.contains(&current.phase) {
                    return Ok(current.phase);
                }
                version = current.resource_version.unwrap_or_default();
            }
            tracing::debug!(%workspace, %version, "re-issuing workspace watch");
            tokio::time::sleep(self.reconnect_backoff).await;
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
