// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace-wide DevWorkspace watcher

use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClusterAdapter, ClusterError, ResourceKind, WatchEvent};
use wsc_core::WorkspaceSnapshot;

const EVENT_BUFFER: usize = 64;

/// A change to a workspace in the watched namespace
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceEvent {
    Added(WorkspaceSnapshot),
    Modified(WorkspaceSnapshot),
    Removed(WorkspaceSnapshot),
}

impl WorkspaceEvent {
    pub fn snapshot(&self) -> &WorkspaceSnapshot {
        match self {
            WorkspaceEvent::Added(s) | WorkspaceEvent::Modified(s) | WorkspaceEvent::Removed(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    pub reconnect_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Background list-then-watch loop over all workspaces of a namespace.
///
/// Dropping the watcher stops it.
pub struct WorkspaceWatcher {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WorkspaceWatcher {
    pub fn start<C: ClusterAdapter>(
        cluster: C,
        namespace: impl Into<String>,
        config: WatcherConfig,
        parent: &CancellationToken,
    ) -> (Self, mpsc::Receiver<WorkspaceEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = parent.child_token();
        let namespace = namespace.into();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = run(cluster, namespace, config, tx) => {}
                }
            }
        });
        (
            Self {
                cancel,
                task: Some(task),
            },
            rx,
        )
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.task.take();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn decode(object: &Value) -> Option<WorkspaceSnapshot> {
    match WorkspaceSnapshot::from_object(object) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!(error = %e, "skipping undecodable workspace");
            None
        }
    }
}

fn next_backoff(current: Duration, config: &WatcherConfig) -> Duration {
    (current * 2).min(config.max_backoff)
}

async fn run<C: ClusterAdapter>(
    cluster: C,
    namespace: String,
    config: WatcherConfig,
    tx: mpsc::Sender<WorkspaceEvent>,
) {
    let kind = ResourceKind::DEV_WORKSPACE;
    let mut backoff = config.reconnect_backoff;
    let mut version: Option<String> = None;

    loop {
        let current = match version.take() {
            Some(v) => v,
            None => match cluster.list_objects(&kind, &namespace).await {
                Ok(list) => {
                    for snapshot in list.items.iter().filter_map(decode) {
                        if tx.send(WorkspaceEvent::Added(snapshot)).await.is_err() {
                            return;
                        }
                    }
                    list.resource_version.unwrap_or_default()
                }
                Err(e) => {
                    tracing::warn!(%namespace, error = %e, "workspace list failed");
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff, &config);
                    continue;
                }
            },
        };

        let mut last = current.clone();
        let mut relist = false;
        match cluster.watch_objects(&kind, &namespace, None, &current).await {
            Ok(mut stream) => {
                backoff = config.reconnect_backoff;
                while let Some(event) = stream.next().await {
                    let event = match event {
                        Ok(WatchEvent::Added(o)) => decode(&o).map(WorkspaceEvent::Added),
                        Ok(WatchEvent::Modified(o)) => decode(&o).map(WorkspaceEvent::Modified),
                        Ok(WatchEvent::Deleted(o)) => decode(&o).map(WorkspaceEvent::Removed),
                        Ok(WatchEvent::Bookmark { resource_version }) => {
                            last = resource_version;
                            None
                        }
                        Err(ClusterError::Gone(_)) => {
                            relist = true;
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(%namespace, error = %e, "workspace watch failed");
                            break;
                        }
                    };
                    let Some(event) = event else { continue };
                    if let Some(v) = &event.snapshot().resource_version {
                        last = v.clone();
                    }
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Err(ClusterError::Gone(_)) => relist = true,
            Err(e) => {
                tracing::warn!(%namespace, error = %e, "failed to open workspace watch");
                backoff = next_backoff(backoff, &config);
            }
        }

        if !relist {
            version = Some(last);
        }
        tracing::debug!(%namespace, relist, "reconnecting workspace watch");
        tokio::time::sleep(backoff).await;
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
