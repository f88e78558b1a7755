// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace to pod/container resolution

use thiserror::Error;
use wsc_adapters::{ClusterAdapter, ClusterError};
use wsc_core::{workspace_selector, PodContainerRef, WorkspaceRef, SERVER_PORT_NAME};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("workspace {workspace} is not running ({pods} matching pods)")]
    NotRunning { workspace: WorkspaceRef, pods: usize },
    #[error("no container in pod {pod} exposes port '{}'", SERVER_PORT_NAME)]
    ServerContainerMissing { pod: String },
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Locates the pod and container serving a workspace's IDE server.
#[derive(Clone)]
pub struct PodResolver<C> {
    cluster: C,
}

impl<C: ClusterAdapter> PodResolver<C> {
    pub fn new(cluster: C) -> Self {
        Self { cluster }
    }

    /// Resolve `workspace` to exactly one pod and its IDE server container.
    pub async fn resolve(&self, workspace: &WorkspaceRef) -> Result<PodContainerRef, ResolveError> {
        let selector = workspace_selector(&workspace.name);
        let pods = self
            .cluster
            .list_pods(&workspace.namespace, &selector)
            .await?;
        let [pod] = pods.as_slice() else {
            return Err(ResolveError::NotRunning {
                workspace: workspace.clone(),
                pods: pods.len(),
            });
        };
        let container = pod
            .containers
            .iter()
            .find(|c| c.exposes(SERVER_PORT_NAME))
            .ok_or_else(|| ResolveError::ServerContainerMissing {
                pod: pod.name.clone(),
            })?;

        let target = PodContainerRef {
            pod_name: pod.name.clone(),
            namespace: pod.namespace.clone(),
            container_name: container.name.clone(),
        };
        tracing::debug!(%workspace, %target, "resolved workspace pod");
        Ok(target)
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
