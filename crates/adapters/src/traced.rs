// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::client::{ClientError, ClientHandle, ThinClientAdapter};
use crate::cluster::{
    ClusterAdapter, ClusterError, ExecProcess, ForwardStream, ObjectList, ResourceKind,
    WatchStream,
};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use wsc_core::{PodContainerRef, PodInfo};

/// Wrapper that adds tracing to any ClusterAdapter
#[derive(Clone)]
pub struct TracedCluster<C> {
    inner: C,
}

impl<C> TracedCluster<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ClusterAdapter> ClusterAdapter for TracedCluster<C> {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodInfo>, ClusterError> {
        let result = self.inner.list_pods(namespace, label_selector).await;
        tracing::info_span!("cluster.list_pods", namespace, label_selector).in_scope(
            || match &result {
                Ok(pods) => tracing::debug!(count = pods.len(), "listed"),
                Err(e) => tracing::error!(error = %e, "list failed"),
            },
        );
        result
    }

    async fn exec(
        &self,
        target: &PodContainerRef,
        command: &[String],
    ) -> Result<ExecProcess, ClusterError> {
        async {
            tracing::debug!(argc = command.len(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.exec(target, command).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::debug!(elapsed_ms, "exec attached"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "exec failed"),
            }
            result
        }
        .instrument(tracing::info_span!("cluster.exec", %target))
        .await
    }

    async fn port_forward(
        &self,
        target: &PodContainerRef,
        port: u16,
    ) -> Result<ForwardStream, ClusterError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.port_forward(target, port).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::debug!(elapsed_ms, "stream opened"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "port-forward failed"),
            }
            result
        }
        .instrument(tracing::info_span!("cluster.port_forward", %target, port))
        .await
    }

    async fn get_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ClusterError> {
        let result = self.inner.get_object(kind, namespace, name).await;
        if let Err(ref e) = result {
            tracing::error!(kind = kind.kind, namespace, name, error = %e, "get failed");
        }
        result
    }

    async fn list_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
    ) -> Result<ObjectList, ClusterError> {
        let result = self.inner.list_objects(kind, namespace).await;
        match &result {
            Ok(list) => tracing::trace!(kind = kind.kind, namespace, count = list.items.len(), "listed"),
            Err(e) => tracing::error!(kind = kind.kind, namespace, error = %e, "list failed"),
        }
        result
    }

    async fn patch_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Value, ClusterError> {
        async {
            tracing::info!(%patch, "patching");
            let start = std::time::Instant::now();
            let result = self.inner.patch_object(kind, namespace, name, patch).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "patched"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "patch failed"),
            }
            result
        }
        .instrument(tracing::info_span!("cluster.patch", kind = kind.kind, namespace, name))
        .await
    }

    async fn watch_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        field_selector: Option<&str>,
        resource_version: &str,
    ) -> Result<WatchStream, ClusterError> {
        let result = self
            .inner
            .watch_objects(kind, namespace, field_selector, resource_version)
            .await;
        tracing::info_span!("cluster.watch", kind = kind.kind, namespace, ?field_selector)
            .in_scope(|| match &result {
                Ok(_) => tracing::debug!(resource_version, "watch opened"),
                Err(e) => tracing::warn!(resource_version, error = %e, "watch failed"),
            });
        result
    }
}

/// Wrapper that adds tracing to any ThinClientAdapter
#[derive(Clone)]
pub struct TracedClient<T> {
    inner: T,
}

impl<T> TracedClient<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: ThinClientAdapter> ThinClientAdapter for TracedClient<T> {
    async fn start(
        &self,
        uri: &str,
        label: &str,
        lifetime: &CancellationToken,
    ) -> Result<ClientHandle, ClientError> {
        async {
            tracing::info!(uri, "starting");
            let start = std::time::Instant::now();
            let result = self.inner.start(uri, label, lifetime).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(handle) => tracing::info!(client_id = %handle.id, elapsed_ms, "client launched"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "launch failed"),
            }
            result
        }
        .instrument(tracing::info_span!("client.start", label))
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
