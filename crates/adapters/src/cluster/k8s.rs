// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes-backed cluster adapter

use super::{
    ClusterAdapter, ClusterError, ExecProcess, ForwardStream, ObjectList, ResourceKind, WatchEvent,
    WatchStream,
};
use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::{Api, AttachParams, ListParams, Patch, PatchParams, Portforwarder, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Client, Config};
use serde_json::{json, Value};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::oneshot;
use wsc_core::{ContainerInfo, ContainerPort, PodContainerRef, PodInfo};

/// Server-side watch timeout; must stay below the API server's limit.
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Exit code reported when the exec stream ends without a status.
const UNKNOWN_EXIT_CODE: i32 = 1;

/// Explicit API server credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCredentials {
    pub server: String,
    pub token: String,
    /// Skip TLS verification of the API server certificate
    pub insecure: bool,
}

/// Cluster adapter talking to a Kubernetes API server.
///
/// Object calls share one client. Every exec and port-forward builds its own
/// client from the stored config so long-lived streams never share a
/// transport.
#[derive(Clone)]
pub struct KubeClusterAdapter {
    config: Config,
    client: Client,
}

impl KubeClusterAdapter {
    /// Build from the ambient kubeconfig or in-cluster environment.
    pub async fn infer() -> Result<Self, ClusterError> {
        let config = Config::infer()
            .await
            .map_err(|e| ClusterError::Transport(format!("no cluster configuration: {}", e)))?;
        Self::from_config(config)
    }

    /// Build from an explicit server URL and bearer token.
    pub async fn from_credentials(credentials: &ClusterCredentials) -> Result<Self, ClusterError> {
        let kubeconfig: Kubeconfig = serde_json::from_value(kubeconfig_document(credentials))
            .map_err(|e| ClusterError::Decode(e.to_string()))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| ClusterError::Transport(format!("invalid credentials: {}", e)))?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self, ClusterError> {
        let client = Client::try_from(config.clone()).map_err(classify)?;
        Ok(Self { config, client })
    }

    fn isolated_client(&self) -> Result<Client, ClusterError> {
        Client::try_from(self.config.clone()).map_err(classify)
    }

    fn dynamic_api(&self, kind: &ResourceKind, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(kind.group, kind.version, kind.kind);
        let resource = ApiResource::from_gvk_with_plural(&gvk, kind.plural);
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

fn kubeconfig_document(credentials: &ClusterCredentials) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Config",
        "current-context": "wsc",
        "clusters": [{
            "name": "wsc",
            "cluster": {
                "server": credentials.server,
                "insecure-skip-tls-verify": credentials.insecure,
            }
        }],
        "users": [{
            "name": "wsc",
            "user": { "token": credentials.token }
        }],
        "contexts": [{
            "name": "wsc",
            "context": { "cluster": "wsc", "user": "wsc" }
        }]
    })
}

pub(crate) fn classify(err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(response) => ClusterError::from_status(response.code, response.message),
        other => ClusterError::Transport(other.to_string()),
    }
}

/// Map the exec status channel's final status to a process exit code.
pub(crate) fn exit_code(status: Option<&Status>) -> i32 {
    let Some(status) = status else {
        return UNKNOWN_EXIT_CODE;
    };
    if status.status.as_deref() == Some("Success") {
        return 0;
    }
    status
        .details
        .as_ref()
        .and_then(|d| d.causes.as_ref())
        .into_iter()
        .flatten()
        .find(|cause| cause.reason.as_deref() == Some("ExitCode"))
        .and_then(|cause| cause.message.as_deref())
        .and_then(|message| message.trim().parse().ok())
        .unwrap_or(UNKNOWN_EXIT_CODE)
}

pub(crate) fn pod_info(pod: Pod) -> PodInfo {
    let containers = pod
        .spec
        .map(|spec| spec.containers)
        .unwrap_or_default()
        .into_iter()
        .map(|c| ContainerInfo {
            name: c.name,
            ports: c
                .ports
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| {
                    Some(ContainerPort {
                        name: p.name,
                        container_port: u16::try_from(p.container_port).ok()?,
                    })
                })
                .collect(),
        })
        .collect();
    PodInfo {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: pod.metadata.namespace.unwrap_or_default(),
        labels: pod.metadata.labels.unwrap_or_default(),
        containers,
    }
}

fn to_value(object: DynamicObject) -> Result<Value, ClusterError> {
    serde_json::to_value(object).map_err(|e| ClusterError::Decode(e.to_string()))
}

fn watch_event(
    event: Result<kube::api::WatchEvent<DynamicObject>, kube::Error>,
) -> Result<WatchEvent, ClusterError> {
    use kube::api::WatchEvent as KubeEvent;
    match event.map_err(classify)? {
        KubeEvent::Added(o) => to_value(o).map(WatchEvent::Added),
        KubeEvent::Modified(o) => to_value(o).map(WatchEvent::Modified),
        KubeEvent::Deleted(o) => to_value(o).map(WatchEvent::Deleted),
        KubeEvent::Bookmark(b) => Ok(WatchEvent::Bookmark {
            resource_version: b.metadata.resource_version,
        }),
        KubeEvent::Error(e) => Err(ClusterError::from_status(e.code, e.message)),
    }
}

#[async_trait]
impl ClusterAdapter for KubeClusterAdapter {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodInfo>, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);
        match pods.list(&params).await.map_err(classify) {
            Ok(list) => Ok(list.items.into_iter().map(pod_info).collect()),
            Err(ClusterError::Forbidden(message)) => {
                tracing::debug!(namespace, %message, "pod list forbidden, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn exec(
        &self,
        target: &PodContainerRef,
        command: &[String],
    ) -> Result<ExecProcess, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.isolated_client()?, &target.namespace);
        let params = AttachParams::default()
            .container(target.container_name.clone())
            .stdin(false)
            .stdout(true)
            .stderr(true);
        let mut attached = pods
            .exec(&target.pod_name, command.to_vec(), &params)
            .await
            .map_err(classify)?;

        let missing = |what: &str| ClusterError::Transport(format!("exec {} unavailable", what));
        let stdout = attached.stdout().ok_or_else(|| missing("stdout"))?;
        let stderr = attached.stderr().ok_or_else(|| missing("stderr"))?;
        let status = attached.take_status().ok_or_else(|| missing("status"))?;

        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::select! {
                status = status => {
                    let _ = exit_tx.send(exit_code(status.as_ref()));
                }
                _ = kill_rx => attached.abort(),
            }
        });

        Ok(ExecProcess::new(
            Box::new(stdout),
            Box::new(stderr),
            exit_rx,
            move || {
                let _ = kill_tx.send(());
            },
        ))
    }

    async fn port_forward(
        &self,
        target: &PodContainerRef,
        port: u16,
    ) -> Result<ForwardStream, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.isolated_client()?, &target.namespace);
        let mut forwarder = pods
            .portforward(&target.pod_name, &[port])
            .await
            .map_err(classify)?;
        let stream = forwarder
            .take_stream(port)
            .ok_or_else(|| ClusterError::Transport(format!("port {} was not forwarded", port)))?;
        Ok(Box::new(PortForwardStream {
            stream,
            forwarder: Box::new(forwarder),
        }))
    }

    async fn get_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ClusterError> {
        let object = self
            .dynamic_api(kind, namespace)
            .get(name)
            .await
            .map_err(classify)?;
        to_value(object)
    }

    async fn list_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
    ) -> Result<ObjectList, ClusterError> {
        let list = self
            .dynamic_api(kind, namespace)
            .list(&ListParams::default())
            .await
            .map_err(classify)?;
        let resource_version = list.metadata.resource_version;
        let items = list
            .items
            .into_iter()
            .map(to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ObjectList {
            items,
            resource_version,
        })
    }

    async fn patch_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Value, ClusterError> {
        let object = self
            .dynamic_api(kind, namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(classify)?;
        to_value(object)
    }

    async fn watch_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        field_selector: Option<&str>,
        resource_version: &str,
    ) -> Result<WatchStream, ClusterError> {
        let mut params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
        if let Some(selector) = field_selector {
            params = params.fields(selector);
        }
        let stream = self
            .dynamic_api(kind, namespace)
            .watch(&params, resource_version)
            .await
            .map_err(classify)?;
        Ok(stream.map(watch_event).boxed())
    }
}

/// Port-forward byte stream that owns its forwarder.
///
/// Dropping the stream aborts the forwarder.
struct PortForwardStream<S> {
    stream: S,
    forwarder: Box<Portforwarder>,
}

impl<S> Drop for PortForwardStream<S> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for PortForwardStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for PortForwardStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().stream).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
#[path = "k8s_tests.rs"]
mod tests;
