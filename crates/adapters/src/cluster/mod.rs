// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster API adapters

mod k8s;

pub use k8s::{ClusterCredentials, KubeClusterAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ClusterCall, FakeClusterAdapter, FakeExec};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use wsc_core::{PodContainerRef, PodInfo};

/// Group, version, kind and plural of a namespaced custom resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

impl ResourceKind {
    pub const DEV_WORKSPACE: ResourceKind = ResourceKind {
        group: "workspace.devfile.io",
        version: "v1alpha2",
        kind: "DevWorkspace",
        plural: "devworkspaces",
    };
}

/// Errors from cluster operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("cluster rejected credentials: {0}")]
    Unauthorized(String),
    #[error("access forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("resource version expired: {0}")]
    Gone(String),
    #[error("cluster API error {code}: {message}")]
    Api { code: u16, message: String },
    #[error("cluster connection failed: {0}")]
    Transport(String),
    #[error("invalid cluster response: {0}")]
    Decode(String),
}

impl ClusterError {
    /// Classify an API status code.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            410 => Self::Gone(message),
            _ => Self::Api { code, message },
        }
    }
}

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// A command running inside a container.
///
/// Dropping the process kills the remote command.
pub struct ExecProcess {
    stdout: Option<BoxedReader>,
    stderr: Option<BoxedReader>,
    exit: Option<oneshot::Receiver<i32>>,
    exit_code: Option<i32>,
    kill: Option<Box<dyn FnOnce() + Send>>,
}

impl ExecProcess {
    pub fn new(
        stdout: BoxedReader,
        stderr: BoxedReader,
        exit: oneshot::Receiver<i32>,
        kill: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            stdout: Some(stdout),
            stderr: Some(stderr),
            exit: Some(exit),
            exit_code: None,
            kill: Some(Box::new(kill)),
        }
    }

    pub fn take_stdout(&mut self) -> Option<BoxedReader> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<BoxedReader> {
        self.stderr.take()
    }

    /// Exit code if the command has finished, without waiting.
    pub fn try_exit_code(&mut self) -> Option<i32> {
        if self.exit_code.is_none() {
            if let Some(rx) = self.exit.as_mut() {
                if let Ok(code) = rx.try_recv() {
                    self.exit_code = Some(code);
                    self.exit = None;
                }
            }
        }
        self.exit_code
    }

    /// Wait for the command to finish.
    ///
    /// Returns `None` when the process was killed or the stream was lost
    /// before an exit status arrived.
    pub async fn wait(&mut self) -> Option<i32> {
        if let Some(code) = self.exit_code {
            return Some(code);
        }
        let rx = self.exit.take()?;
        let code = rx.await.ok();
        self.exit_code = code;
        code
    }

    /// Kill the remote command. Idempotent.
    pub fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            kill();
        }
    }
}

impl Drop for ExecProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

impl std::fmt::Debug for ExecProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecProcess")
            .field("exit_code", &self.exit_code)
            .field("killed", &self.kill.is_none())
            .finish()
    }
}

/// Bidirectional byte stream to a pod port.
pub trait ForwardIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ForwardIo for T {}

pub type ForwardStream = Box<dyn ForwardIo>;

/// Objects returned by a list call, with the collection's resource version.
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    pub items: Vec<Value>,
    pub resource_version: Option<String>,
}

/// Event delivered by a resource watch
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(Value),
    Modified(Value),
    Deleted(Value),
    /// Progress marker carrying the latest resource version
    Bookmark { resource_version: String },
}

pub type WatchStream = BoxStream<'static, Result<WatchEvent, ClusterError>>;

/// Adapter for the container-orchestration API.
#[async_trait]
pub trait ClusterAdapter: Clone + Send + Sync + 'static {
    /// List pods in `namespace` matching `label_selector`.
    ///
    /// A forbidden list yields no pods rather than an error.
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodInfo>, ClusterError>;

    /// Run `command` in the target container with stdout and stderr attached.
    async fn exec(
        &self,
        target: &PodContainerRef,
        command: &[String],
    ) -> Result<ExecProcess, ClusterError>;

    /// Open a byte stream to `port` on the target pod.
    async fn port_forward(
        &self,
        target: &PodContainerRef,
        port: u16,
    ) -> Result<ForwardStream, ClusterError>;

    async fn get_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ClusterError>;

    async fn list_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
    ) -> Result<ObjectList, ClusterError>;

    /// Apply a JSON merge patch and return the updated object.
    async fn patch_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Value, ClusterError>;

    /// Watch objects in `namespace` from `resource_version` on.
    ///
    /// The stream ends when the server closes the watch; an expired
    /// resource version surfaces as [`ClusterError::Gone`].
    async fn watch_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        field_selector: Option<&str>,
        resource_version: &str,
    ) -> Result<WatchStream, ClusterError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
