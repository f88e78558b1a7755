// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake cluster adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    ClusterAdapter, ClusterError, ExecProcess, ForwardStream, ObjectList, ResourceKind, WatchEvent,
    WatchStream,
};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use wsc_core::{PodContainerRef, PodInfo, WorkspacePhase};

/// Recorded cluster call
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterCall {
    ListPods {
        namespace: String,
        selector: String,
    },
    Exec {
        target: PodContainerRef,
        command: Vec<String>,
    },
    PortForward {
        target: PodContainerRef,
        port: u16,
    },
    GetObject {
        namespace: String,
        name: String,
    },
    ListObjects {
        namespace: String,
    },
    PatchObject {
        namespace: String,
        name: String,
        patch: Value,
    },
    WatchObjects {
        namespace: String,
        field_selector: Option<String>,
        resource_version: String,
    },
}

/// Scripted result of an exec call
#[derive(Debug, Clone)]
pub enum FakeExec {
    /// Write `stdout` and exit immediately
    Output { stdout: String, exit_code: i32 },
    /// Fail to start the command
    Error(ClusterError),
    /// Produce nothing and never exit until killed
    Hang,
}

impl FakeExec {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self::Output {
            stdout: stdout.into(),
            exit_code: 0,
        }
    }
}

type ObjectKey = (String, String, String);

struct FakeWatch {
    plural: String,
    namespace: String,
    name: Option<String>,
    tx: mpsc::UnboundedSender<Result<WatchEvent, ClusterError>>,
}

impl FakeWatch {
    fn matches(&self, key: &ObjectKey) -> bool {
        let name_matches = match &self.name {
            Some(name) => *name == key.2,
            None => true,
        };
        self.plural == key.0 && self.namespace == key.1 && name_matches
    }
}

struct FakeClusterState {
    pods: Vec<PodInfo>,
    list_pods_error: Option<ClusterError>,
    exec_queue: VecDeque<FakeExec>,
    exec_default: FakeExec,
    killed_hung_execs: usize,
    forward_failures: usize,
    forward_calls: usize,
    objects: BTreeMap<ObjectKey, Value>,
    resource_version: u64,
    patch_error: Option<ClusterError>,
    watch_error: Option<ClusterError>,
    watches: Vec<FakeWatch>,
    transition_delay: Option<Duration>,
    calls: Vec<ClusterCall>,
}

/// Fake cluster adapter for testing
///
/// Holds pods and custom objects in memory. Object updates bump a global
/// resource version and are pushed to every matching open watch.
#[derive(Clone)]
pub struct FakeClusterAdapter {
    inner: Arc<Mutex<FakeClusterState>>,
}

impl Default for FakeClusterAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClusterState {
                pods: Vec::new(),
                list_pods_error: None,
                exec_queue: VecDeque::new(),
                exec_default: FakeExec::Output {
                    stdout: String::new(),
                    exit_code: 0,
                },
                killed_hung_execs: 0,
                forward_failures: 0,
                forward_calls: 0,
                objects: BTreeMap::new(),
                resource_version: 1,
                patch_error: None,
                watch_error: None,
                watches: Vec::new(),
                transition_delay: None,
                calls: Vec::new(),
            })),
        }
    }
}

fn object_key(kind: &ResourceKind, namespace: &str, name: &str) -> ObjectKey {
    (
        kind.plural.to_string(),
        namespace.to_string(),
        name.to_string(),
    )
}

/// RFC 7386 JSON merge patch
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn name_from_selector(selector: Option<&str>) -> Option<String> {
    selector?
        .split(',')
        .find_map(|term| term.trim().strip_prefix("metadata.name="))
        .map(str::to_string)
}

impl FakeClusterState {
    fn bump(&mut self, key: &ObjectKey) -> Option<Value> {
        self.resource_version += 1;
        let version = self.resource_version.to_string();
        let object = self.objects.get_mut(key)?;
        if let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert("resourceVersion".to_string(), Value::String(version));
        }
        Some(object.clone())
    }

    fn notify(&mut self, key: &ObjectKey, event: WatchEvent) {
        self.watches.retain(|w| !w.tx.is_closed());
        for watch in self.watches.iter().filter(|w| w.matches(key)) {
            let _ = watch.tx.send(Ok(event.clone()));
        }
    }
}

impl FakeClusterAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ClusterCall> {
        self.inner.lock().calls.clone()
    }

    pub fn add_pod(&self, pod: PodInfo) {
        self.inner.lock().pods.push(pod);
    }

    pub fn remove_pods(&self) {
        self.inner.lock().pods.clear();
    }

    /// Make pod listing fail until cleared with `None`
    pub fn set_list_pods_error(&self, error: Option<ClusterError>) {
        self.inner.lock().list_pods_error = error;
    }

    /// Queue the result of the next exec call
    pub fn push_exec(&self, exec: FakeExec) {
        self.inner.lock().exec_queue.push_back(exec);
    }

    /// Result used once the exec queue is drained
    pub fn set_exec_default(&self, exec: FakeExec) {
        self.inner.lock().exec_default = exec;
    }

    /// Number of hung exec processes that were killed
    pub fn killed_hung_execs(&self) -> usize {
        self.inner.lock().killed_hung_execs
    }

    /// Fail the next `count` port-forward attempts
    pub fn fail_forwards(&self, count: usize) {
        self.inner.lock().forward_failures = count;
    }

    pub fn forward_calls(&self) -> usize {
        self.inner.lock().forward_calls
    }

    pub fn exec_calls(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ClusterCall::Exec { .. }))
            .count()
    }

    /// Store an object, keyed by its metadata namespace and name
    pub fn add_object(&self, kind: &ResourceKind, object: Value) {
        let namespace = object
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let name = object
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let key = object_key(kind, namespace, name);
        let mut state = self.inner.lock();
        state.objects.insert(key.clone(), object);
        if let Some(object) = state.bump(&key) {
            state.notify(&key, WatchEvent::Added(object));
        }
    }

    pub fn add_workspace(&self, object: Value) {
        self.add_object(&ResourceKind::DEV_WORKSPACE, object);
    }

    pub fn remove_object(&self, kind: &ResourceKind, namespace: &str, name: &str) {
        let key = object_key(kind, namespace, name);
        let mut state = self.inner.lock();
        if let Some(object) = state.bump(&key) {
            state.objects.remove(&key);
            state.notify(&key, WatchEvent::Deleted(object));
        }
    }

    pub fn object(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Option<Value> {
        self.inner
            .lock()
            .objects
            .get(&object_key(kind, namespace, name))
            .cloned()
    }

    /// Set a workspace's `status.phase` and notify watches
    pub fn set_phase(&self, namespace: &str, name: &str, phase: WorkspacePhase) {
        let patch = json!({ "status": { "phase": phase.to_string() } });
        let key = object_key(&ResourceKind::DEV_WORKSPACE, namespace, name);
        let mut state = self.inner.lock();
        if let Some(object) = state.objects.get_mut(&key) {
            merge_patch(object, &patch);
        }
        if let Some(object) = state.bump(&key) {
            state.notify(&key, WatchEvent::Modified(object));
        }
    }

    /// Drive workspace phases like an operator would when `spec.started`
    /// is patched: Starting then Running, or Stopping then Stopped, one
    /// step per `delay`.
    pub fn enable_transitions(&self, delay: Duration) {
        self.inner.lock().transition_delay = Some(delay);
    }

    pub fn set_patch_error(&self, error: Option<ClusterError>) {
        self.inner.lock().patch_error = error;
    }

    /// Fail the next watch call
    pub fn fail_next_watch(&self, error: ClusterError) {
        self.inner.lock().watch_error = Some(error);
    }

    /// Number of open watch streams
    pub fn watch_count(&self) -> usize {
        let mut state = self.inner.lock();
        state.watches.retain(|w| !w.tx.is_closed());
        state.watches.len()
    }

    /// End every open watch stream as if the server closed them
    pub fn break_watches(&self) {
        self.inner.lock().watches.clear();
    }

    /// Deliver `error` on every open watch, then close them
    pub fn fail_watches(&self, error: ClusterError) {
        let watches = std::mem::take(&mut self.inner.lock().watches);
        for watch in watches {
            let _ = watch.tx.send(Err(error.clone()));
        }
    }

    fn schedule_transitions(&self, namespace: &str, name: &str, started: bool, delay: Duration) {
        let phases = if started {
            [WorkspacePhase::Starting, WorkspacePhase::Running]
        } else {
            [WorkspacePhase::Stopping, WorkspacePhase::Stopped]
        };
        let fake = self.clone();
        let namespace = namespace.to_string();
        let name = name.to_string();
        tokio::spawn(async move {
            for phase in phases {
                tokio::time::sleep(delay).await;
                fake.set_phase(&namespace, &name, phase);
            }
        });
    }

    fn hung_process(&self) -> ExecProcess {
        let (stdout_w, stdout_r) = tokio::io::duplex(1024);
        let (stderr_w, stderr_r) = tokio::io::duplex(1024);
        let (exit_tx, exit_rx) = oneshot::channel::<i32>();
        let inner = Arc::clone(&self.inner);
        ExecProcess::new(Box::new(stdout_r), Box::new(stderr_r), exit_rx, move || {
            drop((stdout_w, stderr_w, exit_tx));
            inner.lock().killed_hung_execs += 1;
        })
    }
}

fn finished_process(stdout: String, exit_code: i32) -> ExecProcess {
    let (exit_tx, exit_rx) = oneshot::channel();
    let _ = exit_tx.send(exit_code);
    ExecProcess::new(
        Box::new(std::io::Cursor::new(stdout.into_bytes())),
        Box::new(std::io::Cursor::new(Vec::new())),
        exit_rx,
        || {},
    )
}

#[async_trait]
impl ClusterAdapter for FakeClusterAdapter {
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<PodInfo>, ClusterError> {
        let mut state = self.inner.lock();
        state.calls.push(ClusterCall::ListPods {
            namespace: namespace.to_string(),
            selector: label_selector.to_string(),
        });
        if let Some(error) = state.list_pods_error.clone() {
            return Err(error);
        }
        Ok(state
            .pods
            .iter()
            .filter(|p| p.namespace == namespace && p.matches_selector(label_selector))
            .cloned()
            .collect())
    }

    async fn exec(
        &self,
        target: &PodContainerRef,
        command: &[String],
    ) -> Result<ExecProcess, ClusterError> {
        let exec = {
            let mut state = self.inner.lock();
            state.calls.push(ClusterCall::Exec {
                target: target.clone(),
                command: command.to_vec(),
            });
            match state.exec_queue.pop_front() {
                Some(exec) => exec,
                None => state.exec_default.clone(),
            }
        };
        match exec {
            FakeExec::Output { stdout, exit_code } => Ok(finished_process(stdout, exit_code)),
            FakeExec::Error(error) => Err(error),
            FakeExec::Hang => Ok(self.hung_process()),
        }
    }

    async fn port_forward(
        &self,
        target: &PodContainerRef,
        port: u16,
    ) -> Result<ForwardStream, ClusterError> {
        {
            let mut state = self.inner.lock();
            state.calls.push(ClusterCall::PortForward {
                target: target.clone(),
                port,
            });
            state.forward_calls += 1;
            if state.forward_failures > 0 {
                state.forward_failures -= 1;
                return Err(ClusterError::Transport("connection refused".to_string()));
            }
        }
        // Remote end echoes everything it receives
        let (local, remote) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let (mut reader, mut writer) = tokio::io::split(remote);
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        });
        Ok(Box::new(local))
    }

    async fn get_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Value, ClusterError> {
        let mut state = self.inner.lock();
        state.calls.push(ClusterCall::GetObject {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        state
            .objects
            .get(&object_key(kind, namespace, name))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("{} {} not found", kind.plural, name)))
    }

    async fn list_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
    ) -> Result<ObjectList, ClusterError> {
        let mut state = self.inner.lock();
        state.calls.push(ClusterCall::ListObjects {
            namespace: namespace.to_string(),
        });
        let items = state
            .objects
            .iter()
            .filter(|(key, _)| key.0 == kind.plural && key.1 == namespace)
            .map(|(_, object)| object.clone())
            .collect();
        Ok(ObjectList {
            items,
            resource_version: Some(state.resource_version.to_string()),
        })
    }

    async fn patch_object(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Value, ClusterError> {
        let key = object_key(kind, namespace, name);
        let (object, delay) = {
            let mut state = self.inner.lock();
            state.calls.push(ClusterCall::PatchObject {
                namespace: namespace.to_string(),
                name: name.to_string(),
                patch: patch.clone(),
            });
            if let Some(error) = state.patch_error.clone() {
                return Err(error);
            }
            let Some(object) = state.objects.get_mut(&key) else {
                return Err(ClusterError::NotFound(format!(
                    "{} {} not found",
                    kind.plural, name
                )));
            };
            merge_patch(object, patch);
            let object = state.bump(&key).unwrap_or_default();
            state.notify(&key, WatchEvent::Modified(object.clone()));
            (object, state.transition_delay)
        };
        if let (Some(delay), Some(started)) =
            (delay, patch.pointer("/spec/started").and_then(Value::as_bool))
        {
            self.schedule_transitions(namespace, name, started, delay);
        }
        Ok(object)
    }

    async fn watch_objects(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        field_selector: Option<&str>,
        resource_version: &str,
    ) -> Result<WatchStream, ClusterError> {
        let mut state = self.inner.lock();
        state.calls.push(ClusterCall::WatchObjects {
            namespace: namespace.to_string(),
            field_selector: field_selector.map(str::to_string),
            resource_version: resource_version.to_string(),
        });
        if let Some(error) = state.watch_error.take() {
            return Err(error);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.watches.push(FakeWatch {
            plural: kind.plural.to_string(),
            namespace: namespace.to_string(),
            name: name_from_selector(field_selector),
            tx,
        });
        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
