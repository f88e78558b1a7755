// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    workspace_selector, ContainerInfo, ContainerPort, PodInfo, WorkspacePhase,
    REMOTE_SERVER_PORT, SERVER_PORT_NAME, WORKSPACE_NAME_LABEL,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

// ── Workspace documents ─────────────────────────────────────────────────────

/// A DevWorkspace document as the cluster would return it.
pub fn workspace_object(namespace: &str, name: &str, started: bool, phase: WorkspacePhase) -> Value {
    json!({
        "apiVersion": "workspace.devfile.io/v1alpha2",
        "kind": "DevWorkspace",
        "metadata": {
            "namespace": namespace,
            "name": name,
            "resourceVersion": "1",
            "annotations": { "che.eclipse.org/che-editor": "che-incubator/che-idea/latest" }
        },
        "spec": { "started": started },
        "status": { "phase": phase.to_string() }
    })
}

// ── Pods ────────────────────────────────────────────────────────────────────

/// A workspace pod whose `tools` container exposes the IDE server port.
pub fn workspace_pod(namespace: &str, workspace: &str, pod_name: &str) -> PodInfo {
    PodInfo {
        name: pod_name.to_string(),
        namespace: namespace.to_string(),
        labels: BTreeMap::from([(WORKSPACE_NAME_LABEL.to_string(), workspace.to_string())]),
        containers: vec![
            ContainerInfo {
                name: "che-gateway".to_string(),
                ports: vec![ContainerPort {
                    name: Some("gateway".to_string()),
                    container_port: 3100,
                }],
            },
            ContainerInfo {
                name: "tools".to_string(),
                ports: vec![ContainerPort {
                    name: Some(SERVER_PORT_NAME.to_string()),
                    container_port: REMOTE_SERVER_PORT,
                }],
            },
        ],
    }
}

/// A pod for `workspace` with no container exposing the IDE server port.
pub fn workspace_pod_without_server(namespace: &str, workspace: &str, pod_name: &str) -> PodInfo {
    let mut pod = workspace_pod(namespace, workspace, pod_name);
    pod.containers.retain(|c| !c.exposes(SERVER_PORT_NAME));
    pod
}

/// Selector a resolver would use for `workspace`.
pub fn selector_for(workspace: &str) -> String {
    workspace_selector(workspace)
}

// ── Status command output ───────────────────────────────────────────────────

/// Output of a status command reporting a ready server with one project.
pub fn ready_status_output(join_link: &str) -> String {
    format!(
        "Remote dev server status\nSTATUS:\n{}\n",
        json!({
            "joinLink": join_link,
            "httpLink": null,
            "gatewayLink": null,
            "appVersion": "2024.1",
            "runtimeVersion": "17.0.10",
            "projects": [{ "projectName": "demo", "projectPath": "/projects/demo" }]
        })
    )
}

/// Output of a status command for a server that has not opened a project.
pub fn starting_status_output() -> String {
    "Remote dev server status\nSTATUS:\n{\"joinLink\":null,\"projects\":[]}\n".to_string()
}
