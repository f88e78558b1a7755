// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pod model and the conventions used to locate a workspace's IDE server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label the DevWorkspace operator puts on every pod it creates.
pub const WORKSPACE_NAME_LABEL: &str = "controller.devfile.io/devworkspace_name";

/// Name of the container port the remote IDE server is exposed on.
pub const SERVER_PORT_NAME: &str = "idea-server";

/// Fixed port the in-pod IDE server listens on.
pub const REMOTE_SERVER_PORT: u16 = 5990;

/// Label selector matching the pods of the named workspace.
pub fn workspace_selector(workspace_name: &str) -> String {
    format!("{}={}", WORKSPACE_NAME_LABEL, workspace_name)
}

/// Resolved location to run commands in and forward ports to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodContainerRef {
    pub pod_name: String,
    pub namespace: String,
    pub container_name: String,
}

impl fmt::Display for PodContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}[{}]",
            self.namespace, self.pod_name, self.container_name
        )
    }
}

/// Declared container port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPort {
    pub name: Option<String>,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub ports: Vec<ContainerPort>,
}

impl ContainerInfo {
    /// Whether this container declares a port with the given name.
    pub fn exposes(&self, port_name: &str) -> bool {
        self.ports
            .iter()
            .any(|p| p.name.as_deref() == Some(port_name))
    }
}

/// The subset of a pod needed for connection establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ContainerInfo>,
}

impl PodInfo {
    /// Check an equality-based selector (`k=v,k2=v2`) against the pod labels.
    pub fn matches_selector(&self, selector: &str) -> bool {
        selector
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .all(|term| match term.split_once('=') {
                Some((key, value)) => self.labels.get(key).map(String::as_str) == Some(value),
                None => self.labels.contains_key(term),
            })
    }
}

#[cfg(test)]
#[path = "pod_tests.rs"]
mod tests;
