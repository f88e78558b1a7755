// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identity, lifecycle phase and point-in-time snapshots.
//!
//! A workspace is a DevWorkspace custom resource. Its phase is driven by the
//! cluster operator; this crate only observes it, so every observation
//! produces a fresh [`WorkspaceSnapshot`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Annotation carrying the editor a workspace was created for.
pub const EDITOR_ANNOTATION: &str = "che.eclipse.org/che-editor";

/// Identifies a remote workspace by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub namespace: String,
    pub name: String,
}

impl WorkspaceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid workspace reference '{0}': expected <namespace>/<name>")]
pub struct ParseWorkspaceRefError(pub String);

impl FromStr for WorkspaceRef {
    type Err = ParseWorkspaceRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(ns, name))
            }
            _ => Err(ParseWorkspaceRefError(s.to_string())),
        }
    }
}

/// Cluster-observed lifecycle phase of a workspace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkspacePhase {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failing,
    Failed,
    /// Phase missing or not recognised
    #[default]
    Unknown,
}

impl WorkspacePhase {
    /// Parse the operator's `status.phase` string. Unrecognised values map
    /// to `Unknown`.
    pub fn from_status(phase: &str) -> Self {
        match phase {
            "Starting" => Self::Starting,
            "Running" => Self::Running,
            "Stopping" => Self::Stopping,
            "Stopped" => Self::Stopped,
            "Failing" => Self::Failing,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Phases a wait can settle on.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Running | Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for WorkspacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failing => "Failing",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Errors decoding a workspace document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("workspace document is missing {0}")]
    MissingField(&'static str),
}

/// Point-in-time view of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub workspace: WorkspaceRef,
    pub started: bool,
    pub phase: WorkspacePhase,
    /// Editor id from the workspace annotation; empty when absent
    pub editor: String,
    pub resource_version: Option<String>,
}

impl WorkspaceSnapshot {
    /// Decode a DevWorkspace custom-resource document.
    ///
    /// Only `metadata.namespace` and `metadata.name` are required; a missing
    /// `spec.started` reads as not started and a missing phase as `Unknown`.
    pub fn from_object(object: &Value) -> Result<Self, SnapshotError> {
        let metadata = object
            .get("metadata")
            .ok_or(SnapshotError::MissingField("metadata"))?;
        let namespace = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .ok_or(SnapshotError::MissingField("metadata.namespace"))?;
        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .ok_or(SnapshotError::MissingField("metadata.name"))?;

        let started = object
            .pointer("/spec/started")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let phase = object
            .pointer("/status/phase")
            .and_then(Value::as_str)
            .map(WorkspacePhase::from_status)
            .unwrap_or_default();
        let editor = metadata
            .get("annotations")
            .and_then(|a| a.get(EDITOR_ANNOTATION))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let resource_version = metadata
            .get("resourceVersion")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            workspace: WorkspaceRef::new(namespace, name),
            started,
            phase,
            editor,
            resource_version,
        })
    }

    pub fn is_running(&self) -> bool {
        self.phase == WorkspacePhase::Running
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
