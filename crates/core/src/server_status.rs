// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status of the IDE server process running inside a workspace pod.
//!
//! The in-pod status command prints free text followed by a `STATUS:`
//! marker; everything after the marker is a JSON document:
//!
//! ```text
//! {"joinLink": "tcp://...", "httpLink": "...", "gatewayLink": "...",
//!  "appVersion": "...", "runtimeVersion": "...", "projects": [ {...} ]}
//! ```
//!
//! Parsing is total: anything that does not decode is the empty status.

use serde::{Deserialize, Serialize};

/// Literal line prefix after which the status output is JSON.
pub const STATUS_MARKER: &str = "STATUS:";

/// A project opened by the remote IDE server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectInfo {
    pub project_name: Option<String>,
    pub project_path: Option<String>,
    pub join_link: Option<String>,
    pub http_link: Option<String>,
    pub gateway_link: Option<String>,
}

/// Decoded status of the remote IDE server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteServerStatus {
    pub join_link: Option<String>,
    pub http_link: Option<String>,
    pub gateway_link: Option<String>,
    pub app_version: String,
    pub runtime_version: String,
    pub projects: Vec<ProjectInfo>,
}

/// Wire shape; every field may be absent or null.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    #[serde(default)]
    join_link: Option<String>,
    #[serde(default)]
    http_link: Option<String>,
    #[serde(default)]
    gateway_link: Option<String>,
    #[serde(default)]
    app_version: Option<String>,
    #[serde(default)]
    runtime_version: Option<String>,
    #[serde(default)]
    projects: Option<Vec<ProjectInfo>>,
}

impl From<RawStatus> for RemoteServerStatus {
    fn from(raw: RawStatus) -> Self {
        Self {
            join_link: raw.join_link,
            http_link: raw.http_link,
            gateway_link: raw.gateway_link,
            app_version: raw.app_version.unwrap_or_default(),
            runtime_version: raw.runtime_version.unwrap_or_default(),
            projects: raw.projects.unwrap_or_default(),
        }
    }
}

impl RemoteServerStatus {
    /// The empty sentinel: no links, no versions, no projects.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// A server is ready once it has minted a join link and opened a project.
    pub fn is_ready(&self) -> bool {
        self.join_link().is_some() && !self.projects.is_empty()
    }

    /// The join link, if present and non-blank.
    pub fn join_link(&self) -> Option<&str> {
        self.join_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }

    /// Parse the output of the status command.
    ///
    /// Looks for the `STATUS:` marker and decodes what follows it. Without a
    /// marker (or when the marked block does not decode) the last line that
    /// looks like a JSON object is tried. Never fails.
    pub fn parse(output: &str) -> Self {
        if let Some(idx) = output.find(STATUS_MARKER) {
            let block = &output[idx + STATUS_MARKER.len()..];
            if let Some(status) = decode(block.trim()) {
                return status;
            }
            if let Some(status) = decode_last_object_line(block) {
                return status;
            }
            return Self::empty();
        }
        decode_last_object_line(output).unwrap_or_default()
    }
}

fn decode(text: &str) -> Option<RemoteServerStatus> {
    if !text.starts_with('{') {
        return None;
    }
    serde_json::from_str::<RawStatus>(text).ok().map(Into::into)
}

fn decode_last_object_line(text: &str) -> Option<RemoteServerStatus> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .and_then(decode)
}

#[cfg(test)]
#[path = "server_status_tests.rs"]
mod tests;
