// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by a connect attempt

use crate::lifecycle::LifecycleError;
use crate::probe::ProbeError;
use crate::resolver::ResolveError;
use crate::tunnel::TunnelError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use wsc_adapters::ClientError;
use wsc_core::{JoinLinkError, WorkspacePhase, WorkspaceRef};

/// Why a thin client never became present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientFailure {
    FailedToOpen(i32),
    Closed,
    Timeout(Duration),
}

impl fmt::Display for ClientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientFailure::FailedToOpen(code) => write!(f, "client exited with code {code}"),
            ClientFailure::Closed => f.write_str("client closed before attaching"),
            ClientFailure::Timeout(t) => write!(f, "client did not attach within {}s", t.as_secs()),
        }
    }
}

fn phase_suffix(phase: &Option<WorkspacePhase>) -> String {
    match phase {
        Some(phase) => format!(" (phase {phase})"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("workspace {0} is already connected")]
    AlreadyConnected(WorkspaceRef),
    #[error("workspace {workspace} did not reach Running{}", phase_suffix(.phase))]
    WorkspaceNotRunning {
        workspace: WorkspaceRef,
        phase: Option<WorkspacePhase>,
    },
    #[error("cannot locate the IDE server of {workspace}")]
    Resolution {
        workspace: WorkspaceRef,
        #[source]
        source: ResolveError,
    },
    #[error("IDE server in {workspace} is not ready")]
    ServerNotReady {
        workspace: WorkspaceRef,
        #[source]
        source: ProbeError,
    },
    #[error("IDE server in {workspace} reported no join link")]
    JoinLinkMissing { workspace: WorkspaceRef },
    #[error("invalid join link")]
    InvalidJoinLink(#[from] JoinLinkError),
    #[error("failed to open tunnel")]
    Tunnel(#[from] TunnelError),
    #[error("failed to launch thin client")]
    Client(#[from] ClientError),
    #[error("thin client not ready: {0}")]
    ClientNotReady(ClientFailure),
    #[error("workspace {workspace} lifecycle failed")]
    Lifecycle {
        workspace: WorkspaceRef,
        #[source]
        source: LifecycleError,
    },
    #[error("connect cancelled")]
    Cancelled,
}

impl ConnectError {
    pub(crate) fn lifecycle(workspace: &WorkspaceRef, source: LifecycleError) -> Self {
        match source {
            LifecycleError::Cancelled => ConnectError::Cancelled,
            source => ConnectError::Lifecycle {
                workspace: workspace.clone(),
                source,
            },
        }
    }

    pub(crate) fn server(workspace: &WorkspaceRef, source: ProbeError) -> Self {
        match source {
            source if source.is_cancelled() => ConnectError::Cancelled,
            ProbeError::Resolve(
                source @ (ResolveError::NotRunning { .. } | ResolveError::ServerContainerMissing { .. }),
            ) => ConnectError::Resolution {
                workspace: workspace.clone(),
                source,
            },
            source => ConnectError::ServerNotReady {
                workspace: workspace.clone(),
                source,
            },
        }
    }

    /// Readiness timeouts, which a user may reasonably retry.
    pub fn is_timeout(&self) -> bool {
        match self {
            ConnectError::WorkspaceNotRunning { .. } => true,
            ConnectError::ServerNotReady { source, .. } => {
                matches!(source, ProbeError::NotReady { .. } | ProbeError::Timeout)
            }
            ConnectError::ClientNotReady(failure) => matches!(failure, ClientFailure::Timeout(_)),
            ConnectError::Tunnel(TunnelError::ReadyTimeout { .. }) => true,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConnectError::Cancelled)
    }

    /// Short reason with the root cause appended when it adds anything.
    pub fn user_message(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        let mut root = None;
        while let Some(err) = cause {
            root = Some(err);
            cause = err.source();
        }
        if let Some(root) = root {
            let root = root.to_string();
            if !message.contains(&root) {
                message.push_str(": ");
                message.push_str(&root);
            }
        }
        message
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
