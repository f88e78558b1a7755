// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handle to a connected workspace session

use serde::Serialize;
use std::fmt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use wsc_core::{ClientId, SessionId, WorkspaceRef};

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CloseReason {
    ClientClosed,
    Disconnected,
    WorkspaceStopped,
    RecoveryFailed(String),
    Failed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientClosed => f.write_str("client closed"),
            CloseReason::Disconnected => f.write_str("disconnected"),
            CloseReason::WorkspaceStopped => f.write_str("workspace stopped"),
            CloseReason::RecoveryFailed(e) => write!(f, "recovery failed: {e}"),
            CloseReason::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Observable state of a session. Port, link and client change on recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub workspace: WorkspaceRef,
    pub local_port: u16,
    /// Join link pointing at the local end of the tunnel
    pub join_link: String,
    pub client_id: ClientId,
    pub recoveries: u32,
    pub closed: Option<CloseReason>,
}

/// A connected workspace.
///
/// The session's resources are owned by a supervisor task; this handle
/// observes it and can request a disconnect. Dropping the handle leaves the
/// session running.
pub struct Session {
    pub id: SessionId,
    pub workspace: WorkspaceRef,
    info: watch::Receiver<SessionInfo>,
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn new(info: watch::Receiver<SessionInfo>, cancel: CancellationToken) -> Self {
        let (id, workspace) = {
            let current = info.borrow();
            (current.session_id.clone(), current.workspace.clone())
        };
        Self {
            id,
            workspace,
            info,
            cancel,
        }
    }

    pub fn info(&self) -> SessionInfo {
        self.info.borrow().clone()
    }

    pub fn local_port(&self) -> u16 {
        self.info.borrow().local_port
    }

    pub fn join_link(&self) -> String {
        self.info.borrow().join_link.clone()
    }

    /// Receiver notified on every change to the session info
    pub fn subscribe(&self) -> watch::Receiver<SessionInfo> {
        self.info.clone()
    }

    /// Request the session to close. Idempotent.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.info.borrow().closed.is_some()
    }

    /// Wait until the session has fully closed.
    pub async fn closed(&self) -> CloseReason {
        let mut info = self.info.clone();
        let result = info
            .wait_for(|i| i.closed.is_some())
            .await
            .map(|i| i.closed.clone());
        match result {
            Ok(Some(reason)) => reason,
            // Supervisor gone without reporting
            _ => CloseReason::Disconnected,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
