// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin client launched as a local subprocess

use super::{ClientError, ClientEvent, ClientHandle, ThinClientAdapter, CLIENT_EVENT_BUFFER};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wsc_core::{ClientId, IdGen, UuidIdGen};

/// Launches `command [args..] <uri>` and treats the process as present once
/// it has stayed up for the settle delay.
#[derive(Clone)]
pub struct ProcessClientAdapter {
    command: String,
    args: Vec<String>,
    settle: Duration,
    ids: UuidIdGen,
}

impl ProcessClientAdapter {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            settle: crate::env::client_settle(),
            ids: UuidIdGen,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

#[async_trait]
impl ThinClientAdapter for ProcessClientAdapter {
    async fn start(
        &self,
        uri: &str,
        label: &str,
        lifetime: &CancellationToken,
    ) -> Result<ClientHandle, ClientError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg(uri)
            .env("WSC_CLIENT_LABEL", label)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let child = cmd
            .spawn()
            .map_err(|e| ClientError::LaunchFailed(format!("{}: {}", self.command, e)))?;

        let id = ClientId::new(self.ids.next());
        let token = lifetime.child_token();
        let (tx, rx) = mpsc::channel(CLIENT_EVENT_BUFFER);
        tracing::debug!(client_id = %id, pid = ?child.id(), "thin client launched");
        tokio::spawn(supervise(child, tx, token.clone(), self.settle));
        Ok(ClientHandle::new(id, token, rx))
    }
}

async fn supervise(
    mut child: Child,
    tx: mpsc::Sender<ClientEvent>,
    lifetime: CancellationToken,
    settle: Duration,
) {
    let settled = tokio::time::sleep(settle);
    tokio::pin!(settled);
    let mut present = false;
    loop {
        tokio::select! {
            status = child.wait() => {
                let code = status.ok().and_then(|s| s.code()).unwrap_or(-1);
                let event = if present || code == 0 {
                    ClientEvent::Closed
                } else {
                    ClientEvent::FailedToOpen(code)
                };
                let _ = tx.send(event).await;
                return;
            }
            _ = &mut settled, if !present => {
                present = true;
                let _ = tx.send(ClientEvent::PresenceChanged).await;
            }
            _ = lifetime.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill thin client");
                }
                let _ = tx.send(ClientEvent::Closed).await;
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
