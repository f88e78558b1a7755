// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wsc connect` - Connect a thin client to a remote workspace
//!
//! Prints progress while the workspace and its IDE server come up, then
//! stays in the foreground until the session closes. Ctrl+C disconnects.

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{
    ClusterAdapter, NoOpClientAdapter, ProcessClientAdapter, ThinClientAdapter, TracedClient,
};
use wsc_core::WorkspaceRef;
use wsc_engine::{
    ActiveWorkspaces, CloseReason, ConnectConfig, ConnectionObserver, ConnectionOrchestrator,
    ConnectionState, RestartReason, SessionInfo,
};

use crate::config::Config;

#[derive(Args)]
pub struct ConnectArgs {
    /// Workspace as <namespace>/<name>
    pub workspace: WorkspaceRef,

    /// Don't watch for IDE server restarts
    #[arg(long)]
    pub no_monitor: bool,

    /// Stop the workspace after the session closes
    #[arg(long)]
    pub stop_on_close: bool,

    /// Thin client command; the local join link is appended as last argument
    #[arg(long, value_name = "CMD")]
    pub client_command: Option<String>,
}

impl ConnectArgs {
    /// Engine configuration with command-line flags applied over the file
    pub fn connect_config(&self, config: &Config) -> ConnectConfig {
        let mut connect = config.connect_config();
        if self.no_monitor {
            connect.monitor = None;
        }
        if self.stop_on_close {
            connect.stop_workspace_on_close = true;
        }
        connect
    }

    /// Client command and arguments, flag first, then config file
    pub fn client_command(&self, config: &Config) -> Option<(String, Vec<String>)> {
        if let Some(line) = &self.client_command {
            let mut words = line.split_whitespace().map(str::to_string);
            let command = words.next()?;
            return Some((command, words.collect()));
        }
        config
            .client
            .command
            .clone()
            .map(|command| (command, config.client.args.clone()))
    }
}

/// Prints connection progress as plain lines.
pub struct ProgressObserver<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> ProgressObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn line(&self, text: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

impl<W: Write + Send> ConnectionObserver for ProgressObserver<W> {
    fn on_state(&self, workspace: &WorkspaceRef, state: ConnectionState) {
        match state {
            // Reported by the callbacks below
            ConnectionState::Idle
            | ConnectionState::Connected
            | ConnectionState::Closed
            | ConnectionState::Failed => {}
            _ => self.line(format_args!("{}: {}...", workspace, state)),
        }
    }

    fn on_connected(&self, info: &SessionInfo) {
        self.line(format_args!(
            "Connected to {} on 127.0.0.1:{}",
            info.workspace, info.local_port
        ));
        self.line(format_args!("Join link: {}", info.join_link));
    }

    fn on_restart_detected(&self, workspace: &WorkspaceRef, reason: &RestartReason) {
        self.line(format_args!("{}: IDE server restarted ({}), reconnecting...", workspace, reason));
    }

    fn on_recovered(&self, info: &SessionInfo) {
        self.line(format_args!(
            "Reconnected to {} on 127.0.0.1:{}",
            info.workspace, info.local_port
        ));
    }

    fn on_disconnected(&self, workspace: &WorkspaceRef, reason: &CloseReason) {
        self.line(format_args!("Disconnected from {}: {}", workspace, reason));
    }
}

pub async fn handle<C: ClusterAdapter>(
    args: ConnectArgs,
    config: &Config,
    cluster: C,
    cancel: &CancellationToken,
) -> Result<()> {
    let connect = args.connect_config(config);
    let observer: Arc<dyn ConnectionObserver> = Arc::new(ProgressObserver::new(std::io::stderr()));
    let reason = match args.client_command(config) {
        Some((command, client_args)) => {
            tracing::info!(%command, "using thin client command");
            let client = TracedClient::new(ProcessClientAdapter::new(command, client_args));
            run(&args.workspace, cluster, client, connect, observer, cancel).await?
        }
        None => {
            let client = TracedClient::new(NoOpClientAdapter::new());
            run(&args.workspace, cluster, client, connect, observer, cancel).await?
        }
    };
    check_close(reason)
}

/// Connect and block until the session closes.
pub async fn run<C, T>(
    workspace: &WorkspaceRef,
    cluster: C,
    client: T,
    config: ConnectConfig,
    observer: Arc<dyn ConnectionObserver>,
    cancel: &CancellationToken,
) -> Result<CloseReason>
where
    C: ClusterAdapter,
    T: ThinClientAdapter,
{
    let orchestrator = ConnectionOrchestrator::new(cluster, client, ActiveWorkspaces::new(), config);
    let session = orchestrator
        .connect(workspace, observer, cancel)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;
    tracing::info!(session_id = %session.id, port = session.local_port(), "session open");
    Ok(session.closed().await)
}

/// Closing on request is success; closing because something broke is not.
fn check_close(reason: CloseReason) -> Result<()> {
    match reason {
        CloseReason::ClientClosed | CloseReason::Disconnected | CloseReason::WorkspaceStopped => {
            Ok(())
        }
        CloseReason::RecoveryFailed(e) => bail!("lost connection: {}", e),
        CloseReason::Failed(e) => bail!("{}", e),
    }
}

#[cfg(test)]
#[path = "connect_tests.rs"]
mod tests;
