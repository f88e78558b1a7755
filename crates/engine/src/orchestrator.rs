// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state machine.
//!
//! `connect` walks a workspace from whatever phase it is in to an attached
//! thin client, then hands the live connection to a supervisor task. The
//! supervisor owns tunnel, client, monitor and workspace watch until the
//! session closes, and rebuilds tunnel and client when the monitor reports
//! a server restart.

use crate::active::{ActiveGuard, ActiveWorkspaces};
use crate::attach::{attach, AttachRequest, Attachment};
use crate::error::ConnectError;
use crate::lifecycle::WorkspaceLifecycle;
use crate::monitor::{ConnectionMonitor, MonitorConfig, RestartReason};
use crate::probe::{ProbeConfig, RemoteServerStatusProbe};
use crate::recovery::{ConnectionRecovery, RecoveryConfig, RecoveryError};
use crate::session::{CloseReason, Session, SessionInfo};
use crate::tunnel::{ForwardRetry, TunnelForwarder};
use crate::watcher::{WatcherConfig, WorkspaceEvent, WorkspaceWatcher};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClientEvent, ClusterAdapter, ThinClientAdapter};
use wsc_core::{IdGen, SessionId, UuidIdGen, WorkspacePhase, WorkspaceRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    ResolvingWorkspace,
    WaitingWorkspaceReady,
    WaitingServerReady,
    OpeningTunnel,
    StartingClient,
    WaitingClientAttached,
    Connected,
    Closing,
    Closed,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::ResolvingWorkspace => "resolving workspace",
            Self::WaitingWorkspaceReady => "waiting for workspace",
            Self::WaitingServerReady => "waiting for IDE server",
            Self::OpeningTunnel => "opening tunnel",
            Self::StartingClient => "starting client",
            Self::WaitingClientAttached => "waiting for client",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Callbacks for one connection. All methods default to no-ops.
pub trait ConnectionObserver: Send + Sync {
    fn on_state(&self, _workspace: &WorkspaceRef, _state: ConnectionState) {}

    fn on_connected(&self, _info: &SessionInfo) {}

    fn on_restart_detected(&self, _workspace: &WorkspaceRef, _reason: &RestartReason) {}

    fn on_recovered(&self, _info: &SessionInfo) {}

    /// Called exactly once per connect attempt that got past the duplicate
    /// check, whether it failed, was cancelled or closed after connecting.
    fn on_disconnected(&self, _workspace: &WorkspaceRef, _reason: &CloseReason) {}
}

pub struct NoOpObserver;

impl ConnectionObserver for NoOpObserver {}

#[derive(Debug, Clone, Copy)]
pub struct ConnectConfig {
    pub workspace_ready_timeout: Duration,
    pub server_ready_timeout: Duration,
    pub client_attach_timeout: Duration,
    pub tunnel_ready_timeout: Duration,
    /// Stop the workspace once the session closes and its server is gone
    pub stop_workspace_on_close: bool,
    pub server_terminated_timeout: Duration,
    /// `None` disables restart monitoring
    pub monitor: Option<MonitorConfig>,
    pub recovery: RecoveryConfig,
    pub probe: ProbeConfig,
    pub forward_retry: ForwardRetry,
    pub watcher: WatcherConfig,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            workspace_ready_timeout: Duration::from_secs(300),
            server_ready_timeout: Duration::from_secs(60),
            client_attach_timeout: Duration::from_secs(60),
            tunnel_ready_timeout: Duration::from_secs(5),
            stop_workspace_on_close: false,
            server_terminated_timeout: Duration::from_secs(20),
            monitor: Some(MonitorConfig::default()),
            recovery: RecoveryConfig::default(),
            probe: ProbeConfig::default(),
            forward_retry: ForwardRetry::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

/// Every phase but Failed
const RECONCILED_PHASES: [WorkspacePhase; 6] = [
    WorkspacePhase::Starting,
    WorkspacePhase::Running,
    WorkspacePhase::Stopping,
    WorkspacePhase::Stopped,
    WorkspacePhase::Failing,
    WorkspacePhase::Unknown,
];

/// Connects workspaces, at most one session per workspace.
#[derive(Clone)]
pub struct ConnectionOrchestrator<C, T> {
    cluster: C,
    client: T,
    active: ActiveWorkspaces,
    config: ConnectConfig,
    ids: UuidIdGen,
}

/// Everything a successful connect hands to the supervisor
struct Established<C> {
    probe: Arc<RemoteServerStatusProbe<C>>,
    join_link: String,
    attachment: Attachment,
}

impl<C, T> ConnectionOrchestrator<C, T>
where
    C: ClusterAdapter,
    T: ThinClientAdapter,
{
    pub fn new(cluster: C, client: T, active: ActiveWorkspaces, config: ConnectConfig) -> Self {
        Self {
            cluster,
            client,
            active,
            config,
            ids: UuidIdGen,
        }
    }

    pub fn active(&self) -> &ActiveWorkspaces {
        &self.active
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    /// Connect `workspace`, returning once a client is attached.
    ///
    /// Cancelling `cancel` aborts the attempt, or disconnects the session
    /// once connected.
    pub async fn connect(
        &self,
        workspace: &WorkspaceRef,
        observer: Arc<dyn ConnectionObserver>,
        cancel: &CancellationToken,
    ) -> Result<Session, ConnectError> {
        let Some(mut guard) = self.active.try_register(workspace) else {
            tracing::info!(%workspace, "workspace already connected");
            return Err(ConnectError::AlreadyConnected(workspace.clone()));
        };

        let session_id = SessionId::new(self.ids.next());
        let token = cancel.child_token();
        let report = {
            let observer = Arc::clone(&observer);
            let workspace = workspace.clone();
            move |state: ConnectionState| {
                tracing::debug!(%workspace, %state, "connection state");
                observer.on_state(&workspace, state);
            }
        };
        report(ConnectionState::Idle);
        tracing::info!(%workspace, %session_id, "connecting");

        let established = match self.establish(workspace, &token, &report).await {
            Ok(established) => established,
            Err(e) => {
                token.cancel();
                guard.release();
                let reason = if e.is_cancelled() {
                    tracing::info!(%workspace, "connect cancelled");
                    CloseReason::Disconnected
                } else {
                    tracing::warn!(%workspace, error = %e.user_message(), "connect failed");
                    CloseReason::Failed(e.user_message())
                };
                report(ConnectionState::Failed);
                observer.on_disconnected(workspace, &reason);
                return Err(e);
            }
        };

        let info = SessionInfo {
            session_id,
            workspace: workspace.clone(),
            local_port: established.attachment.local_port(),
            join_link: established.attachment.local_join_link.clone(),
            client_id: established.attachment.client.id.clone(),
            recoveries: 0,
            closed: None,
        };
        let (info_tx, info_rx) = watch::channel(info.clone());
        report(ConnectionState::Connected);
        observer.on_connected(&info);
        tracing::info!(%workspace, local_port = info.local_port, "connected");

        let supervisor = Supervisor {
            workspace: workspace.clone(),
            cluster: self.cluster.clone(),
            lifecycle: WorkspaceLifecycle::new(self.cluster.clone()),
            recovery: ConnectionRecovery::new(
                Arc::clone(&established.probe),
                self.forwarder(),
                self.client.clone(),
                self.config.recovery,
            ),
            probe: established.probe,
            config: self.config,
            observer,
            info_tx,
            token: token.clone(),
        };
        tokio::spawn(supervisor.run(established.attachment, established.join_link, guard));
        Ok(Session::new(info_rx, token))
    }

    fn forwarder(&self) -> TunnelForwarder<C> {
        TunnelForwarder::new(self.cluster.clone()).with_retry(self.config.forward_retry)
    }

    async fn establish(
        &self,
        workspace: &WorkspaceRef,
        token: &CancellationToken,
        report: &(dyn Fn(ConnectionState) + Send + Sync),
    ) -> Result<Established<C>, ConnectError> {
        let lifecycle = WorkspaceLifecycle::new(self.cluster.clone());
        let lifecycle_err = |e| ConnectError::lifecycle(workspace, e);

        report(ConnectionState::ResolvingWorkspace);
        let snapshot = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ConnectError::Cancelled),
            snapshot = lifecycle.snapshot(workspace) => snapshot.map_err(lifecycle_err)?,
        };
        if !snapshot.started {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ConnectError::Cancelled),
                started = lifecycle.start(workspace) => started.map_err(lifecycle_err)?,
            };
        }

        report(ConnectionState::WaitingWorkspaceReady);
        if !snapshot.is_running() {
            // A freshly started workspace still shows its old Failed phase
            // until the operator reconciles.
            let stale_failure = !snapshot.started && snapshot.phase == WorkspacePhase::Failed;
            self.wait_running(&lifecycle, workspace, stale_failure, token).await?;
        }

        let probe = Arc::new(RemoteServerStatusProbe::new(
            self.cluster.clone(),
            workspace.clone(),
            self.config.probe,
        ));
        let target = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ConnectError::Cancelled),
            target = probe.target() => target.map_err(|e| ConnectError::server(workspace, e))?,
        };

        report(ConnectionState::WaitingServerReady);
        let status = probe
            .wait_server_ready(self.config.server_ready_timeout, token)
            .await
            .map_err(|e| ConnectError::server(workspace, e))?;
        let join_link = status
            .join_link()
            .ok_or_else(|| ConnectError::JoinLinkMissing {
                workspace: workspace.clone(),
            })?
            .to_string();

        let label = workspace.to_string();
        let attachment = attach(
            &self.forwarder(),
            &self.client,
            AttachRequest {
                target: &target,
                join_link: &join_link,
                label: &label,
                tunnel_ready: self.config.tunnel_ready_timeout,
                client_attach: self.config.client_attach_timeout,
            },
            token,
            report,
        )
        .await?;

        Ok(Established {
            probe,
            join_link,
            attachment,
        })
    }

    /// Wait for Running within the workspace ready timeout. With
    /// `stale_failure`, Failed only counts once another phase was seen.
    async fn wait_running(
        &self,
        lifecycle: &WorkspaceLifecycle<C>,
        workspace: &WorkspaceRef,
        stale_failure: bool,
        token: &CancellationToken,
    ) -> Result<(), ConnectError> {
        let lifecycle_err = |e| ConnectError::lifecycle(workspace, e);
        let deadline = Instant::now() + self.config.workspace_ready_timeout;
        let not_running = |phase| ConnectError::WorkspaceNotRunning {
            workspace: workspace.clone(),
            phase,
        };

        if stale_failure {
            let left_failed = lifecycle
                .wait_phase_changes(
                    workspace,
                    &RECONCILED_PHASES,
                    deadline.saturating_duration_since(Instant::now()),
                    token,
                )
                .await
                .map_err(lifecycle_err)?;
            match left_failed {
                Some(WorkspacePhase::Running) => return Ok(()),
                Some(_) => {}
                None => return Err(not_running(Some(WorkspacePhase::Failed))),
            }
        }

        let reached = lifecycle
            .wait_phase_changes(
                workspace,
                &[WorkspacePhase::Running, WorkspacePhase::Failed],
                deadline.saturating_duration_since(Instant::now()),
                token,
            )
            .await
            .map_err(lifecycle_err)?;
        match reached {
            Some(WorkspacePhase::Running) => Ok(()),
            phase => Err(not_running(phase)),
        }
    }
}

/// What woke the supervisor
enum Step {
    Continue,
    Restart(RestartReason),
    Close(CloseReason),
}

struct Supervisor<C, T> {
    workspace: WorkspaceRef,
    cluster: C,
    lifecycle: WorkspaceLifecycle<C>,
    probe: Arc<RemoteServerStatusProbe<C>>,
    recovery: ConnectionRecovery<C, T>,
    config: ConnectConfig,
    observer: Arc<dyn ConnectionObserver>,
    info_tx: watch::Sender<SessionInfo>,
    token: CancellationToken,
}

/// Whether a workspace event means the session's workspace went away
fn ends_session(event: &WorkspaceEvent, workspace: &WorkspaceRef) -> bool {
    let snapshot = event.snapshot();
    if snapshot.workspace != *workspace {
        return false;
    }
    match event {
        WorkspaceEvent::Removed(_) => true,
        WorkspaceEvent::Added(s) | WorkspaceEvent::Modified(s) => {
            !s.started
                || matches!(
                    s.phase,
                    WorkspacePhase::Stopping | WorkspacePhase::Stopped | WorkspacePhase::Failed
                )
        }
    }
}

async fn client_event(attachment: &mut Option<Attachment>) -> Option<ClientEvent> {
    match attachment {
        Some(attachment) => attachment.client.next_event().await,
        None => std::future::pending().await,
    }
}

impl<C, T> Supervisor<C, T>
where
    C: ClusterAdapter,
    T: ThinClientAdapter,
{
    fn start_monitor(&self, join_link: &str, restart_tx: &mpsc::Sender<RestartReason>) -> Option<ConnectionMonitor> {
        self.config.monitor.map(|config| {
            ConnectionMonitor::start(
                Arc::clone(&self.probe),
                Some(join_link.to_string()),
                config,
                restart_tx.clone(),
                &self.token,
            )
        })
    }

    async fn run(self, attachment: Attachment, join_link: String, guard: ActiveGuard) {
        let (restart_tx, mut restart_rx) = mpsc::channel(4);
        let mut monitor = self.start_monitor(&join_link, &restart_tx);
        let (mut watcher, mut events) = WorkspaceWatcher::start(
            self.cluster.clone(),
            self.workspace.namespace.clone(),
            self.config.watcher,
            &self.token,
        );
        let mut current = Some(attachment);

        let reason = loop {
            let step = tokio::select! {
                biased;
                _ = self.token.cancelled() => Step::Close(CloseReason::Disconnected),
                event = client_event(&mut current) => match event {
                    Some(ClientEvent::PresenceChanged) => Step::Continue,
                    Some(ClientEvent::Closed | ClientEvent::FailedToOpen(_)) | None => {
                        Step::Close(CloseReason::ClientClosed)
                    }
                },
                Some(event) = events.recv() => {
                    if ends_session(&event, &self.workspace) {
                        tracing::info!(workspace = %self.workspace, phase = %event.snapshot().phase, "workspace stopped externally");
                        Step::Close(CloseReason::WorkspaceStopped)
                    } else {
                        Step::Continue
                    }
                }
                Some(restart) = restart_rx.recv() => Step::Restart(restart),
            };

            match step {
                Step::Continue => {}
                Step::Close(reason) => break reason,
                Step::Restart(restart) => {
                    self.observer.on_restart_detected(&self.workspace, &restart);
                    if let Some(mut m) = monitor.take() {
                        m.stop();
                    }
                    let old_client = match current.take() {
                        Some(old) => {
                            old.tunnel.shutdown().await;
                            Some(old.client)
                        }
                        None => None,
                    };
                    match self.recovery.recover_connection(old_client, &self.token).await {
                        Ok(recovered) => {
                            self.info_tx.send_modify(|info| {
                                info.local_port = recovered.local_port;
                                info.join_link = recovered.local_join_link.clone();
                                info.client_id = recovered.client.id.clone();
                                info.recoveries += 1;
                            });
                            self.observer.on_recovered(&self.info_tx.borrow());
                            monitor = self.start_monitor(&recovered.join_link, &restart_tx);
                            current = Some(Attachment {
                                tunnel: recovered.tunnel,
                                client: recovered.client,
                                local_join_link: recovered.local_join_link,
                            });
                        }
                        Err(RecoveryError::Cancelled) => break CloseReason::Disconnected,
                        Err(e) => {
                            let message = e.user_message();
                            tracing::warn!(workspace = %self.workspace, error = %message, "recovery failed");
                            break CloseReason::RecoveryFailed(message);
                        }
                    }
                }
            }
        };

        if let Some(mut m) = monitor.take() {
            m.stop();
        }
        watcher.stop();
        self.close(current, guard, reason).await;
    }

    /// Release client and tunnel, optionally stop the workspace, then
    /// report the session closed.
    async fn close(&self, attachment: Option<Attachment>, mut guard: ActiveGuard, reason: CloseReason) {
        let workspace = &self.workspace;
        tracing::info!(%workspace, %reason, "closing session");
        self.observer.on_state(workspace, ConnectionState::Closing);

        if let Some(attachment) = attachment {
            attachment.release().await;
        }
        self.token.cancel();

        if self.config.stop_workspace_on_close && reason != CloseReason::WorkspaceStopped {
            self.stop_workspace().await;
        }

        guard.release();
        self.observer.on_state(workspace, ConnectionState::Closed);
        self.observer.on_disconnected(workspace, &reason);
        tracing::info!(%workspace, "session closed");
        self.info_tx.send_modify(|info| info.closed = Some(reason));
    }

    /// Stop the workspace, but only once its server is confirmed gone so a
    /// server still serving another client is left alone.
    async fn stop_workspace(&self) {
        let workspace = &self.workspace;
        let terminated = self
            .probe
            .wait_server_terminated(self.config.server_terminated_timeout, &CancellationToken::new())
            .await;
        match terminated {
            Ok(true) => match self.lifecycle.stop(workspace).await {
                Ok(_) => tracing::info!(%workspace, "workspace stop requested"),
                Err(e) => tracing::warn!(%workspace, error = %e, "failed to stop workspace"),
            },
            Ok(false) => tracing::info!(%workspace, "server still running, leaving workspace up"),
            Err(e) => tracing::warn!(%workspace, error = %e, "could not confirm server exit"),
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
