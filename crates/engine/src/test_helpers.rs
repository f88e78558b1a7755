// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::monitor::{MonitorConfig, RestartReason};
use crate::orchestrator::{ConnectConfig, ConnectionObserver, ConnectionOrchestrator, ConnectionState};
use crate::probe::ProbeConfig;
use crate::recovery::RecoveryConfig;
use crate::session::{CloseReason, SessionInfo};
use crate::tunnel::ForwardRetry;
use crate::watcher::WatcherConfig;
use crate::ActiveWorkspaces;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use wsc_adapters::{FakeClientAdapter, FakeClusterAdapter, FakeExec};
use wsc_core::test_support::{ready_status_output, workspace_object, workspace_pod};
use wsc_core::{WorkspacePhase, WorkspaceRef};

pub(crate) const SERVER_LINK: &str = "tcp://127.0.0.1:5990#jt=first";

/// Everything an observer was told, in order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Observed {
    State(ConnectionState),
    Connected(u16),
    Restart(RestartReason),
    Recovered(u16),
    Disconnected(CloseReason),
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    seen: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Observed> {
        self.seen.lock().clone()
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        self.seen()
            .into_iter()
            .filter_map(|o| match o {
                Observed::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn disconnects(&self) -> Vec<CloseReason> {
        self.seen()
            .into_iter()
            .filter_map(|o| match o {
                Observed::Disconnected(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    fn push(&self, observed: Observed) {
        self.seen.lock().push(observed);
    }
}

impl ConnectionObserver for RecordingObserver {
    fn on_state(&self, _workspace: &WorkspaceRef, state: ConnectionState) {
        self.push(Observed::State(state));
    }

    fn on_connected(&self, info: &SessionInfo) {
        self.push(Observed::Connected(info.local_port));
    }

    fn on_restart_detected(&self, _workspace: &WorkspaceRef, reason: &RestartReason) {
        self.push(Observed::Restart(reason.clone()));
    }

    fn on_recovered(&self, info: &SessionInfo) {
        self.push(Observed::Recovered(info.local_port));
    }

    fn on_disconnected(&self, _workspace: &WorkspaceRef, reason: &CloseReason) {
        self.push(Observed::Disconnected(reason.clone()));
    }
}

pub(crate) fn ws1() -> WorkspaceRef {
    WorkspaceRef::new("ns1", "ws1")
}

/// Timeouts short enough for tests, monitoring off
pub(crate) fn fast_config() -> ConnectConfig {
    ConnectConfig {
        workspace_ready_timeout: Duration::from_secs(5),
        server_ready_timeout: Duration::from_secs(2),
        client_attach_timeout: Duration::from_secs(2),
        tunnel_ready_timeout: Duration::from_secs(2),
        stop_workspace_on_close: false,
        server_terminated_timeout: Duration::from_secs(2),
        monitor: None,
        recovery: RecoveryConfig {
            deadline: Duration::from_secs(10),
            max_attempts: 3,
            backoff_step: Duration::from_millis(10),
            server_ready_timeout: Duration::from_secs(2),
            client_attach_timeout: Duration::from_secs(2),
            tunnel_ready_timeout: Duration::from_secs(2),
        },
        probe: ProbeConfig {
            exec_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
        },
        forward_retry: ForwardRetry {
            attempts: 2,
            delay: Duration::from_millis(10),
        },
        watcher: WatcherConfig {
            reconnect_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
        },
    }
}

pub(crate) fn fast_monitor() -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_millis(10),
        check_timeout: Duration::from_millis(200),
        failure_threshold: 2,
    }
}

pub(crate) struct TestContext {
    pub cluster: FakeClusterAdapter,
    pub clients: FakeClientAdapter,
    pub orchestrator: ConnectionOrchestrator<FakeClusterAdapter, FakeClientAdapter>,
}

/// A cluster with `ns1/ws1` in `phase`, its pod, and a ready server
pub(crate) fn setup(started: bool, phase: WorkspacePhase, config: ConnectConfig) -> TestContext {
    let cluster = FakeClusterAdapter::new();
    cluster.add_workspace(workspace_object("ns1", "ws1", started, phase));
    cluster.add_pod(workspace_pod("ns1", "ws1", "ws1-pod"));
    cluster.set_exec_default(FakeExec::ok(ready_status_output(SERVER_LINK)));
    let clients = FakeClientAdapter::new();
    let orchestrator = ConnectionOrchestrator::new(
        cluster.clone(),
        clients.clone(),
        ActiveWorkspaces::new(),
        config,
    );
    TestContext {
        cluster,
        clients,
        orchestrator,
    }
}

pub(crate) fn running(config: ConnectConfig) -> TestContext {
    setup(true, WorkspacePhase::Running, config)
}
