// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::exec::ExecError;
use crate::resolver::ResolveError;
use wsc_adapters::ClusterError;

fn ws() -> WorkspaceRef {
    WorkspaceRef::new("ns1", "ws1")
}

#[test]
fn user_message_appends_root_cause() {
    let err = ConnectError::ServerNotReady {
        workspace: ws(),
        source: ProbeError::Exec(ExecError::Cluster(ClusterError::Transport(
            "connection reset".to_string(),
        ))),
    };

    assert_eq!(
        err.user_message(),
        "IDE server in ns1/ws1 is not ready: cluster connection failed: connection reset"
    );
}

#[test]
fn user_message_skips_cause_already_in_message() {
    let err = ConnectError::ClientNotReady(ClientFailure::FailedToOpen(3));

    assert_eq!(err.user_message(), "thin client not ready: client exited with code 3");
}

#[test]
fn not_running_mentions_last_phase() {
    let err = ConnectError::WorkspaceNotRunning {
        workspace: ws(),
        phase: Some(WorkspacePhase::Failed),
    };

    assert_eq!(err.to_string(), "workspace ns1/ws1 did not reach Running (phase Failed)");
}

#[yare::parameterized(
    workspace_wait = { ConnectError::WorkspaceNotRunning { workspace: ws(), phase: None }, true },
    server_wait    = { ConnectError::ServerNotReady { workspace: ws(), source: ProbeError::NotReady { timeout: Duration::from_secs(60), last_error: None } }, true },
    client_wait    = { ConnectError::ClientNotReady(ClientFailure::Timeout(Duration::from_secs(60))), true },
    tunnel_wait    = { ConnectError::Tunnel(TunnelError::ReadyTimeout { port: 1 }), true },
    client_exit    = { ConnectError::ClientNotReady(ClientFailure::FailedToOpen(1)), false },
    resolution     = { ConnectError::Resolution { workspace: ws(), source: ResolveError::ServerContainerMissing { pod: "p".to_string() } }, false },
    duplicate      = { ConnectError::AlreadyConnected(ws()), false },
    cancelled      = { ConnectError::Cancelled, false },
)]
fn timeout_classification(err: ConnectError, expected: bool) {
    assert_eq!(err.is_timeout(), expected);
}

#[test]
fn cancelled_probe_and_lifecycle_map_to_cancelled() {
    assert!(ConnectError::server(&ws(), ProbeError::Cancelled).is_cancelled());
    assert!(ConnectError::lifecycle(&ws(), LifecycleError::Cancelled).is_cancelled());
    assert!(!ConnectError::lifecycle(
        &ws(),
        LifecycleError::Cluster(ClusterError::Forbidden("x".to_string()))
    )
    .is_cancelled());
}

#[test]
fn resolution_failures_are_not_server_timeouts() {
    let missing = ConnectError::server(
        &ws(),
        ProbeError::Resolve(ResolveError::ServerContainerMissing { pod: "ws1-pod".to_string() }),
    );
    let ambiguous = ConnectError::server(
        &ws(),
        ProbeError::Resolve(ResolveError::NotRunning { workspace: ws(), pods: 2 }),
    );
    let transient = ConnectError::server(
        &ws(),
        ProbeError::Resolve(ResolveError::Cluster(ClusterError::Transport("reset".to_string()))),
    );

    assert!(matches!(missing, ConnectError::Resolution { .. }));
    assert!(matches!(ambiguous, ConnectError::Resolution { .. }));
    assert!(matches!(transient, ConnectError::ServerNotReady { .. }));
    assert_eq!(
        missing.user_message(),
        "cannot locate the IDE server of ns1/ws1: no container in pod ws1-pod exposes port 'idea-server'"
    );
}
