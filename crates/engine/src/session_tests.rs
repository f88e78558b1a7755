// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn info() -> SessionInfo {
    SessionInfo {
        session_id: SessionId::new("s1"),
        workspace: WorkspaceRef::new("ns1", "ws1"),
        local_port: 40001,
        join_link: "tcp://127.0.0.1:40001#jt=1".to_string(),
        client_id: ClientId::new("c1"),
        recoveries: 0,
        closed: None,
    }
}

#[tokio::test]
async fn closed_resolves_with_reported_reason() {
    let (tx, rx) = watch::channel(info());
    let session = Session::new(rx, CancellationToken::new());
    assert!(!session.is_closed());

    tx.send_modify(|i| i.closed = Some(CloseReason::WorkspaceStopped));

    assert_eq!(session.closed().await, CloseReason::WorkspaceStopped);
    assert!(session.is_closed());
}

#[tokio::test]
async fn closed_resolves_when_supervisor_is_gone() {
    let (tx, rx) = watch::channel(info());
    let session = Session::new(rx, CancellationToken::new());

    drop(tx);

    assert_eq!(session.closed().await, CloseReason::Disconnected);
}

#[test]
fn disconnect_cancels_session_token() {
    let (_tx, rx) = watch::channel(info());
    let cancel = CancellationToken::new();
    let session = Session::new(rx, cancel.clone());

    session.disconnect();
    session.disconnect();

    assert!(cancel.is_cancelled());
}

#[test]
fn accessors_follow_updates() {
    let (tx, rx) = watch::channel(info());
    let session = Session::new(rx, CancellationToken::new());

    tx.send_modify(|i| {
        i.local_port = 40002;
        i.join_link = "tcp://127.0.0.1:40002#jt=2".to_string();
    });

    assert_eq!(session.id, SessionId::new("s1"));
    assert_eq!(session.local_port(), 40002);
    assert!(session.join_link().contains("40002"));
}

#[yare::parameterized(
    client      = { CloseReason::ClientClosed, "client closed" },
    stopped     = { CloseReason::WorkspaceStopped, "workspace stopped" },
    recovery    = { CloseReason::RecoveryFailed("gave up".to_string()), "recovery failed: gave up" },
)]
fn close_reason_display(reason: CloseReason, expected: &str) {
    assert_eq!(reason.to_string(), expected);
}

#[test]
fn info_serializes_for_machine_output() {
    let mut info = info();
    info.closed = Some(CloseReason::RecoveryFailed("gave up".to_string()));

    let json = serde_json::to_value(&info).unwrap();

    assert_eq!(json["local_port"], 40001);
    assert_eq!(json["workspace"]["name"], "ws1");
    assert_eq!(
        json["closed"],
        serde_json::json!({ "kind": "recovery_failed", "detail": "gave up" })
    );
}
