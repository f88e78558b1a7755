// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::probe::ProbeConfig;
use wsc_adapters::{ClientBehavior, ClientError, FakeClientAdapter, FakeClusterAdapter, FakeExec};
use wsc_core::test_support::{ready_status_output, starting_status_output, workspace_pod};
use wsc_core::WorkspaceRef;

const NEW_LINK: &str = "tcp://127.0.0.1:5990#jt=new";

fn fast() -> RecoveryConfig {
    RecoveryConfig {
        deadline: Duration::from_secs(10),
        max_attempts: 3,
        backoff_step: Duration::from_millis(10),
        server_ready_timeout: Duration::from_secs(2),
        client_attach_timeout: Duration::from_secs(2),
        tunnel_ready_timeout: Duration::from_secs(2),
    }
}

struct Harness {
    cluster: FakeClusterAdapter,
    clients: FakeClientAdapter,
    recovery: ConnectionRecovery<FakeClusterAdapter, FakeClientAdapter>,
}

fn harness(config: RecoveryConfig) -> Harness {
    let cluster = FakeClusterAdapter::new();
    cluster.add_pod(workspace_pod("ns1", "ws1", "ws1-pod"));
    cluster.set_exec_default(FakeExec::ok(ready_status_output(NEW_LINK)));
    let clients = FakeClientAdapter::new();
    let probe = Arc::new(RemoteServerStatusProbe::new(
        cluster.clone(),
        WorkspaceRef::new("ns1", "ws1"),
        ProbeConfig {
            exec_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        },
    ));
    let recovery = ConnectionRecovery::new(
        probe,
        TunnelForwarder::new(cluster.clone()),
        clients.clone(),
        config,
    );
    Harness {
        cluster,
        clients,
        recovery,
    }
}

async fn old_client(clients: &FakeClientAdapter, lifetime: &CancellationToken) -> ClientHandle {
    clients.start("tcp://127.0.0.1:1#jt=old", "ns1/ws1", lifetime).await.unwrap()
}

#[tokio::test]
async fn rebuilds_tunnel_and_client_under_same_lifetime() {
    let h = harness(fast());
    let lifetime = CancellationToken::new();
    let old = old_client(&h.clients, &lifetime).await;
    let old_id = old.id.clone();

    let recovered = h.recovery.recover_connection(Some(old), &lifetime).await.unwrap();

    assert_eq!(recovered.attempts, 1);
    assert_eq!(recovered.join_link, NEW_LINK);
    assert_eq!(
        recovered.local_join_link,
        format!("tcp://127.0.0.1:{}#jt=new", recovered.local_port)
    );
    assert!(h.clients.is_terminated(&old_id));
    assert!(!lifetime.is_cancelled());
    let start = h.clients.last_start().unwrap();
    assert_eq!(start.id, recovered.client.id);
    assert_eq!(start.uri, recovered.local_join_link);
    assert!(!recovered.tunnel.is_closed());
}

#[tokio::test]
async fn new_connection_dies_with_lifetime() {
    let h = harness(fast());
    let lifetime = CancellationToken::new();

    let recovered = h.recovery.recover_connection(None, &lifetime).await.unwrap();
    lifetime.cancel();

    assert!(recovered.client.is_terminated());
    assert!(recovered.tunnel.is_closed());
}

#[tokio::test]
async fn retries_after_failed_attempt() {
    let h = harness(fast());
    h.clients.push_behavior(ClientBehavior::FailToOpen(1));

    let recovered = h
        .recovery
        .recover_connection(None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(recovered.attempts, 2);
    assert_eq!(h.clients.starts().len(), 2);
}

#[tokio::test]
async fn waits_for_restarted_server() {
    let h = harness(fast());
    h.cluster.push_exec(FakeExec::ok(starting_status_output()));
    h.cluster.push_exec(FakeExec::ok(starting_status_output()));

    let recovered = h
        .recovery
        .recover_connection(None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(recovered.attempts, 1);
    assert_eq!(h.cluster.exec_calls(), 3);
}

#[tokio::test]
async fn exhaustion_reports_last_cause() {
    let h = harness(fast());
    h.clients.set_default_behavior(ClientBehavior::LaunchError);

    let err = h
        .recovery
        .recover_connection(None, &CancellationToken::new())
        .await
        .err()
        .unwrap();

    match err {
        RecoveryError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ConnectError::Client(ClientError::LaunchFailed(_))));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn overall_deadline_bounds_recovery() {
    let h = harness(RecoveryConfig {
        deadline: Duration::from_millis(100),
        ..fast()
    });
    h.cluster.set_exec_default(FakeExec::ok(starting_status_output()));

    let err = h
        .recovery
        .recover_connection(None, &CancellationToken::new())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, RecoveryError::TimedOut { .. }));
}

#[tokio::test]
async fn cancelled_lifetime_stops_recovery() {
    let h = harness(fast());
    h.cluster.set_exec_default(FakeExec::ok(starting_status_output()));
    let lifetime = CancellationToken::new();
    let trigger = lifetime.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let err = h.recovery.recover_connection(None, &lifetime).await.err().unwrap();

    assert!(matches!(err, RecoveryError::Cancelled));
}
