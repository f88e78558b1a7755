// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::probe::ProbeConfig;
use proptest::prelude::*;
use wsc_adapters::{ClusterError, FakeClusterAdapter, FakeExec};
use wsc_core::test_support::{ready_status_output, starting_status_output, workspace_pod};
use wsc_core::WorkspaceRef;

const LINK_A: &str = "tcp://127.0.0.1:5990#jt=a";
const LINK_B: &str = "tcp://127.0.0.1:5990#jt=b";

// ── Detector ────────────────────────────────────────────────────────────────

#[test]
fn link_change_fires_once_at_transition() {
    let mut detector = RestartDetector::new(Some(LINK_A), 2);

    let fired: Vec<_> = [LINK_A, LINK_A, LINK_B]
        .into_iter()
        .map(|link| detector.observe_link(Some(link)))
        .collect();

    assert_eq!(
        fired,
        vec![
            None,
            None,
            Some(RestartReason::JoinLinkChanged {
                previous: LINK_A.to_string(),
                current: LINK_B.to_string(),
            })
        ]
    );
    assert_eq!(detector.observe_link(Some(LINK_B)), None);
}

#[test]
fn consecutive_failures_fire_once_and_reset() {
    let mut detector = RestartDetector::new(Some(LINK_A), 2);

    assert_eq!(detector.observe_failure(), None);
    assert_eq!(
        detector.observe_failure(),
        Some(RestartReason::ProbeFailures { failures: 2 })
    );
    assert_eq!(detector.failures(), 0);
    assert_eq!(detector.observe_failure(), None);
}

#[test]
fn success_resets_failure_count() {
    let mut detector = RestartDetector::new(Some(LINK_A), 2);

    detector.observe_failure();
    detector.observe_link(Some(LINK_A));

    assert_eq!(detector.observe_failure(), None);
}

#[test]
fn link_change_also_resets_failures() {
    let mut detector = RestartDetector::new(Some(LINK_A), 2);

    detector.observe_failure();
    assert!(detector.observe_link(Some(LINK_B)).is_some());

    assert_eq!(detector.failures(), 0);
}

#[yare::parameterized(
    blank_current  = { Some(LINK_A), None },
    empty_current  = { Some(LINK_A), Some("  ") },
    blank_initial  = { None, Some(LINK_B) },
)]
fn blank_links_never_fire(initial: Option<&str>, current: Option<&str>) {
    let mut detector = RestartDetector::new(initial, 2);

    assert_eq!(detector.observe_link(current), None);
}

#[test]
fn blank_link_keeps_previous_for_comparison() {
    let mut detector = RestartDetector::new(Some(LINK_A), 2);

    detector.observe_link(None);

    assert!(matches!(
        detector.observe_link(Some(LINK_B)),
        Some(RestartReason::JoinLinkChanged { .. })
    ));
}

proptest! {
    #[test]
    fn restarts_match_distinct_link_transitions(links in proptest::collection::vec(0u8..3, 1..40)) {
        let links: Vec<String> = links.iter().map(|l| format!("tcp://h:5990#jt={l}")).collect();
        let mut detector = RestartDetector::new(Some(links[0].as_str()), 2);
        let fired = links[1..]
            .iter()
            .filter(|l| detector.observe_link(Some(l.as_str())).is_some())
            .count();
        let transitions = links.windows(2).filter(|w| w[0] != w[1]).count();
        prop_assert_eq!(fired, transitions);
    }
}

// ── Background loop ─────────────────────────────────────────────────────────

fn fast() -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_millis(10),
        check_timeout: Duration::from_millis(100),
        failure_threshold: 2,
    }
}

fn probe(cluster: &FakeClusterAdapter) -> Arc<RemoteServerStatusProbe<FakeClusterAdapter>> {
    cluster.add_pod(workspace_pod("ns1", "ws1", "ws1-pod"));
    Arc::new(RemoteServerStatusProbe::new(
        cluster.clone(),
        WorkspaceRef::new("ns1", "ws1"),
        ProbeConfig::default(),
    ))
}

async fn next(rx: &mut mpsc::Receiver<RestartReason>) -> RestartReason {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| panic!("no restart reported"))
}

#[tokio::test]
async fn monitor_reports_new_join_link() {
    let cluster = FakeClusterAdapter::new();
    cluster.push_exec(FakeExec::ok(ready_status_output(LINK_A)));
    cluster.push_exec(FakeExec::ok(ready_status_output(LINK_A)));
    cluster.set_exec_default(FakeExec::ok(ready_status_output(LINK_B)));
    let (tx, mut rx) = mpsc::channel(4);

    let _monitor = ConnectionMonitor::start(
        probe(&cluster),
        Some(LINK_A.to_string()),
        fast(),
        tx,
        &CancellationToken::new(),
    );

    assert_eq!(
        next(&mut rx).await,
        RestartReason::JoinLinkChanged {
            previous: LINK_A.to_string(),
            current: LINK_B.to_string(),
        }
    );
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn monitor_reports_repeated_probe_failures() {
    let cluster = FakeClusterAdapter::new();
    cluster.set_exec_default(FakeExec::Error(ClusterError::Transport("gone".to_string())));
    let (tx, mut rx) = mpsc::channel(4);

    let _monitor = ConnectionMonitor::start(
        probe(&cluster),
        Some(LINK_A.to_string()),
        fast(),
        tx,
        &CancellationToken::new(),
    );

    assert_eq!(next(&mut rx).await, RestartReason::ProbeFailures { failures: 2 });
}

#[tokio::test]
async fn hung_checks_count_as_failures() {
    let cluster = FakeClusterAdapter::new();
    cluster.set_exec_default(FakeExec::Hang);
    let (tx, mut rx) = mpsc::channel(4);

    let _monitor = ConnectionMonitor::start(
        probe(&cluster),
        Some(LINK_A.to_string()),
        fast(),
        tx,
        &CancellationToken::new(),
    );

    assert_eq!(next(&mut rx).await, RestartReason::ProbeFailures { failures: 2 });
    assert!(cluster.killed_hung_execs() >= 2);
}

#[tokio::test]
async fn server_without_link_is_not_a_restart() {
    let cluster = FakeClusterAdapter::new();
    cluster.set_exec_default(FakeExec::ok(starting_status_output()));
    let (tx, mut rx) = mpsc::channel(4);

    let _monitor = ConnectionMonitor::start(
        probe(&cluster),
        Some(LINK_A.to_string()),
        fast(),
        tx,
        &CancellationToken::new(),
    );

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(rx.try_recv().is_err());
    assert!(cluster.exec_calls() >= 2);
}

#[tokio::test]
async fn stop_is_idempotent_and_halts_checks() {
    let cluster = FakeClusterAdapter::new();
    let (tx, _rx) = mpsc::channel(4);
    let mut monitor = ConnectionMonitor::start(
        probe(&cluster),
        Some(LINK_A.to_string()),
        fast(),
        tx,
        &CancellationToken::new(),
    );

    monitor.stop();
    monitor.stop();
    let calls = cluster.exec_calls();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(monitor.is_stopped());
    assert_eq!(cluster.exec_calls(), calls);
}

#[test]
fn restart_reasons_read_as_sentences() {
    let changed = RestartReason::JoinLinkChanged {
        previous: LINK_A.to_string(),
        current: "tcp://other".to_string(),
    };

    assert_eq!(changed.to_string(), "join link changed");
    assert_eq!(
        RestartReason::ProbeFailures { failures: 2 }.to_string(),
        "2 consecutive status checks failed"
    );
}
