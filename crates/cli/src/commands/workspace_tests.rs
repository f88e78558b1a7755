// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wsc_adapters::{ClusterCall, FakeClusterAdapter};
use wsc_core::test_support::workspace_object;

fn cluster_with(started: bool, phase: WorkspacePhase) -> FakeClusterAdapter {
    let cluster = FakeClusterAdapter::new();
    cluster.add_workspace(workspace_object("ns1", "ws1", started, phase));
    cluster
}

fn args(wait: bool, timeout: u64) -> LifecycleArgs {
    LifecycleArgs {
        workspace: WorkspaceRef::new("ns1", "ws1"),
        wait,
        timeout,
    }
}

async fn run(action: Action, args: LifecycleArgs, cluster: &FakeClusterAdapter) -> (Result<()>, String) {
    let mut out = Vec::new();
    let result = handle(action, args, cluster.clone(), &CancellationToken::new(), &mut out).await;
    (result, String::from_utf8(out).unwrap())
}

fn patch_count(cluster: &FakeClusterAdapter) -> usize {
    cluster
        .calls()
        .iter()
        .filter(|c| matches!(c, ClusterCall::PatchObject { .. }))
        .count()
}

#[tokio::test]
async fn start_patches_a_stopped_workspace() {
    let cluster = cluster_with(false, WorkspacePhase::Stopped);

    let (result, out) = run(Action::Start, args(false, 300), &cluster).await;

    result.unwrap();
    assert_eq!(out, "Workspace ns1/ws1 started\n");
    assert_eq!(patch_count(&cluster), 1);
}

#[tokio::test]
async fn start_of_started_workspace_is_a_no_op() {
    let cluster = cluster_with(true, WorkspacePhase::Running);

    let (result, out) = run(Action::Start, args(false, 300), &cluster).await;

    result.unwrap();
    assert_eq!(out, "Workspace ns1/ws1 already started\n");
    assert_eq!(patch_count(&cluster), 0);
}

#[tokio::test]
async fn start_wait_follows_the_workspace_to_running() {
    let cluster = cluster_with(false, WorkspacePhase::Stopped);
    cluster.enable_transitions(Duration::from_millis(20));

    let (result, out) = run(Action::Start, args(true, 5), &cluster).await;

    result.unwrap();
    assert!(out.ends_with("Workspace ns1/ws1 is Running\n"), "{out}");
}

#[tokio::test]
async fn stop_wait_follows_the_workspace_to_stopped() {
    let cluster = cluster_with(true, WorkspacePhase::Running);
    cluster.enable_transitions(Duration::from_millis(20));

    let (result, out) = run(Action::Stop, args(true, 5), &cluster).await;

    result.unwrap();
    assert!(out.starts_with("Workspace ns1/ws1 stopped\n"), "{out}");
    assert!(out.ends_with("Workspace ns1/ws1 is Stopped\n"), "{out}");
}

#[tokio::test]
async fn start_wait_fails_when_workspace_fails() {
    let cluster = cluster_with(true, WorkspacePhase::Failed);

    let (result, _) = run(Action::Start, args(true, 5), &cluster).await;

    assert_eq!(result.unwrap_err().to_string(), "workspace ns1/ws1 is Failed");
}

#[tokio::test(start_paused = true)]
async fn start_wait_times_out() {
    let cluster = cluster_with(true, WorkspacePhase::Starting);

    let (result, _) = run(Action::Start, args(true, 2), &cluster).await;

    assert_eq!(
        result.unwrap_err().to_string(),
        "timed out after 2s waiting for ns1/ws1 to be Running"
    );
}

#[tokio::test]
async fn missing_workspace_is_an_error() {
    let cluster = FakeClusterAdapter::new();

    let (result, out) = run(Action::Stop, args(false, 300), &cluster).await;

    assert!(result.is_err());
    assert_eq!(out, "");
}
