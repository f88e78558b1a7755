// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use wsc_adapters::{ClusterCall, FakeClusterAdapter};
use wsc_core::test_support::workspace_object;
use wsc_core::WorkspacePhase;

fn fast() -> WatcherConfig {
    WatcherConfig {
        reconnect_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(40),
    }
}

async fn next(rx: &mut mpsc::Receiver<WorkspaceEvent>) -> WorkspaceEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| panic!("no workspace event"))
}

async fn until_watching(cluster: &FakeClusterAdapter) {
    for _ in 0..500 {
        if cluster.watch_count() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("watch never opened");
}

#[tokio::test]
async fn lists_existing_workspaces_as_added() {
    let cluster = FakeClusterAdapter::new();
    cluster.add_workspace(workspace_object("ns1", "a", true, WorkspacePhase::Running));
    cluster.add_workspace(workspace_object("ns1", "b", false, WorkspacePhase::Stopped));
    cluster.add_workspace(workspace_object("other", "c", false, WorkspacePhase::Stopped));

    let (_watcher, mut rx) = WorkspaceWatcher::start(cluster, "ns1", fast(), &CancellationToken::new());

    let mut names = vec![
        next(&mut rx).await.snapshot().workspace.name.clone(),
        next(&mut rx).await.snapshot().workspace.name.clone(),
    ];
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn delivers_modifications_and_removals() {
    let cluster = FakeClusterAdapter::new();
    cluster.add_workspace(workspace_object("ns1", "ws1", true, WorkspacePhase::Running));
    let (_watcher, mut rx) =
        WorkspaceWatcher::start(cluster.clone(), "ns1", fast(), &CancellationToken::new());
    assert!(matches!(next(&mut rx).await, WorkspaceEvent::Added(_)));
    until_watching(&cluster).await;

    cluster.set_phase("ns1", "ws1", WorkspacePhase::Stopping);
    cluster.remove_object(&ResourceKind::DEV_WORKSPACE, "ns1", "ws1");

    match next(&mut rx).await {
        WorkspaceEvent::Modified(s) => assert_eq!(s.phase, WorkspacePhase::Stopping),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(next(&mut rx).await, WorkspaceEvent::Removed(_)));
}

#[tokio::test]
async fn undecodable_objects_are_skipped() {
    let cluster = FakeClusterAdapter::new();
    let (_watcher, mut rx) =
        WorkspaceWatcher::start(cluster.clone(), "ns1", fast(), &CancellationToken::new());
    until_watching(&cluster).await;

    cluster.add_object(
        &ResourceKind::DEV_WORKSPACE,
        json!({ "metadata": { "namespace": "ns1" } }),
    );
    cluster.add_workspace(workspace_object("ns1", "ws1", false, WorkspacePhase::Stopped));

    assert_eq!(next(&mut rx).await.snapshot().workspace.name, "ws1");
}

#[tokio::test]
async fn reconnects_from_last_version_after_break() {
    let cluster = FakeClusterAdapter::new();
    cluster.add_workspace(workspace_object("ns1", "ws1", true, WorkspacePhase::Running));
    let (_watcher, mut rx) =
        WorkspaceWatcher::start(cluster.clone(), "ns1", fast(), &CancellationToken::new());
    next(&mut rx).await;
    until_watching(&cluster).await;
    cluster.set_phase("ns1", "ws1", WorkspacePhase::Stopping);
    let seen = next(&mut rx).await.snapshot().resource_version.clone();

    cluster.break_watches();
    until_watching(&cluster).await;
    cluster.set_phase("ns1", "ws1", WorkspacePhase::Stopped);

    assert_eq!(next(&mut rx).await.snapshot().phase, WorkspacePhase::Stopped);
    let versions: Vec<_> = cluster
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            ClusterCall::WatchObjects {
                resource_version, ..
            } => Some(resource_version),
            _ => None,
        })
        .collect();
    assert_eq!(versions.last().cloned(), seen);
}

#[tokio::test]
async fn relists_when_watch_expires() {
    let cluster = FakeClusterAdapter::new();
    cluster.add_workspace(workspace_object("ns1", "ws1", true, WorkspacePhase::Running));
    let (_watcher, mut rx) =
        WorkspaceWatcher::start(cluster.clone(), "ns1", fast(), &CancellationToken::new());
    next(&mut rx).await;
    until_watching(&cluster).await;

    cluster.fail_watches(ClusterError::Gone("too old".to_string()));

    // The relist reports the workspace again
    assert!(matches!(next(&mut rx).await, WorkspaceEvent::Added(_)));
    let lists = cluster
        .calls()
        .iter()
        .filter(|c| matches!(c, ClusterCall::ListObjects { .. }))
        .count();
    assert_eq!(lists, 2);
}

#[tokio::test]
async fn stop_is_idempotent_and_closes_channel() {
    let cluster = FakeClusterAdapter::new();
    let (mut watcher, mut rx) =
        WorkspaceWatcher::start(cluster, "ns1", fast(), &CancellationToken::new());

    watcher.stop();
    watcher.stop();

    assert!(watcher.is_stopped());
    let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn parent_cancel_stops_watcher() {
    let cluster = FakeClusterAdapter::new();
    let parent = CancellationToken::new();
    let (watcher, mut rx) = WorkspaceWatcher::start(cluster, "ns1", fast(), &parent);

    parent.cancel();

    assert!(watcher.is_stopped());
    let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert!(closed.is_none());
}
