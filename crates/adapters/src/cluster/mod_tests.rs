// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[yare::parameterized(
    unauthorized = { 401, ClusterError::Unauthorized("m".into()) },
    forbidden    = { 403, ClusterError::Forbidden("m".into()) },
    not_found    = { 404, ClusterError::NotFound("m".into()) },
    gone         = { 410, ClusterError::Gone("m".into()) },
    conflict     = { 409, ClusterError::Api { code: 409, message: "m".into() } },
)]
fn classifies_status_codes(code: u16, expected: ClusterError) {
    assert_eq!(ClusterError::from_status(code, "m"), expected);
}

fn process_with(exit: oneshot::Receiver<i32>) -> (ExecProcess, Arc<AtomicUsize>) {
    let kills = Arc::new(AtomicUsize::new(0));
    let counter = kills.clone();
    let process = ExecProcess::new(
        Box::new(std::io::Cursor::new(b"out".to_vec())),
        Box::new(std::io::Cursor::new(Vec::new())),
        exit,
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );
    (process, kills)
}

#[tokio::test]
async fn exec_process_reports_exit_code() {
    let (tx, rx) = oneshot::channel();
    let (mut process, _) = process_with(rx);

    assert_eq!(process.try_exit_code(), None);
    tx.send(3).unwrap();
    assert_eq!(process.try_exit_code(), Some(3));
    assert_eq!(process.wait().await, Some(3));

    let mut out = String::new();
    process
        .take_stdout()
        .unwrap()
        .read_to_string(&mut out)
        .await
        .unwrap();
    assert_eq!(out, "out");
    assert!(process.take_stdout().is_none());
}

#[tokio::test]
async fn exec_process_wait_without_status_is_none() {
    let (tx, rx) = oneshot::channel::<i32>();
    let (mut process, _) = process_with(rx);
    drop(tx);
    assert_eq!(process.wait().await, None);
}

#[test]
fn exec_process_kills_once_on_drop() {
    let (_tx, rx) = oneshot::channel();
    let (mut process, kills) = process_with(rx);
    process.kill();
    process.kill();
    drop(process);
    assert_eq!(kills.load(Ordering::SeqCst), 1);
}
