//! CLI error handling specs
//!
//! Verify argument errors and failures reported before any cluster work.

use crate::prelude::*;

#[test]
fn malformed_workspace_reference_is_rejected() {
    cli()
        .args(&["status", "just-a-name"])
        .fails()
        .code(2)
        .stderr_has("expected <namespace>/<name>");
}

#[test]
fn list_without_namespace_is_rejected() {
    cli()
        .args(&["list"])
        .fails()
        .code(2)
        .stderr_has("--namespace");
}

#[test]
fn unknown_command_is_rejected() {
    cli().args(&["attach", "ns1/ws1"]).fails().code(2);
}

#[test]
fn unreachable_cluster_fails_with_one_error_line() {
    let sandbox = Sandbox::new();

    sandbox
        .wsc()
        .env("WSC_SERVER", UNREACHABLE_SERVER)
        .env("WSC_TOKEN", "token")
        .args(&["status", "ns1/ws1"])
        .fails()
        .code(1)
        .one_error_line();
}
