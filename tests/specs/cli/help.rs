//! CLI help output specs
//!
//! Verify help text displays for all commands.

use crate::prelude::*;

#[test]
fn wsc_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn wsc_help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("connect")
        .stdout_has("list")
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status");
}

#[test]
fn wsc_connect_help_shows_flags() {
    cli()
        .args(&["connect", "--help"])
        .passes()
        .stdout_has("--no-monitor")
        .stdout_has("--stop-on-close")
        .stdout_has("--client-command");
}

#[test]
fn wsc_list_help_shows_watch() {
    cli()
        .args(&["list", "--help"])
        .passes()
        .stdout_has("--namespace")
        .stdout_has("--watch");
}

#[test]
fn wsc_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
