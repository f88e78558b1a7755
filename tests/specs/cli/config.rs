//! Config file and log file specs

use crate::prelude::*;

#[test]
fn invalid_config_is_reported_with_its_path() {
    let sandbox = Sandbox::new();
    sandbox.config("[connect]\nmonitor = \"often\"\n");

    sandbox
        .wsc()
        .args(&["status", "ns1/ws1"])
        .fails()
        .code(1)
        .stderr_has("Error: invalid config")
        .stderr_has("config.toml")
        .one_error_line();
}

#[test]
fn unknown_config_key_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.config("[cluster]\nendpoint = \"https://api\"\n");

    sandbox
        .wsc()
        .args(&["list", "-n", "ns1"])
        .fails()
        .stderr_has("unknown field");
}

#[test]
fn failures_are_logged_to_the_state_dir() {
    let sandbox = Sandbox::new();
    sandbox.config("[connect]\nmonitor = \"often\"\n");

    sandbox.wsc().args(&["status", "ns1/ws1"]).fails();

    let log = sandbox.log();
    assert!(log.contains("command failed"), "log: {log}");
}
