// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.is_empty())
}

// --- State directory ---

/// Resolve state directory: WSC_STATE_DIR > XDG_STATE_HOME/wsc > ~/.local/state/wsc
pub fn state_dir() -> Option<PathBuf> {
    if let Some(dir) = non_empty("WSC_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("wsc"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/wsc"))
}

// --- Config file ---

/// Resolve config file: WSC_CONFIG > XDG_CONFIG_HOME/wsc/config.toml > ~/.config/wsc/config.toml
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = non_empty("WSC_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Some(xdg) = non_empty("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("wsc/config.toml"));
    }
    dirs::home_dir().map(|home| home.join(".config/wsc/config.toml"))
}

// --- Cluster credentials ---

pub fn server() -> Option<String> {
    non_empty("WSC_SERVER")
}

pub fn token() -> Option<String> {
    non_empty("WSC_TOKEN")
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
