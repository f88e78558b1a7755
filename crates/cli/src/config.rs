// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI configuration file
//!
//! Every section is optional and a missing file is the same as an empty one.
//!
//! ```toml
//! [cluster]
//! server = "https://api.example:6443"
//! token = "..."
//!
//! [client]
//! command = "thin-client"
//! args = ["--new-window"]
//!
//! [connect]
//! monitor = true
//! stop_workspace_on_close = false
//! workspace_ready_secs = 300
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use wsc_adapters::ClusterCredentials;
use wsc_engine::ConnectConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub cluster: ClusterSection,
    pub client: ClientSection,
    pub connect: ConnectSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterSection {
    pub server: Option<String>,
    pub token: Option<String>,
    pub insecure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    /// Thin client executable; the local join link is appended to `args`
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectSection {
    pub monitor: bool,
    pub stop_workspace_on_close: bool,
    pub workspace_ready_secs: Option<u64>,
    pub server_ready_secs: Option<u64>,
    pub client_attach_secs: Option<u64>,
    pub recovery_deadline_secs: Option<u64>,
}

impl Default for ConnectSection {
    fn default() -> Self {
        Self {
            monitor: true,
            stop_workspace_on_close: false,
            workspace_ready_secs: None,
            server_ready_secs: None,
            client_attach_secs: None,
            recovery_deadline_secs: None,
        }
    }
}

impl Config {
    /// Load from `path`, or defaults when no file exists there.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Explicit credentials, environment first. `None` means fall back to
    /// the ambient kubeconfig.
    pub fn credentials(&self) -> Option<ClusterCredentials> {
        let server = crate::env::server().or_else(|| self.cluster.server.clone())?;
        let token = crate::env::token().or_else(|| self.cluster.token.clone())?;
        Some(ClusterCredentials {
            server,
            token,
            insecure: self.cluster.insecure,
        })
    }

    pub fn connect_config(&self) -> ConnectConfig {
        let section = &self.connect;
        let mut config = ConnectConfig {
            stop_workspace_on_close: section.stop_workspace_on_close,
            ..ConnectConfig::default()
        };
        if !section.monitor {
            config.monitor = None;
        }
        if let Some(secs) = section.workspace_ready_secs {
            config.workspace_ready_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = section.server_ready_secs {
            config.server_ready_timeout = Duration::from_secs(secs);
            config.recovery.server_ready_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = section.client_attach_secs {
            config.client_attach_timeout = Duration::from_secs(secs);
            config.recovery.client_attach_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = section.recovery_deadline_secs {
            config.recovery.deadline = Duration::from_secs(secs);
        }
        config
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
