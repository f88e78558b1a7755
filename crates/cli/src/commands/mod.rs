// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod connect;
pub mod list;
pub mod status;
pub mod workspace;

use crate::config::Config;
use anyhow::{Context, Result};
use wsc_adapters::{KubeClusterAdapter, TracedCluster};

/// Cluster adapter for commands: explicit credentials when configured,
/// otherwise the ambient kubeconfig.
pub async fn cluster(config: &Config) -> Result<TracedCluster<KubeClusterAdapter>> {
    let adapter = match config.credentials() {
        Some(credentials) => {
            tracing::debug!(server = %credentials.server, "using configured credentials");
            KubeClusterAdapter::from_credentials(&credentials).await
        }
        None => KubeClusterAdapter::infer().await,
    }
    .context("cannot reach cluster")?;
    Ok(TracedCluster::new(adapter))
}
