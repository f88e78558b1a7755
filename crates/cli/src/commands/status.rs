// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wsc status` - One-shot workspace and IDE server status

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use wsc_adapters::ClusterAdapter;
use wsc_core::{RemoteServerStatus, WorkspaceRef, WorkspaceSnapshot};
use wsc_engine::{ProbeConfig, RemoteServerStatusProbe, WorkspaceLifecycle};

use crate::color;
use crate::output::{or_dash, yes_no, OutputFormat};

#[derive(Args)]
pub struct StatusArgs {
    /// Workspace as <namespace>/<name>
    pub workspace: WorkspaceRef,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub snapshot: WorkspaceSnapshot,
    /// `None` when the workspace is not running or the probe failed
    pub server: Option<RemoteServerStatus>,
    pub server_error: Option<String>,
}

impl StatusReport {
    fn server_state(&self) -> &'static str {
        match (&self.server, &self.server_error) {
            (Some(status), _) if status.is_ready() => "ready",
            (Some(_), _) => "starting",
            (None, Some(_)) => "error",
            (None, None) => "not running",
        }
    }
}

pub async fn collect<C: ClusterAdapter>(
    workspace: &WorkspaceRef,
    cluster: C,
    probe_config: ProbeConfig,
    cancel: &CancellationToken,
) -> Result<StatusReport> {
    let snapshot = WorkspaceLifecycle::new(cluster.clone())
        .snapshot(workspace)
        .await?;
    if !snapshot.is_running() {
        return Ok(StatusReport {
            snapshot,
            server: None,
            server_error: None,
        });
    }

    let probe = RemoteServerStatusProbe::new(cluster, workspace.clone(), probe_config);
    let (server, server_error) = match probe.get_status(cancel).await {
        Ok(status) => (Some(status), None),
        Err(e) => {
            tracing::warn!(%workspace, error = %e, "status probe failed");
            (None, Some(e.to_string()))
        }
    };
    Ok(StatusReport {
        snapshot,
        server,
        server_error,
    })
}

pub async fn handle<C: ClusterAdapter>(
    args: StatusArgs,
    cluster: C,
    format: OutputFormat,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<()> {
    let report = collect(&args.workspace, cluster, ProbeConfig::default(), cancel).await?;
    match format {
        OutputFormat::Text => render(&report, out)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
    }
    Ok(())
}

fn render(report: &StatusReport, out: &mut impl Write) -> Result<()> {
    let snapshot = &report.snapshot;
    writeln!(out, "{} {}", color::header("Workspace:"), snapshot.workspace)?;
    writeln!(out, "{} {}", color::header("Phase:    "), color::status(&snapshot.phase.to_string()))?;
    writeln!(out, "{} {}", color::header("Started:  "), yes_no(snapshot.started))?;
    writeln!(out, "{} {}", color::header("Editor:   "), or_dash(&snapshot.editor))?;

    let state = report.server_state();
    match &report.server_error {
        Some(error) => writeln!(out, "{} {}: {}", color::header("Server:   "), color::status(state), error)?,
        None => writeln!(out, "{} {}", color::header("Server:   "), color::status(state))?,
    }
    let Some(server) = &report.server else {
        return Ok(());
    };
    writeln!(out, "{} {}", color::header("Join link:"), or_dash(server.join_link().unwrap_or_default()))?;
    if !server.app_version.is_empty() {
        writeln!(
            out,
            "{} {} {}",
            color::header("Version:  "),
            server.app_version,
            color::muted(&format!("(runtime {})", or_dash(&server.runtime_version)))
        )?;
    }
    for project in &server.projects {
        writeln!(
            out,
            "{} {} {}",
            color::header("Project:  "),
            project.project_name.as_deref().unwrap_or("-"),
            color::muted(project.project_path.as_deref().unwrap_or_default())
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
