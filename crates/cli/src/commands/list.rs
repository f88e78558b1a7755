// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wsc list` - List workspaces of a namespace

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClusterAdapter, ResourceKind};
use wsc_core::WorkspaceSnapshot;
use wsc_engine::{WatcherConfig, WorkspaceEvent, WorkspaceWatcher};

use crate::output::{or_dash, yes_no, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct ListArgs {
    /// Namespace to list
    #[arg(short = 'n', long)]
    pub namespace: String,

    /// Keep running and print every change
    #[arg(long)]
    pub watch: bool,
}

pub async fn handle<C: ClusterAdapter>(
    args: ListArgs,
    cluster: C,
    format: OutputFormat,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<()> {
    if args.watch {
        return watch(cluster, &args.namespace, format, cancel, out).await;
    }

    let workspaces = list_workspaces(&cluster, &args.namespace).await?;
    match format {
        OutputFormat::Text => {
            if workspaces.is_empty() {
                writeln!(out, "No workspaces in {}", args.namespace)?;
            } else {
                render(&workspaces, Table::new(columns()), out);
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&workspaces)?)?;
        }
    }
    Ok(())
}

/// Workspaces of `namespace` sorted by name. Documents that don't decode
/// are skipped.
pub async fn list_workspaces<C: ClusterAdapter>(
    cluster: &C,
    namespace: &str,
) -> Result<Vec<WorkspaceSnapshot>> {
    let list = cluster
        .list_objects(&ResourceKind::DEV_WORKSPACE, namespace)
        .await?;
    let mut workspaces: Vec<WorkspaceSnapshot> = list
        .items
        .iter()
        .filter_map(|item| match WorkspaceSnapshot::from_object(item) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(namespace, error = %e, "skipping workspace");
                None
            }
        })
        .collect();
    workspaces.sort_by(|a, b| a.workspace.name.cmp(&b.workspace.name));
    Ok(workspaces)
}

fn columns() -> Vec<Column> {
    vec![
        Column::left("NAME"),
        Column::status("PHASE"),
        Column::status("STARTED"),
        Column::muted("EDITOR").with_max(48),
    ]
}

fn render(workspaces: &[WorkspaceSnapshot], mut table: Table, out: &mut impl Write) {
    for ws in workspaces {
        table.row(vec![
            ws.workspace.name.clone(),
            ws.phase.to_string(),
            yes_no(ws.started).to_string(),
            or_dash(&ws.editor).to_string(),
        ]);
    }
    table.render(out);
}

#[derive(Serialize)]
struct EventLine<'a> {
    event: &'static str,
    workspace: &'a WorkspaceSnapshot,
}

fn event_kind(event: &WorkspaceEvent) -> &'static str {
    match event {
        WorkspaceEvent::Added(_) => "added",
        WorkspaceEvent::Modified(_) => "modified",
        WorkspaceEvent::Removed(_) => "removed",
    }
}

/// One line per event: text columns, or a JSON object per line.
fn format_event(event: &WorkspaceEvent, format: OutputFormat) -> Result<String> {
    let ws = event.snapshot();
    let line = match format {
        OutputFormat::Text => format!(
            "{:<8}  {}  {}  started={}",
            event_kind(event).to_uppercase(),
            ws.workspace.name,
            ws.phase,
            yes_no(ws.started)
        ),
        OutputFormat::Json => serde_json::to_string(&EventLine {
            event: event_kind(event),
            workspace: ws,
        })?,
    };
    Ok(line)
}

async fn watch<C: ClusterAdapter>(
    cluster: C,
    namespace: &str,
    format: OutputFormat,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<()> {
    let (mut watcher, mut events) =
        WorkspaceWatcher::start(cluster, namespace, WatcherConfig::default(), cancel);
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else { break };
        writeln!(out, "{}", format_event(&event, format)?)?;
        out.flush()?;
    }
    watcher.stop();
    Ok(())
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
