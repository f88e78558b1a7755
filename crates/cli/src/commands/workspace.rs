// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wsc start` / `wsc stop` - Workspace lifecycle commands

use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use wsc_adapters::ClusterAdapter;
use wsc_core::{WorkspacePhase, WorkspaceRef};
use wsc_engine::WorkspaceLifecycle;

#[derive(Args)]
pub struct LifecycleArgs {
    /// Workspace as <namespace>/<name>
    pub workspace: WorkspaceRef,

    /// Wait until the workspace reaches the requested phase
    #[arg(long)]
    pub wait: bool,

    /// Seconds to wait with --wait
    #[arg(long, default_value_t = 300, requires = "wait")]
    pub timeout: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
}

impl Action {
    fn target_phase(self) -> WorkspacePhase {
        match self {
            Action::Start => WorkspacePhase::Running,
            Action::Stop => WorkspacePhase::Stopped,
        }
    }
}

pub async fn handle<C: ClusterAdapter>(
    action: Action,
    args: LifecycleArgs,
    cluster: C,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<()> {
    let lifecycle = WorkspaceLifecycle::new(cluster);
    let workspace = &args.workspace;

    let changed = match action {
        Action::Start => lifecycle.start(workspace).await?,
        Action::Stop => lifecycle.stop(workspace).await?,
    };
    let verb = match action {
        Action::Start => "started",
        Action::Stop => "stopped",
    };
    if changed {
        writeln!(out, "Workspace {} {}", workspace, verb)?;
    } else {
        writeln!(out, "Workspace {} already {}", workspace, verb)?;
    }

    if !args.wait {
        return Ok(());
    }

    let phase = action.target_phase();
    let mut wanted = vec![phase];
    if action == Action::Start {
        wanted.push(WorkspacePhase::Failed);
    }
    let reached = lifecycle
        .wait_phase_changes(workspace, &wanted, Duration::from_secs(args.timeout), cancel)
        .await?;
    match reached {
        Some(p) if p == phase => {
            writeln!(out, "Workspace {} is {}", workspace, p)?;
            Ok(())
        }
        Some(p) => bail!("workspace {} is {}", workspace, p),
        None => bail!(
            "timed out after {}s waiting for {} to be {}",
            args.timeout,
            workspace,
            phase
        ),
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
