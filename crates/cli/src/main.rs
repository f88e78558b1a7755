// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wsc - connect a local thin client to a remote development workspace

mod color;
mod commands;
mod config;
mod env;
mod logging;
mod output;
mod table;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{connect, list, status, workspace};
use output::OutputFormat;
use tokio_util::sync::CancellationToken;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "wsc",
    version,
    about = "Workspace connector - attach a thin client to a remote IDE server"
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    /// Also write logs to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a thin client to a workspace and stay attached
    Connect(connect::ConnectArgs),
    /// List workspaces in a namespace
    List(list::ListArgs),
    /// Start a workspace
    Start(workspace::LifecycleArgs),
    /// Stop a workspace
    Stop(workspace::LifecycleArgs),
    /// Show workspace and IDE server status
    Status(status::StatusArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guard = logging::setup(env::state_dir().as_deref(), cli.verbose);

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %format_error(e), "command failed");
    }
    // Flush the log file before exit skips destructors
    drop(guard);

    if let Err(e) = result {
        eprintln!("Error: {}", format_error(&e));
        std::process::exit(1);
    }
}

/// Format an anyhow error as a single line.
///
/// Causes whose text already appears earlier in the line are dropped, so
/// thiserror variants that embed their source (`#[error("... {0}")]`) are
/// not repeated.
fn format_error(err: &anyhow::Error) -> String {
    let mut line = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !line.contains(&text) {
            line.push_str(": ");
            line.push_str(&text);
        }
    }
    line
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.output;
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load(env::config_path().as_deref())?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted");
                cancel.cancel();
            }
        }
    });

    let cluster = commands::cluster(&config).await?;
    let mut stdout = std::io::stdout();
    match command {
        Commands::Connect(args) => connect::handle(args, &config, cluster, &cancel).await,
        Commands::List(args) => list::handle(args, cluster, format, &cancel, &mut stdout).await,
        Commands::Start(args) => {
            workspace::handle(workspace::Action::Start, args, cluster, &cancel, &mut stdout).await
        }
        Commands::Stop(args) => {
            workspace::handle(workspace::Action::Stop, args, cluster, &cancel, &mut stdout).await
        }
        Commands::Status(args) => status::handle(args, cluster, format, &cancel, &mut stdout).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
