// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup: a file under the state directory, plus stderr with `--verbose`

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

pub const LOG_FILE: &str = "wsc.log";

/// Install the global subscriber. The guard must live until exit so
/// buffered lines reach the file.
///
/// Without a usable state directory only the stderr layer (if any) is
/// installed.
pub fn setup(state_dir: Option<&Path>, verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match state_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(non_blocking)),
                Some(guard),
            )
        }
        None => (None, None),
    };
    let stderr_layer = verbose.then(|| fmt::layer().with_writer(std::io::stderr));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    guard
}
