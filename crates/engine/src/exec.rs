// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot command execution inside a container

use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{BoxedReader, ClusterAdapter, ClusterError, ExecProcess};
use wsc_core::PodContainerRef;

/// Exit code reported when a command is killed for exceeding its timeout.
pub const EXEC_TIMEOUT_EXIT_CODE: i32 = -1;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error("exec stream failed: {0}")]
    Stream(String),
    #[error("exec cancelled")]
    Cancelled,
}

/// Captured result of a finished (or timed-out) command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Trimmed stdout
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    fn timed_out_output() -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: EXEC_TIMEOUT_EXIT_CODE,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == EXEC_TIMEOUT_EXIT_CODE
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

enum Outcome {
    Done(Result<ExecOutput, ExecError>),
    TimedOut,
    Cancelled,
}

/// Runs commands in containers with a timeout and cancellation.
///
/// Every call gets its own exec stream from the cluster adapter, so calls
/// can run concurrently.
#[derive(Clone)]
pub struct ExecChannel<C> {
    cluster: C,
}

impl<C: ClusterAdapter> ExecChannel<C> {
    pub fn new(cluster: C) -> Self {
        Self { cluster }
    }

    /// Run `command` in `target`, waiting at most `timeout`.
    ///
    /// A timeout is not an error: the process is killed and the output
    /// carries [`EXEC_TIMEOUT_EXIT_CODE`].
    pub async fn exec(
        &self,
        target: &PodContainerRef,
        command: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecOutput, ExecError> {
        let deadline = Instant::now() + timeout;
        let mut process = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecError::Cancelled),
            started = tokio::time::timeout_at(deadline, self.cluster.exec(target, command)) => {
                match started {
                    Ok(process) => process?,
                    Err(_) => {
                        tracing::debug!(%target, "exec timed out before attaching");
                        return Ok(ExecOutput::timed_out_output());
                    }
                }
            }
        };

        let stdout = process.take_stdout();
        let stderr = process.take_stderr();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            done = tokio::time::timeout_at(deadline, collect(stdout, stderr, &mut process)) => {
                match done {
                    Ok(result) => Outcome::Done(result),
                    Err(_) => Outcome::TimedOut,
                }
            }
        };

        match outcome {
            Outcome::Done(result) => result,
            Outcome::TimedOut => {
                process.kill();
                tracing::debug!(%target, timeout_ms = timeout.as_millis() as u64, "exec timed out");
                Ok(ExecOutput::timed_out_output())
            }
            Outcome::Cancelled => {
                process.kill();
                Err(ExecError::Cancelled)
            }
        }
    }
}

async fn read_all(reader: Option<BoxedReader>) -> Result<String, ExecError> {
    let Some(mut reader) = reader else {
        return Ok(String::new());
    };
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|e| ExecError::Stream(e.to_string()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn collect(
    stdout: Option<BoxedReader>,
    stderr: Option<BoxedReader>,
    process: &mut ExecProcess,
) -> Result<ExecOutput, ExecError> {
    let (stdout, stderr) = tokio::join!(read_all(stdout), read_all(stderr));
    let (stdout, stderr) = (stdout?, stderr?);
    let exit_code = process
        .wait()
        .await
        .ok_or_else(|| ExecError::Stream("exec ended without an exit status".to_string()))?;
    Ok(ExecOutput {
        stdout: stdout.trim().to_string(),
        stderr,
        exit_code,
    })
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
