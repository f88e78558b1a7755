// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling loop helper.
//!
//! Consolidates the pattern shared by every readiness wait: poll at a fixed
//! interval until a deadline passes or the caller cancels.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Result of waiting for the next poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Ready for the next poll iteration.
    Ready,
    /// The deadline was reached.
    Timeout,
    /// The cancellation token fired.
    Cancelled,
}

/// A polling loop helper with interval timing, optional deadline, and
/// cooperative cancellation.
pub struct Poller {
    interval: Duration,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Poller {
    /// Create a new poller with the given interval and optional timeout.
    pub fn new(interval: Duration, timeout: Option<Duration>, cancel: &CancellationToken) -> Self {
        Self {
            interval,
            deadline: timeout.map(|t| Instant::now() + t),
            cancel: cancel.clone(),
        }
    }

    /// Time left before the deadline; `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Wait for the next poll tick.
    ///
    /// Returns [`Tick::Timeout`] if the deadline has been reached (checked
    /// both before and after sleeping). The sleep never overshoots the
    /// deadline and is interrupted by cancellation.
    pub async fn tick(&mut self) -> Tick {
        if self.cancel.is_cancelled() {
            return Tick::Cancelled;
        }
        let sleep_for = match self.remaining() {
            Some(remaining) if remaining.is_zero() => return Tick::Timeout,
            Some(remaining) => self.interval.min(remaining),
            None => self.interval,
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Tick::Cancelled,
            _ = tokio::time::sleep(sleep_for) => {
                if self.remaining().is_some_and(|r| r.is_zero()) {
                    return Tick::Timeout;
                }
                Tick::Ready
            }
        }
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
