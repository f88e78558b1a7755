// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin-client adapters
//!
//! A thin client is the local IDE front-end that attaches to the remote
//! server through a join link. Its lifetime is bound to a cancellation
//! token: cancelling the token terminates the client.

mod noop;
mod process;

pub use noop::NoOpClientAdapter;
pub use process::ProcessClientAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ClientBehavior, ClientStart, FakeClientAdapter};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wsc_core::ClientId;

/// Capacity of a client's event channel
pub(crate) const CLIENT_EVENT_BUFFER: usize = 8;

/// Errors from thin-client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to launch thin client: {0}")]
    LaunchFailed(String),
}

/// Notification from a running thin client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The client became present (its window is up and attached)
    PresenceChanged,
    /// The client closed
    Closed,
    /// The client exited before becoming present
    FailedToOpen(i32),
}

/// Handle to a launched thin client.
pub struct ClientHandle {
    pub id: ClientId,
    lifetime: CancellationToken,
    events: mpsc::Receiver<ClientEvent>,
}

impl ClientHandle {
    pub fn new(
        id: ClientId,
        lifetime: CancellationToken,
        events: mpsc::Receiver<ClientEvent>,
    ) -> Self {
        Self {
            id,
            lifetime,
            events,
        }
    }

    /// Token that terminates the client when cancelled.
    pub fn lifetime(&self) -> &CancellationToken {
        &self.lifetime
    }

    /// Next event from the client; `None` once the client is gone.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.recv().await
    }

    pub fn terminate(&self) {
        self.lifetime.cancel();
    }

    pub fn is_terminated(&self) -> bool {
        self.lifetime.is_cancelled()
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Adapter for launching thin clients
#[async_trait]
pub trait ThinClientAdapter: Clone + Send + Sync + 'static {
    /// Launch a client against `uri`.
    ///
    /// The returned handle's lifetime is a child of `lifetime`, so
    /// cancelling either terminates the client.
    async fn start(
        &self,
        uri: &str,
        label: &str,
        lifetime: &CancellationToken,
    ) -> Result<ClientHandle, ClientError>;
}
