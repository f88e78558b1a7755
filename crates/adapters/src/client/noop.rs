// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op thin client
//!
//! Used when no client command is configured: the connection stays up with
//! the join link printed for the user, and the "client" closes only when its
//! lifetime is cancelled.

use super::{ClientError, ClientEvent, ClientHandle, ThinClientAdapter, CLIENT_EVENT_BUFFER};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wsc_core::{ClientId, IdGen, UuidIdGen};

#[derive(Clone, Default)]
pub struct NoOpClientAdapter {
    ids: UuidIdGen,
}

impl NoOpClientAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThinClientAdapter for NoOpClientAdapter {
    async fn start(
        &self,
        uri: &str,
        _label: &str,
        lifetime: &CancellationToken,
    ) -> Result<ClientHandle, ClientError> {
        let id = ClientId::new(self.ids.next());
        let token = lifetime.child_token();
        let (tx, rx) = mpsc::channel(CLIENT_EVENT_BUFFER);
        let _ = tx.try_send(ClientEvent::PresenceChanged);
        tracing::debug!(client_id = %id, uri, "no client command configured");

        let closed = token.clone();
        tokio::spawn(async move {
            closed.cancelled().await;
            let _ = tx.send(ClientEvent::Closed).await;
        });
        Ok(ClientHandle::new(id, token, rx))
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
