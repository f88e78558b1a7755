// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake thin-client adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ClientError, ClientEvent, ClientHandle, ThinClientAdapter, CLIENT_EVENT_BUFFER};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wsc_core::{ClientId, IdGen, SequentialIdGen};

/// How the next launched client behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientBehavior {
    /// Report presence immediately
    Attach,
    /// Exit with the given code before becoming present
    FailToOpen(i32),
    /// Close without ever becoming present
    CloseImmediately,
    /// Launch but never report anything
    Silent,
    /// Fail the launch itself
    LaunchError,
}

/// Recorded client launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStart {
    pub id: ClientId,
    pub uri: String,
    pub label: String,
}

struct FakeClient {
    tx: mpsc::Sender<ClientEvent>,
    lifetime: CancellationToken,
}

struct FakeClientState {
    behaviors: VecDeque<ClientBehavior>,
    default_behavior: ClientBehavior,
    starts: Vec<ClientStart>,
    clients: HashMap<ClientId, FakeClient>,
}

/// Fake thin-client adapter for testing
#[derive(Clone)]
pub struct FakeClientAdapter {
    inner: Arc<Mutex<FakeClientState>>,
    ids: SequentialIdGen,
}

impl Default for FakeClientAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClientState {
                behaviors: VecDeque::new(),
                default_behavior: ClientBehavior::Attach,
                starts: Vec::new(),
                clients: HashMap::new(),
            })),
            ids: SequentialIdGen::new("client"),
        }
    }
}

impl FakeClientAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the behavior of the next launch
    pub fn push_behavior(&self, behavior: ClientBehavior) {
        self.inner.lock().behaviors.push_back(behavior);
    }

    /// Behavior used once the queue is drained
    pub fn set_default_behavior(&self, behavior: ClientBehavior) {
        self.inner.lock().default_behavior = behavior;
    }

    /// All recorded launches
    pub fn starts(&self) -> Vec<ClientStart> {
        self.inner.lock().starts.clone()
    }

    pub fn last_start(&self) -> Option<ClientStart> {
        self.inner.lock().starts.last().cloned()
    }

    /// Simulate the user closing a client window
    pub fn close_client(&self, id: &ClientId) {
        if let Some(client) = self.inner.lock().clients.get(id) {
            let _ = client.tx.try_send(ClientEvent::Closed);
        }
    }

    /// Whether the client's lifetime was cancelled
    pub fn is_terminated(&self, id: &ClientId) -> bool {
        self.inner
            .lock()
            .clients
            .get(id)
            .is_some_and(|c| c.lifetime.is_cancelled())
    }
}

#[async_trait]
impl ThinClientAdapter for FakeClientAdapter {
    async fn start(
        &self,
        uri: &str,
        label: &str,
        lifetime: &CancellationToken,
    ) -> Result<ClientHandle, ClientError> {
        let mut state = self.inner.lock();
        let behavior = state
            .behaviors
            .pop_front()
            .unwrap_or(state.default_behavior);
        if behavior == ClientBehavior::LaunchError {
            return Err(ClientError::LaunchFailed("scripted launch failure".to_string()));
        }

        let id = ClientId::new(self.ids.next());
        state.starts.push(ClientStart {
            id: id.clone(),
            uri: uri.to_string(),
            label: label.to_string(),
        });

        let token = lifetime.child_token();
        let (tx, rx) = mpsc::channel(CLIENT_EVENT_BUFFER);
        match behavior {
            ClientBehavior::Attach => {
                let _ = tx.try_send(ClientEvent::PresenceChanged);
            }
            ClientBehavior::FailToOpen(code) => {
                let _ = tx.try_send(ClientEvent::FailedToOpen(code));
            }
            ClientBehavior::CloseImmediately => {
                let _ = tx.try_send(ClientEvent::Closed);
            }
            ClientBehavior::Silent | ClientBehavior::LaunchError => {}
        }

        let closed_tx = tx.clone();
        let closed = token.clone();
        tokio::spawn(async move {
            closed.cancelled().await;
            let _ = closed_tx.send(ClientEvent::Closed).await;
        });

        state.clients.insert(
            id.clone(),
            FakeClient {
                tx,
                lifetime: token.clone(),
            },
        );
        Ok(ClientHandle::new(id, token, rx))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
