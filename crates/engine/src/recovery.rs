// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rebuilds tunnel and client after a server restart

use crate::attach::{attach, AttachRequest, Attachment};
use crate::error::ConnectError;
use crate::orchestrator::ConnectionState;
use crate::probe::RemoteServerStatusProbe;
use crate::tunnel::{Tunnel, TunnelForwarder};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClientHandle, ClusterAdapter, ThinClientAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Bound on the whole recovery, backoff included
    pub deadline: Duration,
    pub max_attempts: u32,
    /// Attempt `n` failing waits `n * backoff_step` before the next one
    pub backoff_step: Duration,
    pub server_ready_timeout: Duration,
    pub client_attach_timeout: Duration,
    pub tunnel_ready_timeout: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(300),
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
            server_ready_timeout: Duration::from_secs(180),
            client_attach_timeout: Duration::from_secs(60),
            tunnel_ready_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("recovery gave up after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ConnectError>,
    },
    #[error("recovery did not finish within {}s", .deadline.as_secs())]
    TimedOut { deadline: Duration },
    #[error("recovery cancelled")]
    Cancelled,
}

impl RecoveryError {
    /// Message with the last attempt's cause appended
    pub fn user_message(&self) -> String {
        match self {
            RecoveryError::Exhausted { last, .. } => format!("{self}: {}", last.user_message()),
            _ => self.to_string(),
        }
    }
}

/// A rebuilt connection
pub struct RecoveredConnection {
    pub tunnel: Tunnel,
    pub client: ClientHandle,
    pub local_port: u16,
    /// Link as reported by the server
    pub join_link: String,
    /// Link rewritten to the new local port
    pub local_join_link: String,
    pub attempts: u32,
}

pub struct ConnectionRecovery<C, T> {
    probe: Arc<RemoteServerStatusProbe<C>>,
    forwarder: TunnelForwarder<C>,
    client: T,
    label: String,
    config: RecoveryConfig,
}

impl<C, T> ConnectionRecovery<C, T>
where
    C: ClusterAdapter,
    T: ThinClientAdapter,
{
    pub fn new(
        probe: Arc<RemoteServerStatusProbe<C>>,
        forwarder: TunnelForwarder<C>,
        client: T,
        config: RecoveryConfig,
    ) -> Self {
        let label = probe.workspace().to_string();
        Self {
            probe,
            forwarder,
            client,
            label,
            config,
        }
    }

    /// Release `old_client` and rebuild the connection under `lifetime`.
    ///
    /// Only the old handle's own lifetime is cancelled; `lifetime` stays
    /// alive and parents the new tunnel and client.
    pub async fn recover_connection(
        &self,
        old_client: Option<ClientHandle>,
        lifetime: &CancellationToken,
    ) -> Result<RecoveredConnection, RecoveryError> {
        let workspace = self.probe.workspace();
        tracing::info!(%workspace, "recovering connection");
        if let Some(old) = old_client {
            old.terminate();
        }

        let deadline = Instant::now() + self.config.deadline;
        tokio::select! {
            biased;
            _ = lifetime.cancelled() => Err(RecoveryError::Cancelled),
            result = tokio::time::timeout_at(deadline, self.attempts(lifetime)) => match result {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(%workspace, "recovery deadline passed");
                    Err(RecoveryError::TimedOut {
                        deadline: self.config.deadline,
                    })
                }
            },
        }
    }

    async fn attempts(&self, lifetime: &CancellationToken) -> Result<RecoveredConnection, RecoveryError> {
        let workspace = self.probe.workspace();
        let max_attempts = self.config.max_attempts.max(1);
        let mut last = None;
        for attempt in 1..=max_attempts {
            match self.attempt(lifetime).await {
                Ok((join_link, attachment)) => {
                    tracing::info!(%workspace, attempt, local_port = attachment.local_port(), "connection recovered");
                    return Ok(RecoveredConnection {
                        local_port: attachment.local_port(),
                        tunnel: attachment.tunnel,
                        client: attachment.client,
                        join_link,
                        local_join_link: attachment.local_join_link,
                        attempts: attempt,
                    });
                }
                Err(ConnectError::Cancelled) => return Err(RecoveryError::Cancelled),
                Err(e) => {
                    tracing::warn!(%workspace, attempt, error = %e.user_message(), "recovery attempt failed");
                    last = Some(e);
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.config.backoff_step * attempt).await;
            }
        }
        match last {
            Some(last) => Err(RecoveryError::Exhausted {
                attempts: max_attempts,
                last: Box::new(last),
            }),
            None => Err(RecoveryError::Cancelled),
        }
    }

    async fn attempt(&self, lifetime: &CancellationToken) -> Result<(String, Attachment), ConnectError> {
        let workspace = self.probe.workspace();
        let status = self
            .probe
            .wait_server_ready(self.config.server_ready_timeout, lifetime)
            .await
            .map_err(|e| ConnectError::server(workspace, e))?;
        let join_link = status
            .join_link()
            .ok_or_else(|| ConnectError::JoinLinkMissing {
                workspace: workspace.clone(),
            })?
            .to_string();
        let target = self
            .probe
            .target()
            .await
            .map_err(|e| ConnectError::server(workspace, e))?;

        let attachment = attach(
            &self.forwarder,
            &self.client,
            AttachRequest {
                target: &target,
                join_link: &join_link,
                label: &self.label,
                tunnel_ready: self.config.tunnel_ready_timeout,
                client_attach: self.config.client_attach_timeout,
            },
            lifetime,
            &|_: ConnectionState| {},
        )
        .await?;
        Ok((join_link, attachment))
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
