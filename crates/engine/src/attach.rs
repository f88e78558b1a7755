// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunnel plus thin client, shared by connect and recovery

use crate::error::{ClientFailure, ConnectError};
use crate::orchestrator::ConnectionState;
use crate::tunnel::{pick_free_port, Tunnel, TunnelForwarder};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClientEvent, ClientHandle, ClusterAdapter, ThinClientAdapter};
use wsc_core::{rewrite_port, PodContainerRef, REMOTE_SERVER_PORT};

/// A ready tunnel with an attached client
pub(crate) struct Attachment {
    pub tunnel: Tunnel,
    pub client: ClientHandle,
    pub local_join_link: String,
}

impl Attachment {
    pub fn local_port(&self) -> u16 {
        self.tunnel.local_port()
    }

    /// Terminate the client, then close the tunnel.
    pub async fn release(self) {
        self.client.terminate();
        self.tunnel.shutdown().await;
    }
}

pub(crate) struct AttachRequest<'a> {
    pub target: &'a PodContainerRef,
    pub join_link: &'a str,
    pub label: &'a str,
    pub tunnel_ready: Duration,
    pub client_attach: Duration,
}

/// Open a tunnel on a free port, point the join link at it and start a
/// client. Tunnel and client are children of `lifetime`; on failure both
/// are released before returning.
pub(crate) async fn attach<C, T>(
    forwarder: &TunnelForwarder<C>,
    client: &T,
    request: AttachRequest<'_>,
    lifetime: &CancellationToken,
    report: &(dyn Fn(ConnectionState) + Send + Sync),
) -> Result<Attachment, ConnectError>
where
    C: ClusterAdapter,
    T: ThinClientAdapter,
{
    report(ConnectionState::OpeningTunnel);
    let port = pick_free_port()?;
    let tunnel = forwarder.open(request.target, port, REMOTE_SERVER_PORT, lifetime)?;
    let local_join_link = match ready_link(&tunnel, &request, lifetime).await {
        Ok(link) => link,
        Err(e) => {
            tunnel.shutdown().await;
            return Err(e);
        }
    };

    report(ConnectionState::StartingClient);
    // The handle owns its event channel, so a client closing right away is
    // still observed below
    let mut handle = match client.start(&local_join_link, request.label, lifetime).await {
        Ok(handle) => handle,
        Err(e) => {
            tunnel.shutdown().await;
            return Err(e.into());
        }
    };

    report(ConnectionState::WaitingClientAttached);
    match wait_attached(&mut handle, request.client_attach, lifetime).await {
        Ok(()) => Ok(Attachment {
            tunnel,
            client: handle,
            local_join_link,
        }),
        Err(e) => {
            handle.terminate();
            tunnel.shutdown().await;
            Err(e)
        }
    }
}

async fn ready_link(
    tunnel: &Tunnel,
    request: &AttachRequest<'_>,
    lifetime: &CancellationToken,
) -> Result<String, ConnectError> {
    tokio::select! {
        _ = lifetime.cancelled() => return Err(ConnectError::Cancelled),
        ready = tunnel.wait_ready(request.tunnel_ready) => ready?,
    }
    Ok(rewrite_port(request.join_link, tunnel.local_port())?)
}

/// First client event decides: presence attaches, anything else fails.
async fn wait_attached(
    handle: &mut ClientHandle,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), ConnectError> {
    let event = tokio::select! {
        _ = cancel.cancelled() => return Err(ConnectError::Cancelled),
        event = tokio::time::timeout(timeout, handle.next_event()) => event,
    };
    let failure = match event {
        Ok(Some(ClientEvent::PresenceChanged)) => {
            tracing::info!(client_id = %handle.id, "client attached");
            return Ok(());
        }
        Ok(Some(ClientEvent::FailedToOpen(code))) => ClientFailure::FailedToOpen(code),
        Ok(Some(ClientEvent::Closed) | None) => ClientFailure::Closed,
        Err(_) => ClientFailure::Timeout(timeout),
    };
    tracing::warn!(client_id = %handle.id, %failure, "client did not attach");
    Err(ConnectError::ClientNotReady(failure))
}
