// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local TCP listener forwarding each connection to a pod port.
//!
//! Every accepted connection opens its own port-forward stream, retried a
//! bounded number of times. A failed connection never affects the listener.

use parking_lot::Mutex;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wsc_adapters::{ClusterAdapter, ForwardStream};
use wsc_core::PodContainerRef;

/// Listen backlog for the local socket.
pub const LISTEN_BACKLOG: u32 = 1024;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("no free local port: {0}")]
    NoFreePort(#[source] std::io::Error),
    #[error("failed to bind 127.0.0.1:{port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("tunnel on port {port} did not become ready")]
    ReadyTimeout { port: u16 },
    #[error("tunnel on port {port} is closed")]
    Closed { port: u16 },
}

/// Retry budget for opening the remote stream of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardRetry {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ForwardRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// An ephemeral loopback port that was free when asked.
pub fn pick_free_port() -> Result<u16, TunnelError> {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .map_err(TunnelError::NoFreePort)?;
    let port = listener
        .local_addr()
        .map_err(TunnelError::NoFreePort)?
        .port();
    Ok(port)
}

/// Advisory readiness probe: the port counts as served once binding it fails.
pub async fn wait_for_forward_ready(
    local_port: u16,
    attempts: u32,
    interval: Duration,
) -> Result<(), TunnelError> {
    for attempt in 1..=attempts {
        if std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, local_port)).is_err() {
            return Ok(());
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(TunnelError::ReadyTimeout { port: local_port })
}

/// Opens tunnels to pods through the cluster adapter.
#[derive(Clone)]
pub struct TunnelForwarder<C> {
    cluster: C,
    retry: ForwardRetry,
}

impl<C: ClusterAdapter> TunnelForwarder<C> {
    pub fn new(cluster: C) -> Self {
        Self {
            cluster,
            retry: ForwardRetry::default(),
        }
    }

    pub fn with_retry(mut self, retry: ForwardRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Bind `127.0.0.1:local_port` and forward every connection to
    /// `remote_port` on `target`. Port 0 binds an ephemeral port.
    ///
    /// The tunnel closes when `parent` is cancelled.
    pub fn open(
        &self,
        target: &PodContainerRef,
        local_port: u16,
        remote_port: u16,
        parent: &CancellationToken,
    ) -> Result<Tunnel, TunnelError> {
        let listener = bind(local_port)?;
        let bound_port = listener
            .local_addr()
            .map_err(|source| TunnelError::Bind {
                port: local_port,
                source,
            })?
            .port();

        let cancel = parent.child_token();
        let (ready_tx, ready_rx) = watch::channel(false);
        let route = Route {
            cluster: self.cluster.clone(),
            target: target.clone(),
            remote_port,
            retry: self.retry,
        };
        let task = tokio::spawn(accept_loop(listener, route, cancel.clone(), ready_tx));
        tracing::info!(local_port = bound_port, %target, remote_port, "tunnel listening");

        Ok(Tunnel {
            local_port: bound_port,
            cancel,
            ready: ready_rx,
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
        })
    }
}

fn bind(port: u16) -> Result<TcpListener, TunnelError> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let bind_err = |source| TunnelError::Bind { port, source };
    let socket = TcpSocket::new_v4().map_err(bind_err)?;
    socket.set_reuseaddr(true).map_err(bind_err)?;
    socket.bind(addr).map_err(bind_err)?;
    socket.listen(LISTEN_BACKLOG).map_err(bind_err)
}

/// A listening tunnel.
///
/// Closing stops accepting, cancels in-flight connections and releases the
/// listener. Close is idempotent and also runs on drop.
pub struct Tunnel {
    local_port: u16,
    cancel: CancellationToken,
    ready: watch::Receiver<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Tunnel {
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Wait until the accept loop is listening.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), TunnelError> {
        let mut ready = self.ready.clone();
        let waited = tokio::time::timeout(timeout, ready.wait_for(|r| *r))
            .await
            .map(|r| r.map(|_| ()));
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(TunnelError::Closed {
                port: self.local_port,
            }),
            Err(_) => Err(TunnelError::ReadyTimeout {
                port: self.local_port,
            }),
        }
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        tracing::info!(local_port = self.local_port, "tunnel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }

    /// Close and wait for the listener to be released.
    pub async fn shutdown(&self) {
        self.close();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Tunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tunnel")
            .field("local_port", &self.local_port)
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct Route<C> {
    cluster: C,
    target: PodContainerRef,
    remote_port: u16,
    retry: ForwardRetry,
}

async fn accept_loop<C: ClusterAdapter>(
    listener: TcpListener,
    route: Route<C>,
    cancel: CancellationToken,
    ready: watch::Sender<bool>,
) {
    let route = Arc::new(route);
    let _ = ready.send(true);
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((socket, peer)) => {
                tracing::debug!(%peer, "connection accepted");
                let route = Arc::clone(&route);
                let conn_cancel = cancel.child_token();
                tokio::spawn(async move {
                    forward_connection(socket, &route, &conn_cancel).await;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                }
            }
        }
    }
}

async fn forward_connection<C: ClusterAdapter>(
    socket: TcpStream,
    route: &Route<C>,
    cancel: &CancellationToken,
) {
    let Some(remote) = open_with_retry(route, cancel).await else {
        return;
    };
    pump(socket, remote, cancel).await;
}

/// Open the remote stream, retrying per the route's budget.
async fn open_with_retry<C: ClusterAdapter>(
    route: &Route<C>,
    cancel: &CancellationToken,
) -> Option<ForwardStream> {
    let attempts = route.retry.attempts.max(1);
    for attempt in 1..=attempts {
        match route
            .cluster
            .port_forward(&route.target, route.remote_port)
            .await
        {
            Ok(stream) => return Some(stream),
            Err(e) => tracing::warn!(attempt, attempts, error = %e, "port-forward attempt failed"),
        }
        if attempt < attempts {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(route.retry.delay) => {}
            }
        }
    }
    tracing::error!(target = %route.target, attempts, "giving up on connection");
    None
}

/// Copy both directions until either ends, then tear both down.
async fn pump(socket: TcpStream, remote: ForwardStream, cancel: &CancellationToken) {
    let (mut local_read, mut local_write) = socket.into_split();
    let (mut remote_read, mut remote_write) = tokio::io::split(remote);
    tokio::select! {
        _ = cancel.cancelled() => {}
        result = tokio::io::copy(&mut local_read, &mut remote_write) => {
            if let Err(e) = result {
                tracing::debug!(error = %e, "local to remote copy failed");
            }
        }
        result = tokio::io::copy(&mut remote_read, &mut local_write) => {
            if let Err(e) = result {
                tracing::debug!(error = %e, "remote to local copy failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "tunnel_tests.rs"]
mod tests;
