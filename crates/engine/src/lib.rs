// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wsc-engine: workspace connection pipeline

mod active;
mod attach;
mod error;
mod exec;
mod lifecycle;
mod monitor;
mod orchestrator;
mod poll;
mod probe;
mod recovery;
mod resolver;
mod session;
mod tunnel;
mod watcher;

#[cfg(test)]
mod test_helpers;

pub use active::{ActiveGuard, ActiveWorkspaces};
pub use error::{ClientFailure, ConnectError};
pub use exec::{ExecChannel, ExecError, ExecOutput, EXEC_TIMEOUT_EXIT_CODE};
pub use lifecycle::{LifecycleError, WorkspaceLifecycle, WATCH_RECONNECT_BACKOFF};
pub use monitor::{ConnectionMonitor, MonitorConfig, RestartDetector, RestartReason};
pub use orchestrator::{
    ConnectConfig, ConnectionObserver, ConnectionOrchestrator, ConnectionState, NoOpObserver,
};
pub use poll::{Poller, Tick};
pub use probe::{status_command, ProbeConfig, ProbeError, RemoteServerStatusProbe};
pub use recovery::{ConnectionRecovery, RecoveredConnection, RecoveryConfig, RecoveryError};
pub use resolver::{PodResolver, ResolveError};
pub use session::{CloseReason, Session, SessionInfo};
pub use tunnel::{
    pick_free_port, wait_for_forward_ready, ForwardRetry, Tunnel, TunnelError, TunnelForwarder,
    LISTEN_BACKLOG,
};
pub use watcher::{WatcherConfig, WorkspaceEvent, WorkspaceWatcher};
