// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wsc-core: domain model for connecting to remote development workspaces

pub mod id;
pub mod join_link;
pub mod pod;
pub mod server_status;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use id::{ClientId, IdGen, SequentialIdGen, SessionId, UuidIdGen};
pub use join_link::{rewrite_port, JoinLinkError};
pub use pod::{
    workspace_selector, ContainerInfo, ContainerPort, PodContainerRef, PodInfo, REMOTE_SERVER_PORT,
    SERVER_PORT_NAME, WORKSPACE_NAME_LABEL,
};
pub use server_status::{ProjectInfo, RemoteServerStatus, STATUS_MARKER};
pub use workspace::{
    ParseWorkspaceRefError, SnapshotError, WorkspacePhase, WorkspaceRef, WorkspaceSnapshot,
    EDITOR_ANNOTATION,
};
