// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the cluster API and the thin client

pub mod client;
pub mod cluster;
mod env;
pub mod traced;

pub use client::{
    ClientError, ClientEvent, ClientHandle, NoOpClientAdapter, ProcessClientAdapter,
    ThinClientAdapter,
};
pub use cluster::{
    BoxedReader, ClusterAdapter, ClusterCredentials, ClusterError, ExecProcess, ForwardStream,
    KubeClusterAdapter, ObjectList, ResourceKind, WatchEvent, WatchStream,
};
pub use traced::{TracedClient, TracedCluster};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use client::{ClientBehavior, ClientStart, FakeClientAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use cluster::{ClusterCall, FakeClusterAdapter, FakeExec};
