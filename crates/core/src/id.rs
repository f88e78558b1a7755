// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session and client identifiers, and the generators that mint them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque string identifier, serialized as the bare string.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// One connected session.
    ///
    /// A session survives tunnel and client rebuilds during recovery, so the
    /// id stays stable while the local port and client handle change.
    SessionId
);

string_id!(
    /// One thin-client launch
    ClientId
);

/// Source of fresh identifiers
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> String;
}

/// Random v4 UUIDs
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Predictable `prefix-1`, `prefix-2`, ... for tests. Clones share the
/// counter.
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: Arc<str>,
    last: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: Arc::from(prefix),
            last: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.last.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
