// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment overrides for the adapters crate.

use std::time::Duration;

const DEFAULT_CLIENT_SETTLE: Duration = Duration::from_secs(3);

/// `WSC_CLIENT_SETTLE_MS`: how long a launched thin client must stay up
/// before it counts as present.
pub fn client_settle() -> Duration {
    std::env::var("WSC_CLIENT_SETTLE_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(DEFAULT_CLIENT_SETTLE, Duration::from_millis)
}
