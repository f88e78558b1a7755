// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Join link rewriting.
//!
//! A join link minted inside the pod points at the server's fixed internal
//! port. Before handing it to the thin client, the authority's port is
//! replaced with the local end of the tunnel. Only the port component is
//! touched; the same digits appearing in the path, query or fragment are
//! left alone.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinLinkError {
    #[error("join link is not a valid URI: {0}")]
    Invalid(String),
    #[error("join link has no host: {0}")]
    NoHost(String),
}

/// Replace the port of `link`'s authority with `local_port`.
pub fn rewrite_port(link: &str, local_port: u16) -> Result<String, JoinLinkError> {
    let mut url = Url::parse(link.trim()).map_err(|e| JoinLinkError::Invalid(e.to_string()))?;
    if !url.has_host() {
        return Err(JoinLinkError::NoHost(link.to_string()));
    }
    url.set_port(Some(local_port))
        .map_err(|()| JoinLinkError::NoHost(link.to_string()))?;
    Ok(url.to_string())
}

#[cfg(test)]
#[path = "join_link_tests.rs"]
mod tests;
