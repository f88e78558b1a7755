// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashSet;

#[test]
fn ids_display_as_their_string() {
    let id = SessionId::new("s-1");

    assert_eq!(id.as_str(), "s-1");
    assert_eq!(id.to_string(), "s-1");
}

#[test]
fn ids_serialize_transparently() {
    let id = ClientId::new("client-7");

    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"client-7\"");
    assert_eq!(serde_json::from_str::<ClientId>(&json).unwrap(), id);
}

#[test]
fn uuid_gen_creates_unique_ids() {
    let ids: HashSet<String> = (0..16).map(|_| UuidIdGen.next()).collect();

    assert_eq!(ids.len(), 16);
    assert!(ids.iter().all(|id| id.len() == 36));
}

#[test]
fn sequential_gen_is_shared_across_clones() {
    let first = SequentialIdGen::new("client");
    let second = first.clone();

    assert_eq!(first.next(), "client-1");
    assert_eq!(second.next(), "client-2");
    assert_eq!(first.next(), "client-3");
}
