// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of workspaces with a live connection

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use wsc_core::WorkspaceRef;

/// Shared set of connected workspaces. Cloning shares the set.
#[derive(Clone, Default)]
pub struct ActiveWorkspaces {
    inner: Arc<RwLock<HashSet<WorkspaceRef>>>,
}

impl ActiveWorkspaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `workspace` unless already present. The returned guard
    /// removes it again when released or dropped.
    pub fn try_register(&self, workspace: &WorkspaceRef) -> Option<ActiveGuard> {
        if !self.inner.write().insert(workspace.clone()) {
            return None;
        }
        Some(ActiveGuard {
            set: self.clone(),
            workspace: Some(workspace.clone()),
        })
    }

    pub fn contains(&self, workspace: &WorkspaceRef) -> bool {
        self.inner.read().contains(workspace)
    }

    /// Sorted snapshot of the registered workspaces
    pub fn list(&self) -> Vec<WorkspaceRef> {
        let mut list: Vec<_> = self.inner.read().iter().cloned().collect();
        list.sort();
        list
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Registration of one workspace in [`ActiveWorkspaces`]
pub struct ActiveGuard {
    set: ActiveWorkspaces,
    workspace: Option<WorkspaceRef>,
}

impl ActiveGuard {
    pub fn release(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            self.set.inner.write().remove(&workspace);
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "active_tests.rs"]
mod tests;
