// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state-engine handle shared by Queue and Worker.
//!
//! Carries exactly the capability set a script invoker needs: the key
//! layout, a command connection, the script catalog, and the server's
//! LPOS capability. Cloning is cheap; all clones share one catalog.

use crate::catalog::ScriptCatalog;
use grist_core::keys::KeySpace;
use grist_core::opts::JobOpts;
use redis::aio::ConnectionManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct StateEngine {
    keys: KeySpace,
    conn: ConnectionManager,
    catalog: Arc<ScriptCatalog>,
    supports_lpos: bool,
}

impl StateEngine {
    pub fn new(conn: ConnectionManager, keys: KeySpace, supports_lpos: bool) -> Self {
        Self { keys, conn, catalog: Arc::new(ScriptCatalog::new()), supports_lpos }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// A clone of the shared command connection.
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    pub fn catalog(&self) -> &ScriptCatalog {
        &self.catalog
    }

    pub fn supports_lpos(&self) -> bool {
        self.supports_lpos
    }

    /// The same engine pointed at a sibling queue (DLQ, compensation queue).
    pub fn sibling(&self, queue: &str) -> Self {
        Self {
            keys: self.keys.sibling(queue),
            conn: self.conn.clone(),
            catalog: self.catalog.clone(),
            supports_lpos: self.supports_lpos,
        }
    }

    /// Base prefix for job keys, with the trailing colon scripts expect.
    pub(crate) fn base_arg(&self) -> String {
        format!("{}:", self.keys.base())
    }
}

impl std::fmt::Debug for StateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateEngine")
            .field("base", &self.keys.base())
            .field("supports_lpos", &self.supports_lpos)
            .finish()
    }
}

/// The child's failure-propagation policy argument for finish scripts.
pub fn parent_policy(opts: &JobOpts) -> &'static str {
    if opts.fail_parent_on_failure {
        "fail"
    } else if opts.continue_parent_on_failure {
        "continue"
    } else if opts.ignore_dependency_on_failure {
        "ignore"
    } else if opts.remove_dependency_on_failure {
        "remove"
    } else {
        ""
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
