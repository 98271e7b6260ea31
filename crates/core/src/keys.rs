// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical key layout for a queue.
//!
//! Every durable key derives from `{prefix}:{queue}`. In cluster deployments
//! the queue name is wrapped as a Redis hash tag (`{payments}`) so that all
//! keys touched by one script invocation collocate on a single slot. Group
//! keys extend the layout under `:groups:{groupId}[:jobs]`, deduplication
//! markers under `:de:{dedupId}`.

use serde::{Deserialize, Serialize};

/// Default key prefix when none is configured.
pub const DEFAULT_PREFIX: &str = "grist";

/// Deterministic mapping of `(prefix, queue, kind)` to storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpace {
    prefix: String,
    queue: String,
    /// `{prefix}:{queue}` with the hash tag already applied.
    base: String,
}

impl KeySpace {
    /// Layout for a standalone deployment (no hash tag).
    pub fn new(prefix: impl Into<String>, queue: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let queue = queue.into();
        let base = format!("{prefix}:{queue}");
        Self { prefix, queue, base }
    }

    /// Layout for a cluster deployment: the queue name becomes a Redis hash
    /// tag inherited by every derived key. Names that already carry a tag
    /// (derived queues collocating with their source) are left as-is.
    pub fn clustered(prefix: impl Into<String>, queue: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let queue = queue.into();
        let base = if queue.contains('{') {
            format!("{prefix}:{queue}")
        } else {
            format!("{prefix}:{{{queue}}}")
        };
        Self { prefix, queue, base }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The queue-qualified prefix shared by all keys.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Whether this layout carries a hash tag.
    pub fn is_tagged(&self) -> bool {
        self.base.contains('{')
    }

    /// The name of a derived queue (DLQ, compensation) that collocates with
    /// this one: in cluster layouts the source tag is embedded in the name.
    pub fn derived_queue_name(&self, suffix: &str) -> String {
        if self.is_tagged() && !self.queue.contains('{') {
            format!("{{{}}}:{suffix}", self.queue)
        } else {
            format!("{}:{suffix}", self.queue)
        }
    }

    /// Derive the layout for a sibling queue under the same prefix and the
    /// same tagging discipline.
    pub fn sibling(&self, queue: impl Into<String>) -> Self {
        if self.is_tagged() {
            Self::clustered(self.prefix.clone(), queue)
        } else {
            Self::new(self.prefix.clone(), queue)
        }
    }

    fn kind(&self, kind: &str) -> String {
        format!("{}:{}", self.base, kind)
    }

    // -- queue state sets --

    pub fn wait(&self) -> String {
        self.kind("wait")
    }

    pub fn paused(&self) -> String {
        self.kind("paused")
    }

    pub fn active(&self) -> String {
        self.kind("active")
    }

    pub fn delayed(&self) -> String {
        self.kind("delayed")
    }

    pub fn prioritized(&self) -> String {
        self.kind("prioritized")
    }

    pub fn waiting_children(&self) -> String {
        self.kind("waiting-children")
    }

    pub fn completed(&self) -> String {
        self.kind("completed")
    }

    pub fn failed(&self) -> String {
        self.kind("failed")
    }

    pub fn stalled(&self) -> String {
        self.kind("stalled")
    }

    pub fn stalled_check(&self) -> String {
        self.kind("stalled-check")
    }

    pub fn limiter(&self) -> String {
        self.kind("limiter")
    }

    pub fn meta(&self) -> String {
        self.kind("meta")
    }

    pub fn id_counter(&self) -> String {
        self.kind("id")
    }

    pub fn priority_counter(&self) -> String {
        self.kind("pc")
    }

    pub fn events(&self) -> String {
        self.kind("events")
    }

    pub fn marker(&self) -> String {
        self.kind("marker")
    }

    pub fn repeat(&self) -> String {
        self.kind("repeat")
    }

    pub fn metrics(&self, outcome: &str) -> String {
        self.kind(&format!("metrics:{outcome}"))
    }

    // -- per-job keys --

    /// The canonical job key: `{prefix}:{queue}:{jobId}`.
    pub fn job(&self, job_id: &str) -> String {
        self.kind(job_id)
    }

    pub fn lock(&self, job_id: &str) -> String {
        self.kind(&format!("{job_id}:lock"))
    }

    pub fn logs(&self, job_id: &str) -> String {
        self.kind(&format!("{job_id}:logs"))
    }

    pub fn dependencies(&self, job_id: &str) -> String {
        self.kind(&format!("{job_id}:dependencies"))
    }

    pub fn processed(&self, job_id: &str) -> String {
        self.kind(&format!("{job_id}:processed"))
    }

    pub fn unsuccessful(&self, job_id: &str) -> String {
        self.kind(&format!("{job_id}:unsuccessful"))
    }

    /// Deduplication marker for a user-supplied dedup id.
    pub fn dedup(&self, dedup_id: &str) -> String {
        self.kind(&format!("de:{dedup_id}"))
    }

    // -- groups --

    /// Sorted-set index of all groups in this queue.
    pub fn groups_index(&self) -> String {
        self.kind("groups")
    }

    pub fn group(&self, group_id: &str) -> String {
        self.kind(&format!("groups:{group_id}"))
    }

    pub fn group_jobs(&self, group_id: &str) -> String {
        self.kind(&format!("groups:{group_id}:jobs"))
    }
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
