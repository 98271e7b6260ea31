// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator actions and queue-wide operations.

use crate::engine::StateEngine;
use crate::reply;
use crate::ScriptError;
use redis::Value;

/// Cleanable state sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanTarget {
    Completed,
    Failed,
    Delayed,
    Wait,
    Paused,
}

impl CleanTarget {
    fn kind(&self) -> &'static str {
        match self {
            Self::Completed | Self::Failed | Self::Delayed => "zset",
            Self::Wait | Self::Paused => "list",
        }
    }
}

impl StateEngine {
    /// Requeue one failed job.
    pub async fn retry_job(&self, job_id: &str, lifo: bool) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .retry_job
            .key(keys.failed())
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.meta())
            .key(keys.prioritized())
            .key(keys.priority_counter())
            .key(keys.marker())
            .key(keys.events())
            .arg(self.base_arg())
            .arg(job_id)
            .arg(if lifo { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "retryJob", job_id));
        }
        Ok(())
    }

    /// Requeue failed jobs in batches; returns the number still failed.
    pub async fn retry_jobs(&self, batch: u32) -> Result<u64, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let remaining: i64 = self
            .catalog()
            .retry_jobs
            .key(keys.failed())
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.meta())
            .key(keys.prioritized())
            .key(keys.priority_counter())
            .key(keys.marker())
            .key(keys.events())
            .arg(self.base_arg())
            .arg(batch.max(1))
            .invoke_async(&mut conn)
            .await?;
        Ok(remaining.max(0) as u64)
    }

    /// Promote one delayed job to ready.
    pub async fn promote(&self, job_id: &str) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .promote
            .key(keys.delayed())
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.meta())
            .key(keys.prioritized())
            .key(keys.priority_counter())
            .key(keys.marker())
            .key(keys.events())
            .arg(self.base_arg())
            .arg(job_id)
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "promote", job_id));
        }
        Ok(())
    }

    /// Promote delayed jobs in batches; returns the number still delayed.
    pub async fn promote_jobs(&self, batch: u32) -> Result<u64, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let remaining: i64 = self
            .catalog()
            .promote_jobs
            .key(keys.delayed())
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.meta())
            .key(keys.prioritized())
            .key(keys.priority_counter())
            .key(keys.marker())
            .key(keys.events())
            .arg(self.base_arg())
            .arg(batch.max(1))
            .invoke_async(&mut conn)
            .await?;
        Ok(remaining.max(0) as u64)
    }

    /// Reschedule a delayed job.
    pub async fn change_delay(&self, job_id: &str, fire_at: u64) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .change_delay
            .key(keys.delayed())
            .key(keys.marker())
            .key(keys.events())
            .key(keys.meta())
            .arg(self.base_arg())
            .arg(job_id)
            .arg(fire_at)
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "changeDelay", job_id));
        }
        Ok(())
    }

    /// Change the priority of a waiting job.
    pub async fn change_priority(
        &self,
        job_id: &str,
        priority: u32,
        lifo: bool,
    ) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .change_priority
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.prioritized())
            .key(keys.priority_counter())
            .key(keys.meta())
            .key(keys.marker())
            .arg(self.base_arg())
            .arg(job_id)
            .arg(priority)
            .arg(if lifo { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "changePriority", job_id));
        }
        Ok(())
    }

    /// Pause or resume the queue.
    pub async fn pause(&self, pause: bool) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let _: i64 = self
            .catalog()
            .pause
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.meta())
            .key(keys.events())
            .key(keys.marker())
            .arg(if pause { "pause" } else { "resume" })
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Delete waiting (and optionally delayed) jobs; returns the count.
    pub async fn drain(&self, include_delayed: bool) -> Result<u64, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let removed: i64 = self
            .catalog()
            .drain
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.delayed())
            .key(keys.prioritized())
            .key(keys.meta())
            .key(keys.events())
            .arg(self.base_arg())
            .arg(if include_delayed { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;
        Ok(removed.max(0) as u64)
    }

    /// One bounded obliteration pass; `Ok(true)` means call again.
    pub async fn obliterate_pass(&self, count: u32, force: bool) -> Result<bool, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .obliterate
            .key(keys.meta())
            .key(keys.active())
            .arg(self.base_arg())
            .arg(count.max(1))
            .arg(if force { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;
        match code {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ScriptError::from_code(other, "obliterate", "")),
        }
    }

    /// Remove aged jobs from one state set; returns the removed ids.
    pub async fn clean_jobs_in_set(
        &self,
        target: CleanTarget,
        cutoff: u64,
        limit: u32,
    ) -> Result<Vec<String>, ScriptError> {
        let keys = self.keys();
        let set_key = match target {
            CleanTarget::Completed => keys.completed(),
            CleanTarget::Failed => keys.failed(),
            CleanTarget::Delayed => keys.delayed(),
            CleanTarget::Wait => keys.wait(),
            CleanTarget::Paused => keys.paused(),
        };
        let mut conn = self.connection();
        let value: Value = self
            .catalog()
            .clean_jobs_in_set
            .key(set_key)
            .key(keys.events())
            .key(keys.meta())
            .arg(self.base_arg())
            .arg(cutoff)
            .arg(limit.max(1))
            .arg(target.kind())
            .invoke_async(&mut conn)
            .await?;
        reply::string_list(&value, "cleanJobsInSet")
    }

    /// Remove a single job from whichever state set holds it.
    pub async fn remove_job(&self, job_id: &str) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .remove_job
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.active())
            .key(keys.delayed())
            .key(keys.prioritized())
            .key(keys.waiting_children())
            .key(keys.completed())
            .key(keys.failed())
            .key(keys.stalled())
            .key(keys.events())
            .key(keys.meta())
            .arg(self.base_arg())
            .arg(job_id)
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "removeJob", job_id));
        }
        Ok(())
    }

    /// Whether a job id sits in the given list, via LPOS when the server
    /// supports it and the script fallback otherwise.
    pub async fn is_job_in_list(&self, list_key: &str, job_id: &str) -> Result<bool, ScriptError> {
        let mut conn = self.connection();
        if self.supports_lpos() {
            let pos: Option<i64> = redis::cmd("LPOS")
                .arg(list_key)
                .arg(job_id)
                .query_async(&mut conn)
                .await?;
            return Ok(pos.is_some());
        }
        let found: i64 = self
            .catalog()
            .is_job_in_list
            .key(list_key)
            .arg(job_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(found == 1)
    }
}
