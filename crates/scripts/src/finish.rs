// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finalization transitions: completed/failed, delayed retries, parking.

use crate::engine::{parent_policy, StateEngine};
use crate::fetch::{decode_fetch, FetchResult};
use crate::reply;
use crate::ScriptError;
use grist_core::job::Job;
use grist_core::opts::RateLimit;
use redis::Value;

/// Which finished set the job lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishTarget {
    Completed,
    Failed,
}

impl FinishTarget {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Per-call finalization parameters, derived by the worker from the job's
/// options and its own configuration.
#[derive(Debug, Clone)]
pub struct FinishSpec {
    pub target: FinishTarget,
    /// JSON returnvalue for completed, failure reason for failed.
    pub result: String,
    /// JSON stacktrace ring ("" leaves the stored one).
    pub stacktrace: String,
    /// Keep-count semantics: negative keeps all, zero removes immediately.
    pub keep_count: i64,
    /// Age-based pruning in seconds, 0 disables.
    pub keep_age: u64,
    /// Attempt an inline fetch after finalizing.
    pub fetch_next: bool,
    /// When set on a failed finish, the terminal event is `deadLettered`.
    pub dead_letter_queue: Option<String>,
}

/// Worker-level arguments shared by every finish call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeArgs {
    pub lock_duration_ms: u64,
    /// Metrics data-point bound; 0 disables metric collection.
    pub metrics_max_points: u32,
    pub limiter: Option<RateLimit>,
}

/// Outcome of a finalization.
#[derive(Debug)]
pub enum FinishOutcome {
    Done,
    /// The job's group entered COMPENSATING; the caller must enqueue one
    /// compensation job per completed member key.
    Compensation { completed_keys: Vec<String> },
    /// Inline fetch-next outcome.
    Next(FetchResult),
}

impl StateEngine {
    /// Finalize an attempt for a job currently held under `token`.
    pub async fn move_to_finished(
        &self,
        job: &Job,
        token: &str,
        now: u64,
        spec: &FinishSpec,
        runtime: &RuntimeArgs,
    ) -> Result<FinishOutcome, ScriptError> {
        let keys = self.keys();
        let target_set = match spec.target {
            FinishTarget::Completed => keys.completed(),
            FinishTarget::Failed => keys.failed(),
        };
        let dedup_id = job.opts.deduplication_id.as_deref().unwrap_or("");
        let group_id = job.opts.group.as_ref().map(|g| g.id.as_str()).unwrap_or("");
        let (group_key, group_jobs_key) = if group_id.is_empty() {
            (keys.meta(), keys.meta())
        } else {
            (keys.group(group_id), keys.group_jobs(group_id))
        };

        let mut conn = self.connection();
        let value: Value = self
            .catalog()
            .move_to_finished
            .key(keys.wait())
            .key(keys.active())
            .key(keys.prioritized())
            .key(keys.events())
            .key(keys.stalled())
            .key(keys.limiter())
            .key(keys.delayed())
            .key(keys.paused())
            .key(keys.meta())
            .key(keys.priority_counter())
            .key(keys.marker())
            .key(target_set)
            .key(keys.metrics(spec.target.as_str()))
            .key(if dedup_id.is_empty() { keys.meta() } else { keys.dedup(dedup_id) })
            .key(group_key)
            .key(group_jobs_key)
            .arg(self.base_arg())
            .arg(&job.id)
            .arg(token)
            .arg(now)
            .arg(spec.target.as_str())
            .arg(&spec.result)
            .arg(&spec.stacktrace)
            .arg(spec.keep_count)
            .arg(spec.keep_age)
            .arg(if spec.fetch_next { "1" } else { "0" })
            .arg(runtime.lock_duration_ms)
            .arg(runtime.metrics_max_points)
            .arg(dedup_id)
            .arg(group_id)
            .arg(spec.dead_letter_queue.as_deref().unwrap_or(""))
            .arg(runtime.limiter.map(|l| l.max).unwrap_or(0))
            .arg(runtime.limiter.map(|l| l.duration_ms).unwrap_or(0))
            .arg(parent_policy(&job.opts))
            .invoke_async(&mut conn)
            .await?;

        if let Some(code) = reply::as_int(&value).filter(|n| *n < 0) {
            return Err(ScriptError::from_code(code, "moveToFinished", job.id.clone()));
        }
        let items =
            reply::as_array(&value).ok_or_else(|| reply::unexpected("moveToFinished", &value))?;
        let tag = items.first().and_then(reply::as_int).unwrap_or(0);
        if tag == 4 {
            let completed_keys = items.iter().skip(1).filter_map(reply::as_string).collect();
            return Ok(FinishOutcome::Compensation { completed_keys });
        }
        if spec.fetch_next {
            return Ok(FinishOutcome::Next(decode_fetch(value, keys.queue(), "moveToFinished")?));
        }
        Ok(FinishOutcome::Done)
    }

    /// Move an active job into the delayed set for a later retry.
    #[allow(clippy::too_many_arguments)]
    pub async fn move_to_delayed(
        &self,
        job_id: &str,
        token: &str,
        fire_at: u64,
        skip_attempt: bool,
        data: Option<&serde_json::Value>,
        failed_reason: &str,
        stacktrace: &str,
    ) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .move_to_delayed
            .key(keys.active())
            .key(keys.delayed())
            .key(keys.stalled())
            .key(keys.events())
            .key(keys.meta())
            .key(keys.marker())
            .arg(self.base_arg())
            .arg(job_id)
            .arg(token)
            .arg(fire_at)
            .arg(if skip_attempt { "1" } else { "0" })
            .arg(data.map(serde_json::to_string).transpose()?.unwrap_or_default())
            .arg(failed_reason)
            .arg(stacktrace)
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "moveToDelayed", job_id));
        }
        Ok(())
    }

    /// Park an active parent until its dependencies resolve.
    ///
    /// Returns `true` when parked; `false` means no dependencies remain and
    /// the caller should keep processing.
    pub async fn move_to_waiting_children(
        &self,
        job_id: &str,
        token: &str,
    ) -> Result<bool, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .move_to_waiting_children
            .key(keys.active())
            .key(keys.waiting_children())
            .key(keys.stalled())
            .arg(self.base_arg())
            .arg(job_id)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;
        match code {
            0 => Ok(true),
            1 => Ok(false),
            other => Err(ScriptError::from_code(other, "moveToWaitingChildren", job_id)),
        }
    }

    /// Detach a child from its parent without settling it.
    pub async fn remove_child_dependency(
        &self,
        child_job_id: &str,
        parent_key: &str,
    ) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .remove_child_dependency
            .arg(keys.job(child_job_id))
            .arg(parent_key)
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "removeChildDependency", child_job_id));
        }
        Ok(())
    }

    /// Record job progress and publish the event.
    pub async fn update_progress(
        &self,
        job_id: &str,
        progress: &serde_json::Value,
    ) -> Result<(), ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let code: i64 = self
            .catalog()
            .update_progress
            .key(keys.job(job_id))
            .key(keys.events())
            .key(keys.meta())
            .arg(job_id)
            .arg(serde_json::to_string(progress)?)
            .invoke_async(&mut conn)
            .await?;
        if code < 0 {
            return Err(ScriptError::from_code(code, "updateProgress", job_id));
        }
        Ok(())
    }

    /// Append to the bounded per-job log; returns the resulting length.
    pub async fn add_log(
        &self,
        job_id: &str,
        row: &str,
        keep_logs: u64,
    ) -> Result<u64, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let count: i64 = self
            .catalog()
            .add_log
            .key(keys.logs(job_id))
            .arg(row)
            .arg(keep_logs)
            .invoke_async(&mut conn)
            .await?;
        Ok(count.max(0) as u64)
    }
}
