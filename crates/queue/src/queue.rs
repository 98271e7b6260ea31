// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client-side producer and admin surface. Every mutation goes through
//! one state-engine script; reads use plain commands.

use crate::QueueError;
use grist_conn::{connect, probe_server, ConnOptions};
use grist_core::clock::{Clock, SystemClock};
use grist_core::job::{Job, JobState};
use grist_core::keys::{KeySpace, DEFAULT_PREFIX};
use grist_core::opts::JobOpts;
use grist_scripts::{AddJobArgs, CleanTarget, StateEngine};
use serde_json::Value;
use std::collections::HashMap;

/// Queue construction options.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub prefix: String,
    /// Wrap the queue name as a hash tag for cluster deployments.
    pub clustered: bool,
    pub conn: ConnOptions,
    /// Dead-letter queue this queue's failures are routed to, when any.
    pub dead_letter_queue: Option<String>,
    /// Options merged under each added job's own options.
    pub default_job_opts: JobOpts,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            prefix: grist_conn::env::test_prefix()
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            clustered: false,
            conn: ConnOptions::default(),
            dead_letter_queue: None,
            default_job_opts: JobOpts::default(),
        }
    }
}

impl QueueOptions {
    grist_core::setters! {
        into {
            prefix: String,
        }
        set {
            clustered: bool,
            conn: ConnOptions,
            default_job_opts: JobOpts,
        }
        option {
            dead_letter_queue: String,
        }
    }

    fn validate(&self) -> Result<(), QueueError> {
        if let Some(dlq) = &self.dead_letter_queue {
            if dlq.is_empty() {
                return Err(QueueError::Core(grist_core::error::CoreError::InvalidOptions(
                    "dead letter queue name cannot be empty".into(),
                )));
            }
        }
        Ok(())
    }
}

/// Per-pass bounds for queue obliteration.
#[derive(Debug, Clone, Copy)]
pub struct ObliterateOpts {
    pub force: bool,
    /// Jobs deleted per pass.
    pub count: u32,
}

impl Default for ObliterateOpts {
    fn default() -> Self {
        Self { force: false, count: 1000 }
    }
}

/// Counts per state, as returned by [`Queue::get_counts`].
pub type JobCounts = HashMap<JobState, u64>;

/// Finished-job metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    /// Total finished jobs recorded.
    pub count: u64,
    /// Per-minute counts, newest first, bounded by `max_data_points`.
    pub data_points: Vec<u64>,
}

/// A named work pool backed by the shared state engine.
pub struct Queue<C: Clock = SystemClock> {
    name: String,
    engine: StateEngine,
    options: QueueOptions,
    clock: C,
}

impl Queue<SystemClock> {
    /// Connect and build a queue with the system clock.
    pub async fn connect(
        name: impl Into<String>,
        options: QueueOptions,
    ) -> Result<Self, QueueError> {
        Self::connect_with_clock(name, options, SystemClock).await
    }
}

impl<C: Clock> Queue<C> {
    pub async fn connect_with_clock(
        name: impl Into<String>,
        options: QueueOptions,
        clock: C,
    ) -> Result<Self, QueueError> {
        options.validate()?;
        let name = name.into();
        let mut conn = connect(&options.conn).await?;
        let version = probe_server(&mut conn).await?;
        let keys = if options.clustered {
            KeySpace::clustered(&options.prefix, &name)
        } else {
            KeySpace::new(&options.prefix, &name)
        };
        let engine = StateEngine::new(conn, keys, version.supports_lpos());
        Ok(Self { name, engine, options, clock })
    }

    /// Build a queue over an existing engine (shares its connection).
    pub fn with_engine(engine: StateEngine, options: QueueOptions, clock: C) -> Self {
        Self { name: engine.keys().queue().to_string(), engine, options, clock }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &StateEngine {
        &self.engine
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    fn merged_opts(&self, opts: JobOpts) -> JobOpts {
        // Explicit per-job options win; queue defaults fill the rest only
        // when the caller left them at their defaults.
        let defaults = &self.options.default_job_opts;
        let baseline = JobOpts::default();
        let mut merged = opts;
        if merged.attempts == baseline.attempts {
            merged.attempts = defaults.attempts;
        }
        if merged.backoff.is_none() {
            merged.backoff = defaults.backoff.clone();
        }
        if merged.remove_on_complete.is_none() {
            merged.remove_on_complete = defaults.remove_on_complete.clone();
        }
        if merged.remove_on_fail.is_none() {
            merged.remove_on_fail = defaults.remove_on_fail.clone();
        }
        merged
    }

    // -- producing --

    /// Add one job; returns its id.
    pub async fn add(
        &self,
        name: impl Into<String>,
        data: Value,
        opts: JobOpts,
    ) -> Result<String, QueueError> {
        let args = AddJobArgs::new(name, data, self.merged_opts(opts));
        let id = self.engine.add_job(&args, self.clock.epoch_ms()).await?;
        tracing::debug!(queue = %self.name, job_id = %id, job_name = %args.name, "added");
        Ok(id)
    }

    /// Add a batch atomically; returns the ids in input order.
    pub async fn add_bulk(
        &self,
        jobs: Vec<(String, Value, JobOpts)>,
    ) -> Result<Vec<String>, QueueError> {
        let args: Vec<AddJobArgs> = jobs
            .into_iter()
            .map(|(name, data, opts)| AddJobArgs::new(name, data, self.merged_opts(opts)))
            .collect();
        let ids = self.engine.add_bulk(&args, self.clock.epoch_ms()).await?;
        tracing::debug!(queue = %self.name, count = ids.len(), "added bulk");
        Ok(ids)
    }

    // -- queue-wide operations --

    pub async fn pause(&self) -> Result<(), QueueError> {
        Ok(self.engine.pause(true).await?)
    }

    pub async fn resume(&self) -> Result<(), QueueError> {
        Ok(self.engine.pause(false).await?)
    }

    pub async fn is_paused(&self) -> Result<bool, QueueError> {
        let mut conn = self.engine.connection();
        let paused: bool = redis::cmd("HEXISTS")
            .arg(self.engine.keys().meta())
            .arg("paused")
            .query_async(&mut conn)
            .await?;
        Ok(paused)
    }

    /// Delete waiting jobs; `include_delayed` extends to the delayed set.
    pub async fn drain(&self, include_delayed: bool) -> Result<u64, QueueError> {
        Ok(self.engine.drain(include_delayed).await?)
    }

    /// Destroy the queue completely, looping bounded passes.
    pub async fn obliterate(&self, opts: ObliterateOpts) -> Result<(), QueueError> {
        while self.engine.obliterate_pass(opts.count, opts.force).await? {}
        Ok(())
    }

    // -- inspection --

    /// Fetch a job view by id.
    pub async fn get_job(&self, job_id: &str) -> Result<Option<Job>, QueueError> {
        let mut conn = self.engine.connection();
        let fields: HashMap<String, Vec<u8>> = redis::cmd("HGETALL")
            .arg(self.engine.keys().job(job_id))
            .query_async(&mut conn)
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Job::from_hash(&self.name, job_id, fields)?))
    }

    /// Which state set currently holds the job.
    pub async fn get_state(&self, job_id: &str) -> Result<Option<JobState>, QueueError> {
        let keys = self.engine.keys();
        let mut conn = self.engine.connection();

        let (completed, failed, delayed, prioritized, waiting_children): (
            Option<f64>,
            Option<f64>,
            Option<f64>,
            Option<f64>,
            bool,
        ) = redis::pipe()
            .cmd("ZSCORE").arg(keys.completed()).arg(job_id)
            .cmd("ZSCORE").arg(keys.failed()).arg(job_id)
            .cmd("ZSCORE").arg(keys.delayed()).arg(job_id)
            .cmd("ZSCORE").arg(keys.prioritized()).arg(job_id)
            .cmd("SISMEMBER").arg(keys.waiting_children()).arg(job_id)
            .query_async(&mut conn)
            .await?;

        if completed.is_some() {
            return Ok(Some(JobState::Completed));
        }
        if failed.is_some() {
            return Ok(Some(JobState::Failed));
        }
        if delayed.is_some() {
            return Ok(Some(JobState::Delayed));
        }
        if prioritized.is_some() {
            return Ok(Some(JobState::Prioritized));
        }
        if waiting_children {
            return Ok(Some(JobState::WaitingChildren));
        }
        for (key, state) in [
            (keys.active(), JobState::Active),
            (keys.wait(), JobState::Wait),
            (keys.paused(), JobState::Paused),
        ] {
            if self.engine.is_job_in_list(&key, job_id).await? {
                return Ok(Some(state));
            }
        }
        Ok(None)
    }

    /// Job views for one state, by range.
    pub async fn get_jobs(
        &self,
        state: JobState,
        start: isize,
        end: isize,
    ) -> Result<Vec<Job>, QueueError> {
        let keys = self.engine.keys();
        let mut conn = self.engine.connection();
        let ids: Vec<String> = match state {
            JobState::Completed | JobState::Failed | JobState::Delayed
            | JobState::Prioritized => {
                let key = match state {
                    JobState::Completed => keys.completed(),
                    JobState::Failed => keys.failed(),
                    JobState::Delayed => keys.delayed(),
                    _ => keys.prioritized(),
                };
                redis::cmd("ZRANGE").arg(key).arg(start).arg(end).query_async(&mut conn).await?
            }
            JobState::Wait | JobState::Paused | JobState::Active => {
                let key = match state {
                    JobState::Wait => keys.wait(),
                    JobState::Paused => keys.paused(),
                    _ => keys.active(),
                };
                redis::cmd("LRANGE").arg(key).arg(start).arg(end).query_async(&mut conn).await?
            }
            JobState::WaitingChildren => {
                let members: Vec<String> = redis::cmd("SMEMBERS")
                    .arg(keys.waiting_children())
                    .query_async(&mut conn)
                    .await?;
                members
            }
        };

        let mut jobs = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(job) = self.get_job(id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Counts for the requested states.
    pub async fn get_counts(&self, states: &[JobState]) -> Result<JobCounts, QueueError> {
        let keys = self.engine.keys();
        let mut conn = self.engine.connection();
        let mut counts = JobCounts::new();
        for state in states {
            let count: u64 = match state {
                JobState::Wait => {
                    redis::cmd("LLEN").arg(keys.wait()).query_async(&mut conn).await?
                }
                JobState::Paused => {
                    redis::cmd("LLEN").arg(keys.paused()).query_async(&mut conn).await?
                }
                JobState::Active => {
                    redis::cmd("LLEN").arg(keys.active()).query_async(&mut conn).await?
                }
                JobState::Delayed => {
                    redis::cmd("ZCARD").arg(keys.delayed()).query_async(&mut conn).await?
                }
                JobState::Prioritized => {
                    redis::cmd("ZCARD").arg(keys.prioritized()).query_async(&mut conn).await?
                }
                JobState::WaitingChildren => {
                    redis::cmd("SCARD").arg(keys.waiting_children()).query_async(&mut conn).await?
                }
                JobState::Completed => {
                    redis::cmd("ZCARD").arg(keys.completed()).query_async(&mut conn).await?
                }
                JobState::Failed => {
                    redis::cmd("ZCARD").arg(keys.failed()).query_async(&mut conn).await?
                }
            };
            counts.insert(*state, count);
        }
        Ok(counts)
    }

    /// Counts of prioritized jobs per priority value.
    pub async fn get_counts_per_priority(
        &self,
        priorities: &[u32],
    ) -> Result<HashMap<u32, u64>, QueueError> {
        const PRIORITY_STRIDE: u64 = 1 << 32;
        let keys = self.engine.keys();
        let mut conn = self.engine.connection();
        let mut counts = HashMap::new();
        for &priority in priorities {
            let lo = (priority as u64).saturating_mul(PRIORITY_STRIDE);
            let hi = (priority as u64 + 1).saturating_mul(PRIORITY_STRIDE);
            let count: u64 = redis::cmd("ZCOUNT")
                .arg(keys.prioritized())
                .arg(lo)
                .arg(format!("({hi}"))
                .query_async(&mut conn)
                .await?;
            counts.insert(priority, count);
        }
        Ok(counts)
    }

    /// Metrics for one finished set ("completed" or "failed").
    pub async fn get_metrics(&self, target: &str) -> Result<Metrics, QueueError> {
        let keys = self.engine.keys();
        let mut conn = self.engine.connection();
        let metrics_key = keys.metrics(target);
        let (count, data_points): (Option<u64>, Vec<u64>) = redis::pipe()
            .cmd("HGET").arg(format!("{metrics_key}:meta")).arg("count")
            .cmd("LRANGE").arg(&metrics_key).arg(0).arg(-1)
            .query_async(&mut conn)
            .await?;
        Ok(Metrics { count: count.unwrap_or(0), data_points })
    }

    // -- operator actions --

    pub async fn retry_job(&self, job_id: &str, lifo: bool) -> Result<(), QueueError> {
        Ok(self.engine.retry_job(job_id, lifo).await?)
    }

    /// Requeue all failed jobs, looping batches until none remain.
    pub async fn retry_jobs(&self, batch: u32) -> Result<(), QueueError> {
        while self.engine.retry_jobs(batch).await? > 0 {}
        Ok(())
    }

    pub async fn promote(&self, job_id: &str) -> Result<(), QueueError> {
        Ok(self.engine.promote(job_id).await?)
    }

    /// Promote all delayed jobs, looping batches until none remain.
    pub async fn promote_jobs(&self, batch: u32) -> Result<(), QueueError> {
        while self.engine.promote_jobs(batch).await? > 0 {}
        Ok(())
    }

    pub async fn change_delay(&self, job_id: &str, delay_ms: u64) -> Result<(), QueueError> {
        Ok(self.engine.change_delay(job_id, self.clock.fire_at(delay_ms)).await?)
    }

    pub async fn change_priority(
        &self,
        job_id: &str,
        priority: u32,
        lifo: bool,
    ) -> Result<(), QueueError> {
        Ok(self.engine.change_priority(job_id, priority, lifo).await?)
    }

    /// Remove aged jobs from a state set; returns the removed ids.
    pub async fn clean(
        &self,
        target: CleanTarget,
        grace_ms: u64,
        limit: u32,
    ) -> Result<Vec<String>, QueueError> {
        let cutoff = self.clock.cutoff(grace_ms);
        Ok(self.engine.clean_jobs_in_set(target, cutoff, limit).await?)
    }

    pub async fn remove(&self, job_id: &str) -> Result<(), QueueError> {
        Ok(self.engine.remove_job(job_id).await?)
    }

    pub async fn update_progress(
        &self,
        job_id: &str,
        progress: &Value,
    ) -> Result<(), QueueError> {
        Ok(self.engine.update_progress(job_id, progress).await?)
    }

    /// Append a log row to a job; returns the resulting log length.
    pub async fn add_job_log(&self, job_id: &str, row: &str) -> Result<u64, QueueError> {
        let keep = self.options.default_job_opts.keep_logs;
        Ok(self.engine.add_log(job_id, row, keep).await?)
    }

    /// The job's bounded log list, oldest first.
    pub async fn get_job_logs(&self, job_id: &str) -> Result<Vec<String>, QueueError> {
        let mut conn = self.engine.connection();
        Ok(redis::cmd("LRANGE")
            .arg(self.engine.keys().logs(job_id))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?)
    }
}

impl<C: Clock> std::fmt::Debug for Queue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("base", &self.engine.keys().base())
            .finish()
    }
}
