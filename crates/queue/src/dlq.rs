// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead-letter queue inspection and replay.
//!
//! A DLQ is itself a queue; its jobs carry provenance under `_dlqMeta`.
//! Replay rebuilds the original job on the source queue with a fresh id and
//! a clean attempt counter, then removes the dead letter.

use crate::queue::Queue;
use crate::QueueError;
use grist_core::clock::Clock;
use grist_core::job::Job;
use grist_scripts::{AddJobArgs, StateEngine};
use std::collections::HashMap;

/// Filter for replay/purge sweeps.
#[derive(Debug, Clone, Default)]
pub struct DlqFilter {
    /// Exact original job name.
    pub name: Option<String>,
    /// Case-insensitive substring of the recorded failure reason.
    pub failed_reason: Option<String>,
}

impl DlqFilter {
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(name) = &self.name {
            if job.name != *name {
                return false;
            }
        }
        if let Some(fragment) = &self.failed_reason {
            let reason = job
                .dlq_meta()
                .map(|meta| meta.failed_reason)
                .or_else(|| job.failed_reason.clone())
                .unwrap_or_default();
            if !reason.to_lowercase().contains(&fragment.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Result of a replay or purge sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Jobs replayed (or purged).
    pub processed: u32,
    /// Jobs that did not match the filter.
    pub skipped: u32,
}

impl<C: Clock> Queue<C> {
    fn dlq_engine(&self) -> Result<StateEngine, QueueError> {
        let name = self
            .options()
            .dead_letter_queue
            .as_deref()
            .ok_or(QueueError::NotConfigured("dead letter queue"))?;
        Ok(self.engine().sibling(name))
    }

    async fn dlq_job_ids(&self, dlq: &StateEngine) -> Result<Vec<String>, QueueError> {
        let keys = dlq.keys();
        let mut conn = dlq.connection();
        let (mut wait, paused): (Vec<String>, Vec<String>) = redis::pipe()
            .cmd("LRANGE").arg(keys.wait()).arg(0).arg(-1)
            .cmd("LRANGE").arg(keys.paused()).arg(0).arg(-1)
            .query_async(&mut conn)
            .await?;
        wait.extend(paused);
        Ok(wait)
    }

    async fn dlq_job(&self, dlq: &StateEngine, job_id: &str) -> Result<Option<Job>, QueueError> {
        let mut conn = dlq.connection();
        let fields: HashMap<String, Vec<u8>> = redis::cmd("HGETALL")
            .arg(dlq.keys().job(job_id))
            .query_async(&mut conn)
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Job::from_hash(dlq.keys().queue(), job_id, fields)?))
    }

    /// Number of jobs parked on the configured DLQ.
    pub async fn get_dead_letter_count(&self) -> Result<u64, QueueError> {
        let dlq = self.dlq_engine()?;
        let keys = dlq.keys();
        let mut conn = dlq.connection();
        let (wait, paused, delayed, prioritized): (u64, u64, u64, u64) = redis::pipe()
            .cmd("LLEN").arg(keys.wait())
            .cmd("LLEN").arg(keys.paused())
            .cmd("ZCARD").arg(keys.delayed())
            .cmd("ZCARD").arg(keys.prioritized())
            .query_async(&mut conn)
            .await?;
        Ok(wait + paused + delayed + prioritized)
    }

    /// Dead letters by position range.
    pub async fn get_dead_letter_jobs(
        &self,
        start: isize,
        end: isize,
    ) -> Result<Vec<Job>, QueueError> {
        let dlq = self.dlq_engine()?;
        let ids = self.dlq_job_ids(&dlq).await?;
        let lo = start.max(0) as usize;
        let hi = if end < 0 {
            ids.len()
        } else {
            (end as usize + 1).min(ids.len())
        };
        let mut jobs = Vec::new();
        for id in ids.get(lo..hi).unwrap_or(&[]) {
            if let Some(job) = self.dlq_job(&dlq, id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Inspect one dead letter without touching it.
    pub async fn peek_dead_letter(&self, job_id: &str) -> Result<Option<Job>, QueueError> {
        let dlq = self.dlq_engine()?;
        self.dlq_job(&dlq, job_id).await
    }

    /// Replay one dead letter onto this queue; returns the new job id.
    pub async fn replay_dead_letter(&self, job_id: &str) -> Result<String, QueueError> {
        let dlq = self.dlq_engine()?;
        let job = self
            .dlq_job(&dlq, job_id)
            .await?
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        let new_id = self.replay_one(&dlq, &job).await?;
        Ok(new_id)
    }

    async fn replay_one(&self, dlq: &StateEngine, job: &Job) -> Result<String, QueueError> {
        let mut opts = job
            .dlq_meta()
            .map(|meta| meta.original_opts)
            .unwrap_or_else(|| job.opts.clone());
        // Fresh identity and a clean retry budget on the source queue.
        opts.job_id = None;
        opts.deduplication_id = None;
        let args = AddJobArgs::new(job.name.clone(), job.data_without_dlq_meta(), opts);
        let new_id = self.engine().add_job(&args, self.clock().epoch_ms()).await?;
        dlq.remove_job(&job.id).await?;
        tracing::info!(
            queue = %self.name(),
            dlq = %dlq.keys().queue(),
            dead_letter_id = %job.id,
            new_job_id = %new_id,
            "replayed dead letter"
        );
        Ok(new_id)
    }

    /// Replay every dead letter matching the filter.
    pub async fn replay_all_dead_letters(
        &self,
        filter: &DlqFilter,
    ) -> Result<ReplayReport, QueueError> {
        let dlq = self.dlq_engine()?;
        let mut report = ReplayReport::default();
        for id in self.dlq_job_ids(&dlq).await? {
            let Some(job) = self.dlq_job(&dlq, &id).await? else {
                continue;
            };
            if filter.matches(&job) {
                self.replay_one(&dlq, &job).await?;
                report.processed += 1;
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }

    /// Delete every dead letter matching the filter.
    pub async fn purge_dead_letters(
        &self,
        filter: &DlqFilter,
    ) -> Result<ReplayReport, QueueError> {
        let dlq = self.dlq_engine()?;
        let mut report = ReplayReport::default();
        for id in self.dlq_job_ids(&dlq).await? {
            let Some(job) = self.dlq_job(&dlq, &id).await? else {
                continue;
            };
            if filter.matches(&job) {
                dlq.remove_job(&id).await?;
                report.processed += 1;
            } else {
                report.skipped += 1;
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "dlq_tests.rs"]
mod tests;
