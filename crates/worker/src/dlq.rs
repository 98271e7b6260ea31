// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead-letter routing.
//!
//! Exhausted or unrecoverable failures are copied onto the configured DLQ
//! with provenance before the source job is finalized. The enqueue runs
//! first so a crash between the two steps resurfaces as a stall and
//! retries the routing; the deterministic dedup id keeps it single-shot.

use crate::WorkerError;
use grist_core::job::{DlqMeta, Job, DLQ_META_FIELD};
use grist_core::opts::JobOpts;
use grist_scripts::{AddJobArgs, StateEngine};
use serde_json::Value;

/// Build the dead-letter copy of `job`.
///
/// `job` must already carry this attempt's failure (reason and stacktrace
/// ring) and `attempts_made` counting the current attempt.
pub fn dead_letter_payload(job: &Job, source_queue: &str, now: u64) -> (Value, JobOpts) {
    let meta = DlqMeta {
        source_queue: source_queue.to_string(),
        original_job_id: job.id.clone(),
        failed_reason: job.failed_reason.clone().unwrap_or_default(),
        stacktrace: job.stacktrace.clone(),
        attempts_made: job.attempts_made,
        dead_lettered_at: now,
        original_timestamp: job.timestamp,
        original_opts: job.opts.clone(),
    };

    let mut data = match &job.data {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = serde_json::Map::new();
            if !other.is_null() {
                map.insert("payload".to_string(), other.clone());
            }
            map
        }
    };
    // Serialization of DlqMeta cannot fail: every field is a plain value.
    data.insert(
        DLQ_META_FIELD.to_string(),
        serde_json::to_value(&meta).unwrap_or(Value::Null),
    );

    let mut opts = JobOpts::default();
    // Routing may rerun after a stall; the dedup marker keeps one copy.
    opts.deduplication_id = Some(format!("dlq:{source_queue}:{}", job.id));

    (Value::Object(data), opts)
}

/// Enqueue the dead-letter copy of `job`; returns the DLQ job id.
pub async fn route_to_dlq(
    engine: &StateEngine,
    dlq_name: &str,
    job: &Job,
    now: u64,
) -> Result<String, WorkerError> {
    let source_queue = engine.keys().queue().to_string();
    let (data, opts) = dead_letter_payload(job, &source_queue, now);

    let dlq_engine = engine.sibling(dlq_name);
    let args = AddJobArgs::new(job.name.clone(), data, opts);
    let dlq_id = dlq_engine.add_job(&args, now).await?;
    tracing::warn!(
        queue = %source_queue,
        job_id = %job.id,
        dlq = dlq_name,
        dlq_job_id = %dlq_id,
        reason = %job.failed_reason.as_deref().unwrap_or(""),
        "dead lettered"
    );
    Ok(dlq_id)
}

#[cfg(test)]
#[path = "dlq_tests.rs"]
mod tests;
