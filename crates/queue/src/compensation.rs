// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compensation dispatch.
//!
//! Triggered exactly once per group (script atomicity guarantees it): one
//! compensation job per completed member is enqueued into the source
//! queue's `:compensation` sibling, and the batch size is recorded on the
//! group hash so the compensation workers can settle the final state.

use crate::QueueError;
use grist_core::group::{GroupRecord, COMPENSATION_QUEUE_SUFFIX};
use grist_core::job::Job;
use grist_core::opts::JobOpts;
use grist_scripts::{AddJobArgs, StateEngine};
use serde_json::json;
use std::collections::HashMap;

/// Data field marking a job as a compensation member.
pub const COMPENSATION_FIELD: &str = "__grist_compensation";

/// Enqueue compensations for the given completed member keys; returns how
/// many were dispatched.
pub async fn dispatch_compensations(
    engine: &StateEngine,
    group_id: &str,
    completed_keys: &[String],
    now: u64,
) -> Result<u32, QueueError> {
    let mut conn = engine.connection();
    let fields: HashMap<String, String> = redis::cmd("HGETALL")
        .arg(engine.keys().group(group_id))
        .query_async(&mut conn)
        .await?;
    if fields.is_empty() {
        return Err(QueueError::GroupNotFound(group_id.to_string()));
    }
    let group = GroupRecord::from_hash(fields)?;
    let compensation = group.compensation.clone().unwrap_or_default();
    let source_queue = engine.keys().queue().to_string();

    let mut batch = Vec::new();
    for full_key in completed_keys {
        let (_, job_id) = crate::groups::split_job_key(full_key);
        let job_fields: HashMap<String, Vec<u8>> =
            redis::cmd("HGETALL").arg(full_key).query_async(&mut conn).await?;
        if job_fields.is_empty() {
            continue;
        }
        let member = Job::from_hash(&source_queue, job_id, job_fields)?;
        let Some(spec) = compensation.get(&member.name) else {
            continue;
        };

        let mut opts = JobOpts::default();
        opts.attempts = spec.attempts.unwrap_or(1);
        // Dispatch may be retried after a crash; dedup keeps it exactly-once.
        opts.deduplication_id = Some(format!("comp:{group_id}:{job_id}"));

        let data = json!({
            COMPENSATION_FIELD: true,
            "groupId": group.id,
            "groupName": group.name,
            "sourceQueue": source_queue,
            "originalJobName": member.name,
            "originalJobId": member.id,
            "originalReturnValue": member.returnvalue,
            "compensationData": spec.data,
        });
        batch.push(AddJobArgs::new(spec.name.clone(), data, opts));
    }

    let comp_engine =
        engine.sibling(&engine.keys().derived_queue_name(COMPENSATION_QUEUE_SUFFIX));
    let dispatched = batch.len() as u32;
    if dispatched > 0 {
        comp_engine.add_bulk(&batch, now).await?;
        engine.set_total_compensation_jobs(group_id, dispatched).await?;
    } else {
        // Nothing to compensate: the group settles straight to FAILED.
        engine.set_total_compensation_jobs(group_id, 0).await?;
        let _: i64 = redis::cmd("HSET")
            .arg(engine.keys().group(group_id))
            .arg("state")
            .arg("FAILED")
            .query_async(&mut conn)
            .await?;
        let _: String = redis::cmd("XADD")
            .arg(engine.keys().events())
            .arg("MAXLEN")
            .arg("~")
            .arg(10_000)
            .arg("*")
            .arg("event")
            .arg("group:failed")
            .arg("groupId")
            .arg(&group.id)
            .arg("groupName")
            .arg(&group.name)
            .query_async(&mut conn)
            .await?;
    }
    Ok(dispatched)
}
