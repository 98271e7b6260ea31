// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group queries and cancellation.

use crate::compensation::dispatch_compensations;
use crate::queue::Queue;
use crate::QueueError;
use grist_core::clock::Clock;
use grist_core::group::{GroupJobStatus, GroupRecord, GroupState};
use grist_scripts::CancelOutcome;
use std::collections::HashMap;

/// Split a full job key `{prefix}:{queueName}:{jobId}` at the last colon.
pub fn split_job_key(full_key: &str) -> (&str, &str) {
    match full_key.rsplit_once(':') {
        Some((base, job_id)) => (base, job_id),
        None => ("", full_key),
    }
}

impl<C: Clock> Queue<C> {
    /// The group's full record.
    pub async fn get_group(&self, group_id: &str) -> Result<GroupRecord, QueueError> {
        let mut conn = self.engine().connection();
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.engine().keys().group(group_id))
            .query_async(&mut conn)
            .await?;
        if fields.is_empty() {
            return Err(QueueError::GroupNotFound(group_id.to_string()));
        }
        Ok(GroupRecord::from_hash(fields)?)
    }

    /// The group's lifecycle state.
    pub async fn get_group_state(&self, group_id: &str) -> Result<GroupState, QueueError> {
        Ok(self.get_group(group_id).await?.state)
    }

    /// Member statuses keyed by job id.
    pub async fn get_group_jobs(
        &self,
        group_id: &str,
    ) -> Result<HashMap<String, GroupJobStatus>, QueueError> {
        let mut conn = self.engine().connection();
        let members: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.engine().keys().group_jobs(group_id))
            .query_async(&mut conn)
            .await?;
        if members.is_empty() {
            return Err(QueueError::GroupNotFound(group_id.to_string()));
        }
        let mut statuses = HashMap::with_capacity(members.len());
        for (full_key, status) in members {
            let (_, job_id) = split_job_key(&full_key);
            statuses.insert(job_id.to_string(), status.parse()?);
        }
        Ok(statuses)
    }

    /// Group ids ordered by creation time.
    pub async fn get_groups(&self, start: isize, end: isize) -> Result<Vec<String>, QueueError> {
        let mut conn = self.engine().connection();
        Ok(redis::cmd("ZRANGE")
            .arg(self.engine().keys().groups_index())
            .arg(start)
            .arg(end)
            .query_async(&mut conn)
            .await?)
    }

    /// Cancel a group: pending members are dropped atomically; when any
    /// member had completed, compensations are dispatched and the group
    /// settles through COMPENSATING.
    pub async fn cancel_group(&self, group_id: &str) -> Result<GroupState, QueueError> {
        let now = self.clock().epoch_ms();
        match self.engine().cancel_group_jobs(group_id, now).await? {
            CancelOutcome::Failed => Ok(GroupState::Failed),
            CancelOutcome::AlreadyCompensating => Ok(GroupState::Compensating),
            CancelOutcome::Compensating { completed_keys } => {
                let dispatched =
                    dispatch_compensations(self.engine(), group_id, &completed_keys, now).await?;
                tracing::info!(
                    queue = %self.name(),
                    group_id,
                    dispatched,
                    "group cancelled, compensations dispatched"
                );
                Ok(GroupState::Compensating)
            }
        }
    }
}

#[cfg(test)]
#[path = "groups_tests.rs"]
mod tests;
