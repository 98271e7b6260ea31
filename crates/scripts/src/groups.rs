// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Group creation and lifecycle scripts.

use crate::add::{apply_add_job, AddJobArgs};
use crate::engine::StateEngine;
use crate::reply;
use crate::ScriptError;
use grist_core::error::CoreError;
use grist_core::group::{CompensationSpec, GroupState};
use grist_core::keys::KeySpace;
use redis::Value;
use std::collections::HashMap;

/// Outcome of a group cancellation.
#[derive(Debug)]
pub enum CancelOutcome {
    /// No member had completed; the group settled to FAILED.
    Failed,
    /// Completed members need compensation; their job keys are returned.
    Compensating { completed_keys: Vec<String> },
    /// The group was already compensating; pending members were cancelled.
    AlreadyCompensating,
}

impl StateEngine {
    /// Create a group and insert its members in one atomic transaction.
    ///
    /// Member job ids must be pre-assigned by the caller so the member index
    /// can be seeded alongside the insertions. Returns the member ids in
    /// input order.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_group(
        &self,
        group_id: &str,
        group_name: &str,
        created_at: u64,
        members: &[AddJobArgs],
        compensation: Option<&HashMap<String, CompensationSpec>>,
    ) -> Result<Vec<String>, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();

        let exists: i64 = redis::cmd("EXISTS")
            .arg(keys.group(group_id))
            .query_async(&mut conn)
            .await?;
        if exists == 1 {
            return Err(CoreError::GroupExists(group_id.to_string()).into());
        }

        // EVALSHA inside MULTI cannot recover from NOSCRIPT; load up front.
        self.catalog().add_group.prepare_invoke().load_async(&mut conn).await?;
        self.catalog().add_job.prepare_invoke().load_async(&mut conn).await?;

        let compensation_json = match compensation {
            Some(map) => serde_json::to_string(map)?,
            None => String::new(),
        };

        let mut group_invocation = self.catalog().add_group.prepare_invoke();
        group_invocation
            .key(keys.group(group_id))
            .key(keys.group_jobs(group_id))
            .key(keys.groups_index())
            .arg(group_id)
            .arg(group_name)
            .arg(created_at)
            .arg(members.len())
            .arg(compensation_json);
        for member in members {
            let id = member.opts.job_id.as_deref().unwrap_or("");
            group_invocation.arg(keys.job(id));
        }

        let mut member_invocations = Vec::with_capacity(members.len());
        for member in members {
            member.opts.validate()?;
            let mut invocation = self.catalog().add_job.prepare_invoke();
            apply_add_job(&mut invocation, self, member, created_at)?;
            member_invocations.push(invocation);
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.invoke_script(&group_invocation);
        for invocation in &member_invocations {
            pipe.invoke_script(invocation);
        }
        let replies: Vec<Value> = pipe.query_async(&mut conn).await?;

        if replies.first().and_then(reply::as_int) == Some(0) {
            return Err(CoreError::GroupExists(group_id.to_string()).into());
        }
        Ok(replies.iter().skip(1).filter_map(reply::as_string).collect())
    }

    /// Cancel a group's pending members and settle its state.
    pub async fn cancel_group_jobs(
        &self,
        group_id: &str,
        now: u64,
    ) -> Result<CancelOutcome, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let value: Value = self
            .catalog()
            .cancel_group_jobs
            .key(keys.group(group_id))
            .key(keys.group_jobs(group_id))
            .key(keys.wait())
            .key(keys.paused())
            .key(keys.delayed())
            .key(keys.prioritized())
            .key(keys.events())
            .key(keys.meta())
            .arg(now)
            .invoke_async(&mut conn)
            .await?;

        if let Some(code) = reply::as_int(&value).filter(|n| *n < 0) {
            return Err(ScriptError::from_code(code, "cancelGroup", group_id));
        }
        let items =
            reply::as_array(&value).ok_or_else(|| reply::unexpected("cancelGroup", &value))?;
        match items.first().and_then(reply::as_int).unwrap_or(0) {
            4 => Ok(CancelOutcome::Compensating {
                completed_keys: items.iter().skip(1).filter_map(reply::as_string).collect(),
            }),
            0 => {
                let state: Option<String> = redis::cmd("HGET")
                    .arg(keys.group(group_id))
                    .arg("state")
                    .query_async(&mut conn)
                    .await?;
                if state.as_deref() == Some("COMPENSATING") {
                    Ok(CancelOutcome::AlreadyCompensating)
                } else {
                    Ok(CancelOutcome::Failed)
                }
            }
            _ => Err(reply::unexpected("cancelGroup", &value)),
        }
    }

    /// Record one compensation outcome against a group that may live in a
    /// sibling queue's keyspace; returns the resulting group state.
    pub async fn update_group_compensation(
        &self,
        source: &KeySpace,
        group_id: &str,
        succeeded: bool,
        now: u64,
    ) -> Result<GroupState, ScriptError> {
        let mut conn = self.connection();
        let value: Value = self
            .catalog()
            .update_group_compensation
            .key(source.group(group_id))
            .key(source.events())
            .key(source.meta())
            .arg(if succeeded { "ok" } else { "fail" })
            .arg(now)
            .invoke_async(&mut conn)
            .await?;

        if let Some(code) = reply::as_int(&value).filter(|n| *n < 0) {
            return Err(ScriptError::from_code(code, "updateGroupCompensation", group_id));
        }
        let state = reply::as_string(&value)
            .ok_or_else(|| reply::unexpected("updateGroupCompensation", &value))?;
        Ok(state.parse()?)
    }

    /// Record the size of a dispatched compensation batch.
    pub async fn set_total_compensation_jobs(
        &self,
        group_id: &str,
        total: u32,
    ) -> Result<(), ScriptError> {
        let mut conn = self.connection();
        let _: i64 = redis::cmd("HSET")
            .arg(self.keys().group(group_id))
            .arg("totalCompensationJobs")
            .arg(total)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
