// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fetch-side transitions: acquiring jobs, renewing locks, stall recovery.

use crate::engine::StateEngine;
use crate::reply;
use crate::ScriptError;
use grist_core::job::Job;
use grist_core::opts::RateLimit;
use redis::Value;

/// Outcome of a fetch attempt.
#[derive(Debug)]
pub enum FetchResult {
    /// Nothing ready and nothing scheduled.
    None,
    /// The rate limiter is saturated for another `ttl_ms`.
    RateLimited { ttl_ms: u64 },
    /// Only delayed work remains; the earliest fires at `fire_at`.
    NextDelayed { fire_at: u64 },
    /// A job was acquired under the caller's lock token.
    Job(Box<Job>),
}

/// Result of one stall-recovery pass.
#[derive(Debug, Default)]
pub struct StalledReport {
    /// Jobs failed with the stall-limit reason.
    pub failed: Vec<String>,
    /// Jobs returned to the ready structures.
    pub recovered: Vec<String>,
    /// `(groupId, completed member keys)` for groups this pass moved into
    /// COMPENSATING.
    pub compensations: Vec<(String, Vec<String>)>,
}

pub(crate) fn decode_fetch(
    value: Value,
    queue: &str,
    command: &'static str,
) -> Result<FetchResult, ScriptError> {
    if let Some(code) = reply::as_int(&value).filter(|n| *n < 0) {
        return Err(ScriptError::from_code(code, command, ""));
    }
    let items = reply::as_array(&value).ok_or_else(|| reply::unexpected(command, &value))?;
    let tag = items.first().and_then(reply::as_int).unwrap_or(0);
    match tag {
        0 => Ok(FetchResult::None),
        2 => {
            let ttl_ms = items.get(1).and_then(reply::as_int).unwrap_or(0).max(0) as u64;
            Ok(FetchResult::RateLimited { ttl_ms })
        }
        3 => {
            let fire_at = items.get(1).and_then(reply::as_int).unwrap_or(0).max(0) as u64;
            Ok(FetchResult::NextDelayed { fire_at })
        }
        1 => Ok(FetchResult::Job(Box::new(reply::job_from_reply(queue, items, command)?))),
        _ => Err(reply::unexpected(command, &value)),
    }
}

impl StateEngine {
    /// Attempt to take the next ready job.
    pub async fn move_to_active(
        &self,
        token: &str,
        lock_duration_ms: u64,
        now: u64,
        limiter: Option<RateLimit>,
    ) -> Result<FetchResult, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let value: Value = self
            .catalog()
            .move_to_active
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
            .arg(self.base_arg())
            .arg(token)
            .arg(lock_duration_ms)
            .arg(now)
            .arg(limiter.map(|l| l.max).unwrap_or(0))
            .arg(limiter.map(|l| l.duration_ms).unwrap_or(0))
            .invoke_async(&mut conn)
            .await?;
        decode_fetch(value, keys.queue(), "moveToActive")
    }

    /// Renew one lock; `false` means the token no longer matches.
    pub async fn extend_lock(
        &self,
        job_id: &str,
        token: &str,
        duration_ms: u64,
    ) -> Result<bool, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let renewed: i64 = self
            .catalog()
            .extend_lock
            .key(keys.lock(job_id))
            .key(keys.stalled())
            .arg(token)
            .arg(duration_ms)
            .arg(job_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(renewed == 1)
    }

    /// Renew a batch of locks; returns the job ids that could not be renewed.
    pub async fn extend_locks(
        &self,
        jobs: &[(String, String)],
        duration_ms: u64,
    ) -> Result<Vec<String>, ScriptError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let keys = self.keys();
        let mut conn = self.connection();
        let mut invocation = self.catalog().extend_locks.prepare_invoke();
        invocation.key(keys.stalled()).arg(self.base_arg()).arg(duration_ms);
        for (job_id, token) in jobs {
            invocation.arg(job_id).arg(token);
        }
        let value: Value = invocation.invoke_async(&mut conn).await?;
        reply::string_list(&value, "extendLocks")
    }

    /// Run one stall-recovery pass (throttled server-side).
    pub async fn move_stalled_jobs_to_wait(
        &self,
        max_stalled_count: u32,
        now: u64,
        throttle_ms: u64,
        scan_limit: u32,
    ) -> Result<StalledReport, ScriptError> {
        let keys = self.keys();
        let mut conn = self.connection();
        let value: Value = self
            .catalog()
            .move_stalled_jobs_to_wait
            .key(keys.stalled())
            .key(keys.wait())
            .key(keys.active())
            .key(keys.failed())
            .key(keys.stalled_check())
            .key(keys.meta())
            .key(keys.paused())
            .key(keys.marker())
            .key(keys.events())
            .key(keys.prioritized())
            .key(keys.priority_counter())
            .arg(max_stalled_count)
            .arg(self.base_arg())
            .arg(now)
            .arg(throttle_ms)
            .arg(scan_limit)
            .invoke_async(&mut conn)
            .await?;

        let items =
            reply::as_array(&value).ok_or_else(|| reply::unexpected("moveStalled", &value))?;
        let failed = items
            .first()
            .map(|v| reply::string_list(v, "moveStalled"))
            .transpose()?
            .unwrap_or_default();
        let recovered = items
            .get(1)
            .map(|v| reply::string_list(v, "moveStalled"))
            .transpose()?
            .unwrap_or_default();
        let mut compensations = Vec::new();
        if let Some(triggers) = items.get(2).and_then(reply::as_array) {
            for trigger in triggers {
                let mut parts = reply::string_list(trigger, "moveStalled")?;
                if !parts.is_empty() {
                    let group_id = parts.remove(0);
                    compensations.push((group_id, parts));
                }
            }
        }
        Ok(StalledReport { failed, recovered, compensations })
    }
}
