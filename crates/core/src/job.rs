// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job entity and durable state machine.

use crate::error::CoreError;
use crate::opts::JobOpts;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Data field carrying dead-letter provenance on DLQ jobs.
pub const DLQ_META_FIELD: &str = "_dlqMeta";

/// Durable states a job id can occupy. A job is in exactly one at any
/// instant (plus transiently in the stalled set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Wait,
    Paused,
    Active,
    Delayed,
    Prioritized,
    WaitingChildren,
    Completed,
    Failed,
}

crate::simple_display! {
    JobState {
        Wait => "wait",
        Paused => "paused",
        Active => "active",
        Delayed => "delayed",
        Prioritized => "prioritized",
        WaitingChildren => "waiting-children",
        Completed => "completed",
        Failed => "failed",
    }
}

impl std::str::FromStr for JobState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wait" => Ok(Self::Wait),
            "paused" => Ok(Self::Paused),
            "active" => Ok(Self::Active),
            "delayed" => Ok(Self::Delayed),
            "prioritized" => Ok(Self::Prioritized),
            "waiting-children" => Ok(Self::WaitingChildren),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::InvalidOptions(format!("unknown job state: {other}"))),
        }
    }
}

impl JobState {
    /// Terminal states: the job will not run again without operator action.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Provenance carried by jobs routed to a dead-letter queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlqMeta {
    pub source_queue: String,
    pub original_job_id: String,
    pub failed_reason: String,
    pub stacktrace: Vec<String>,
    pub attempts_made: u32,
    pub dead_lettered_at: u64,
    pub original_timestamp: u64,
    pub original_opts: JobOpts,
}

/// A job instance as read from its Redis hash.
///
/// Mutated only by state scripts; this struct is a client-side view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    /// Queue this view was read from.
    pub queue: String,
    pub data: Value,
    pub opts: JobOpts,
    /// Creation time, epoch ms.
    pub timestamp: u64,
    /// Terminal outcomes recorded so far.
    pub attempts_made: u32,
    /// Fetches recorded so far (`attempts_made <= attempts_started`).
    pub attempts_started: u32,
    pub stalled_counter: u32,
    pub processed_on: Option<u64>,
    pub finished_on: Option<u64>,
    pub returnvalue: Option<Value>,
    pub failed_reason: Option<String>,
    /// Bounded ring of failure stacktraces, newest first.
    pub stacktrace: Vec<String>,
    pub progress: Value,
    /// Child-to-parent edge (full parent job key), when this job is a
    /// dependency of a flow parent.
    pub parent_key: Option<String>,
}

impl Job {
    /// Build a view from a raw `HGETALL` reply.
    pub fn from_hash(
        queue: &str,
        id: &str,
        fields: HashMap<String, Vec<u8>>,
    ) -> Result<Self, CoreError> {
        let text = |key: &str| -> Option<String> {
            fields.get(key).map(|v| String::from_utf8_lossy(v).into_owned())
        };
        let int = |key: &str| -> Option<u64> { text(key).and_then(|v| v.parse().ok()) };

        let opts = match fields.get("opts") {
            Some(raw) => crate::codec::decode(raw)?,
            None => JobOpts::default(),
        };
        let data = match text("data") {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Value::Null,
        };
        let stacktrace = match text("stacktrace") {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        let returnvalue = match text("returnvalue") {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };
        let progress = match text("progress") {
            Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::Null),
            None => Value::Null,
        };

        Ok(Self {
            id: id.to_string(),
            name: text("name").unwrap_or_default(),
            queue: queue.to_string(),
            data,
            opts,
            timestamp: int("timestamp").unwrap_or(0),
            attempts_made: int("attemptsMade").unwrap_or(0) as u32,
            attempts_started: int("attemptsStarted").unwrap_or(0) as u32,
            stalled_counter: int("stalledCounter").unwrap_or(0) as u32,
            processed_on: int("processedOn"),
            finished_on: int("finishedOn"),
            returnvalue,
            failed_reason: text("failedReason"),
            stacktrace,
            progress,
            parent_key: text("parentKey"),
        })
    }

    /// The canonical full job key within `keys`.
    pub fn key(&self, keys: &crate::keys::KeySpace) -> String {
        keys.job(&self.id)
    }

    /// Whether every configured attempt has been consumed.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts_made >= self.opts.attempts
    }

    /// Record a failed attempt client-side before reporting it: appends to
    /// the stacktrace ring (newest first, bounded) and sets the reason.
    pub fn record_failure(&mut self, reason: impl Into<String>, stack: impl Into<String>) {
        self.stacktrace.insert(0, stack.into());
        let limit = self.opts.stacktrace_limit.max(1);
        self.stacktrace.truncate(limit);
        self.failed_reason = Some(reason.into());
    }

    /// Dead-letter provenance, when this job lives on a DLQ.
    pub fn dlq_meta(&self) -> Option<DlqMeta> {
        let raw = self.data.get(DLQ_META_FIELD)?;
        serde_json::from_value(raw.clone()).ok()
    }

    /// The job's payload with DLQ provenance stripped (replay shape).
    pub fn data_without_dlq_meta(&self) -> Value {
        match &self.data {
            Value::Object(map) => {
                let mut map = map.clone();
                map.remove(DLQ_META_FIELD);
                Value::Object(map)
            }
            other => other.clone(),
        }
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: String = "1",
            name: String = "test-job",
            queue: String = "test",
        }
        set {
            data: Value = serde_json::json!({}),
            opts: JobOpts = JobOpts::default(),
            timestamp: u64 = 1_000_000,
            attempts_made: u32 = 0,
            attempts_started: u32 = 0,
            stalled_counter: u32 = 0,
            stacktrace: Vec<String> = Vec::new(),
            progress: Value = Value::Null,
        }
        option {
            processed_on: u64 = None,
            finished_on: u64 = None,
            returnvalue: Value = None,
            failed_reason: String = None,
            parent_key: String = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
