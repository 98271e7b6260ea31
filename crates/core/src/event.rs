// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed events carried on the per-queue events stream.
//!
//! Stream entries are flat field lists; [`Event::from_fields`] and
//! [`Event::to_fields`] convert between the wire shape and the typed enum.
//! Scripts append entries in the same atomic step as the state mutation;
//! the worker appends only circuit-breaker transitions.

use serde::{Deserialize, Serialize};

/// One raw entry read from the events stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStreamEntry {
    /// Stream id, the consumer cursor.
    pub id: String,
    pub fields: Vec<(String, String)>,
}

/// Events that observers can subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "waiting")]
    Waiting { job_id: String },

    #[serde(rename = "active")]
    Active { job_id: String },

    #[serde(rename = "completed")]
    Completed {
        job_id: String,
        /// JSON-encoded processor return value.
        returnvalue: String,
    },

    #[serde(rename = "failed")]
    Failed { job_id: String, failed_reason: String },

    #[serde(rename = "progress")]
    Progress {
        job_id: String,
        /// JSON-encoded progress payload.
        data: String,
    },

    #[serde(rename = "delayed")]
    Delayed {
        job_id: String,
        /// Epoch ms at which the job becomes ready.
        delay: u64,
    },

    #[serde(rename = "removed")]
    Removed { job_id: String },

    /// An add was short-circuited by a deduplication marker.
    #[serde(rename = "duplicated")]
    Duplicated { job_id: String, deduplication_id: String },

    #[serde(rename = "deadLettered")]
    DeadLettered {
        job_id: String,
        dead_letter_queue: String,
        failed_reason: String,
    },

    #[serde(rename = "paused")]
    Paused,

    #[serde(rename = "resumed")]
    Resumed,

    #[serde(rename = "drained")]
    Drained,

    #[serde(rename = "group:compensating")]
    GroupCompensating { group_id: String, group_name: String },

    #[serde(rename = "group:completed")]
    GroupCompleted { group_id: String, group_name: String },

    #[serde(rename = "group:failed")]
    GroupFailed { group_id: String, group_name: String },

    #[serde(rename = "group:failed_compensation")]
    GroupFailedCompensation { group_id: String, group_name: String },

    #[serde(rename = "circuit:open")]
    CircuitOpen { failures: u32, threshold: u32 },

    #[serde(rename = "circuit:half-open")]
    CircuitHalfOpen,

    #[serde(rename = "circuit:closed")]
    CircuitClosed {
        /// Job whose success closed the breaker, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        test_job_id: Option<String>,
    },
}

crate::simple_display! {
    Event {
        Waiting { .. } => "waiting",
        Active { .. } => "active",
        Completed { .. } => "completed",
        Failed { .. } => "failed",
        Progress { .. } => "progress",
        Delayed { .. } => "delayed",
        Removed { .. } => "removed",
        Duplicated { .. } => "duplicated",
        DeadLettered { .. } => "deadLettered",
        Paused => "paused",
        Resumed => "resumed",
        Drained => "drained",
        GroupCompensating { .. } => "group:compensating",
        GroupCompleted { .. } => "group:completed",
        GroupFailed { .. } => "group:failed",
        GroupFailedCompensation { .. } => "group:failed_compensation",
        CircuitOpen { .. } => "circuit:open",
        CircuitHalfOpen => "circuit:half-open",
        CircuitClosed { .. } => "circuit:closed",
    }
}

impl Event {
    /// The job id this event refers to, when applicable.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Waiting { job_id }
            | Self::Active { job_id }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Delayed { job_id, .. }
            | Self::Removed { job_id }
            | Self::Duplicated { job_id, .. }
            | Self::DeadLettered { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Parse a flat stream entry. Unknown event names return `None` so
    /// readers skip entries written by newer versions.
    pub fn from_fields(fields: &[(String, String)]) -> Option<Self> {
        let get = |key: &str| fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        let event = get("event")?;
        let job_id = || get("jobId").unwrap_or_default();

        match event.as_str() {
            "waiting" => Some(Self::Waiting { job_id: job_id() }),
            "active" => Some(Self::Active { job_id: job_id() }),
            "completed" => Some(Self::Completed {
                job_id: job_id(),
                returnvalue: get("returnvalue").unwrap_or_else(|| "null".into()),
            }),
            "failed" => Some(Self::Failed {
                job_id: job_id(),
                failed_reason: get("failedReason").unwrap_or_default(),
            }),
            "progress" => Some(Self::Progress {
                job_id: job_id(),
                data: get("data").unwrap_or_else(|| "null".into()),
            }),
            "delayed" => Some(Self::Delayed {
                job_id: job_id(),
                delay: get("delay").and_then(|v| v.parse().ok()).unwrap_or(0),
            }),
            "removed" => Some(Self::Removed { job_id: job_id() }),
            "duplicated" => Some(Self::Duplicated {
                job_id: job_id(),
                deduplication_id: get("deduplicationId").unwrap_or_default(),
            }),
            "deadLettered" => Some(Self::DeadLettered {
                job_id: job_id(),
                dead_letter_queue: get("deadLetterQueue").unwrap_or_default(),
                failed_reason: get("failedReason").unwrap_or_default(),
            }),
            "paused" => Some(Self::Paused),
            "resumed" => Some(Self::Resumed),
            "drained" => Some(Self::Drained),
            "group:compensating" => Some(Self::GroupCompensating {
                group_id: get("groupId").unwrap_or_default(),
                group_name: get("groupName").unwrap_or_default(),
            }),
            "group:completed" => Some(Self::GroupCompleted {
                group_id: get("groupId").unwrap_or_default(),
                group_name: get("groupName").unwrap_or_default(),
            }),
            "group:failed" => Some(Self::GroupFailed {
                group_id: get("groupId").unwrap_or_default(),
                group_name: get("groupName").unwrap_or_default(),
            }),
            "group:failed_compensation" => Some(Self::GroupFailedCompensation {
                group_id: get("groupId").unwrap_or_default(),
                group_name: get("groupName").unwrap_or_default(),
            }),
            "circuit:open" => Some(Self::CircuitOpen {
                failures: get("failures").and_then(|v| v.parse().ok()).unwrap_or(0),
                threshold: get("threshold").and_then(|v| v.parse().ok()).unwrap_or(0),
            }),
            "circuit:half-open" => Some(Self::CircuitHalfOpen),
            "circuit:closed" => Some(Self::CircuitClosed { test_job_id: get("testJobId") }),
            _ => None,
        }
    }

    /// Flatten into stream fields (the inverse of [`Self::from_fields`]).
    pub fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![("event".to_string(), self.to_string())];
        let mut push = |key: &str, value: String| fields.push((key.to_string(), value));
        match self {
            Self::Waiting { job_id }
            | Self::Active { job_id }
            | Self::Removed { job_id } => push("jobId", job_id.clone()),
            Self::Completed { job_id, returnvalue } => {
                push("jobId", job_id.clone());
                push("returnvalue", returnvalue.clone());
            }
            Self::Failed { job_id, failed_reason } => {
                push("jobId", job_id.clone());
                push("failedReason", failed_reason.clone());
            }
            Self::Progress { job_id, data } => {
                push("jobId", job_id.clone());
                push("data", data.clone());
            }
            Self::Delayed { job_id, delay } => {
                push("jobId", job_id.clone());
                push("delay", delay.to_string());
            }
            Self::Duplicated { job_id, deduplication_id } => {
                push("jobId", job_id.clone());
                push("deduplicationId", deduplication_id.clone());
            }
            Self::DeadLettered { job_id, dead_letter_queue, failed_reason } => {
                push("jobId", job_id.clone());
                push("deadLetterQueue", dead_letter_queue.clone());
                push("failedReason", failed_reason.clone());
            }
            Self::Paused | Self::Resumed | Self::Drained | Self::CircuitHalfOpen => {}
            Self::GroupCompensating { group_id, group_name }
            | Self::GroupCompleted { group_id, group_name }
            | Self::GroupFailed { group_id, group_name }
            | Self::GroupFailedCompensation { group_id, group_name } => {
                push("groupId", group_id.clone());
                push("groupName", group_name.clone());
            }
            Self::CircuitOpen { failures, threshold } => {
                push("failures", failures.to_string());
                push("threshold", threshold.to_string());
            }
            Self::CircuitClosed { test_job_id } => {
                if let Some(id) = test_job_id {
                    push("testJobId", id.clone());
                }
            }
        }
        fields
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
