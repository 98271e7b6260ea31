// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saga group entities.
//!
//! Group state lives in the `groups:{groupId}` hash and is mutated only by
//! group scripts; this module holds the client-side views and the
//! construction-time validation for `addGroup`.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Suffix of the per-queue compensation queue: `{queue}:compensation`.
pub const COMPENSATION_QUEUE_SUFFIX: &str = "compensation";

/// Saga lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupState {
    Active,
    Compensating,
    Completed,
    Failed,
    FailedCompensation,
}

crate::simple_display! {
    GroupState {
        Active => "ACTIVE",
        Compensating => "COMPENSATING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        FailedCompensation => "FAILED_COMPENSATION",
    }
}

impl std::str::FromStr for GroupState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "COMPENSATING" => Ok(Self::Compensating),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "FAILED_COMPENSATION" => Ok(Self::FailedCompensation),
            other => Err(CoreError::InvalidOptions(format!("unknown group state: {other}"))),
        }
    }
}

impl GroupState {
    /// Terminal states reject further member transitions and cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::FailedCompensation)
    }
}

/// Per-member status in the `groups:{groupId}:jobs` hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupJobStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    GroupJobStatus {
        Pending => "pending",
        Active => "active",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl std::str::FromStr for GroupJobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::InvalidOptions(format!("unknown group job status: {other}"))),
        }
    }
}

/// Compensation configuration: original job name -> compensation job spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationSpec {
    /// Name the compensation job is added under.
    pub name: String,
    /// Static payload merged into the compensation job data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Retry budget for the compensation job (defaults to a single attempt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

/// Client-side view of a group hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub state: GroupState,
    pub created_at: u64,
    pub updated_at: u64,
    pub total_jobs: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    pub cancelled_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation: Option<HashMap<String, CompensationSpec>>,
    pub total_compensation_jobs: u32,
    pub compensation_done_count: u32,
}

impl GroupRecord {
    /// Build a view from a raw `HGETALL` reply.
    pub fn from_hash(fields: HashMap<String, String>) -> Result<Self, CoreError> {
        let int = |key: &str| -> u64 {
            fields.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
        };
        let state = fields
            .get("state")
            .ok_or_else(|| CoreError::InvalidOptions("group hash missing state".into()))?
            .parse()?;
        let compensation = match fields.get("compensation") {
            Some(raw) if !raw.is_empty() => Some(serde_json::from_str(raw)?),
            _ => None,
        };

        Ok(Self {
            id: fields.get("id").cloned().unwrap_or_default(),
            name: fields.get("name").cloned().unwrap_or_default(),
            state,
            created_at: int("createdAt"),
            updated_at: int("updatedAt"),
            total_jobs: int("totalJobs") as u32,
            completed_count: int("completedCount") as u32,
            failed_count: int("failedCount") as u32,
            cancelled_count: int("cancelledCount") as u32,
            compensation,
            total_compensation_jobs: int("totalCompensationJobs") as u32,
            compensation_done_count: int("compensationDoneCount") as u32,
        })
    }
}

/// Validate `addGroup` preconditions: at least one job, every compensation
/// key names a member, no member carries a parent ref.
pub fn validate_group_jobs(
    job_names: &[String],
    has_parent: &[bool],
    compensation: Option<&HashMap<String, CompensationSpec>>,
) -> Result<(), CoreError> {
    if job_names.is_empty() {
        return Err(CoreError::InvalidOptions("group requires at least one job".into()));
    }
    if let Some(map) = compensation {
        for key in map.keys() {
            if !job_names.iter().any(|name| name == key) {
                return Err(CoreError::InvalidOptions(format!(
                    "compensation key '{key}' does not match any group job name"
                )));
            }
        }
    }
    if has_parent.iter().any(|p| *p) {
        return Err(CoreError::InvalidOptions(
            "group jobs cannot carry a parent reference".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod tests;
