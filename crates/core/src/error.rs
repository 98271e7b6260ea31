// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the workspace.
//!
//! State scripts never raise: they return negative numeric codes which the
//! client translates into a [`ScriptCode`] carrying the command name and job
//! id for context.

use thiserror::Error;

/// Invariant-violation codes returned by state scripts.
///
/// The numeric values are part of the script contract and must stay in sync
/// with the Lua sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCode {
    JobNotExist,
    JobLockNotExist,
    JobNotInState,
    JobPendingChildren,
    ParentJobNotExist,
    JobLockMismatch,
    ParentJobCannotBeReplaced,
    JobBelongsToJobScheduler,
    JobHasFailedChildren,
    SchedulerJobIdCollision,
    SchedulerJobSlotsBusy,
    InvalidGroupState,
}

impl ScriptCode {
    /// Translate a raw script return value into a code, if it is one.
    pub fn from_raw(code: i64) -> Option<Self> {
        match code {
            -1 => Some(Self::JobNotExist),
            -2 => Some(Self::JobLockNotExist),
            -3 => Some(Self::JobNotInState),
            -4 => Some(Self::JobPendingChildren),
            -5 => Some(Self::ParentJobNotExist),
            -6 => Some(Self::JobLockMismatch),
            -7 => Some(Self::ParentJobCannotBeReplaced),
            -8 => Some(Self::JobBelongsToJobScheduler),
            -9 => Some(Self::JobHasFailedChildren),
            -10 => Some(Self::SchedulerJobIdCollision),
            -11 => Some(Self::SchedulerJobSlotsBusy),
            -12 => Some(Self::InvalidGroupState),
            _ => None,
        }
    }

    /// The raw numeric value returned by scripts.
    pub fn raw(&self) -> i64 {
        match self {
            Self::JobNotExist => -1,
            Self::JobLockNotExist => -2,
            Self::JobNotInState => -3,
            Self::JobPendingChildren => -4,
            Self::ParentJobNotExist => -5,
            Self::JobLockMismatch => -6,
            Self::ParentJobCannotBeReplaced => -7,
            Self::JobBelongsToJobScheduler => -8,
            Self::JobHasFailedChildren => -9,
            Self::SchedulerJobIdCollision => -10,
            Self::SchedulerJobSlotsBusy => -11,
            Self::InvalidGroupState => -12,
        }
    }
}

crate::simple_display! {
    ScriptCode {
        JobNotExist => "job does not exist",
        JobLockNotExist => "job lock does not exist",
        JobNotInState => "job is not in the expected state",
        JobPendingChildren => "job has pending children",
        ParentJobNotExist => "parent job does not exist",
        JobLockMismatch => "job lock is held by another worker",
        ParentJobCannotBeReplaced => "parent job cannot be replaced",
        JobBelongsToJobScheduler => "job belongs to a job scheduler",
        JobHasFailedChildren => "job has failed children",
        SchedulerJobIdCollision => "scheduler job id collision",
        SchedulerJobSlotsBusy => "scheduler job slots busy",
        InvalidGroupState => "group is in a terminal state",
    }
}

/// Errors raised by grist-core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A state script reported an invariant violation.
    #[error("{command} on job {job_id}: {code}")]
    Script {
        code: ScriptCode,
        command: &'static str,
        job_id: String,
    },

    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Synchronous construction-time rejection (spec'd configuration errors).
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A group with this id already exists.
    #[error("group {0} already exists")]
    GroupExists(String),
}

impl CoreError {
    /// Build a script error from a raw negative return value.
    ///
    /// Unknown codes map to `JobNotExist` semantics only in the sense that
    /// the caller treats them as fatal; they keep the raw value in the
    /// message via `InvalidOptions` instead.
    pub fn from_script_code(raw: i64, command: &'static str, job_id: impl Into<String>) -> Self {
        match ScriptCode::from_raw(raw) {
            Some(code) => Self::Script { code, command, job_id: job_id.into() },
            None => Self::InvalidOptions(format!("{command}: unknown script code {raw}")),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
