// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job option bags.
//!
//! Option families with runtime-flexible shapes (backoff variants, retention
//! variants) are discriminated unions; validation happens at construction via
//! [`JobOpts::validate`], never inside scripts.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default bound on the per-job stacktrace ring.
pub const DEFAULT_STACKTRACE_LIMIT: usize = 10;

/// Default bound on the per-job log list.
pub const DEFAULT_KEEP_LOGS: u64 = 100;

/// Backoff strategy configuration, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackoffOpts {
    #[serde(rename_all = "camelCase")]
    Fixed {
        delay: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        jitter: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Exponential {
        delay: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        jitter: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Linear {
        delay: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Polynomial {
        delay: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exponent: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    DecorrelatedJitter {
        base_delay: u64,
        max_delay: u64,
    },
    /// Resolved against the worker's registered custom strategies by name.
    #[serde(rename_all = "camelCase")]
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_delay: Option<u64>,
    },
}

impl BackoffOpts {
    /// The clamp applied to the final computed delay, when configured.
    pub fn max_delay(&self) -> Option<u64> {
        match self {
            Self::Fixed { max_delay, .. }
            | Self::Exponential { max_delay, .. }
            | Self::Linear { max_delay, .. }
            | Self::Polynomial { max_delay, .. }
            | Self::Custom { max_delay, .. } => *max_delay,
            Self::DecorrelatedJitter { max_delay, .. } => Some(*max_delay),
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        match self {
            Self::Polynomial { exponent: Some(e), .. } if *e <= 0.0 => Err(
                CoreError::InvalidOptions(format!("polynomial backoff exponent must be positive, got {e}")),
            ),
            Self::Fixed { jitter: Some(j), .. } | Self::Exponential { jitter: Some(j), .. }
                if !(0.0..=1.0).contains(j) =>
            {
                Err(CoreError::InvalidOptions(format!("backoff jitter must be in [0, 1], got {j}")))
            }
            _ => Ok(()),
        }
    }
}

/// Backoff as written by users: a bare number of milliseconds normalizes to
/// a fixed strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackoffConfig {
    Millis(u64),
    Opts(BackoffOpts),
}

impl BackoffConfig {
    pub fn normalize(&self) -> BackoffOpts {
        match self {
            Self::Millis(n) => BackoffOpts::Fixed { delay: *n, jitter: None, max_delay: None },
            Self::Opts(opts) => opts.clone(),
        }
    }
}

impl From<u64> for BackoffConfig {
    fn from(delay: u64) -> Self {
        Self::Millis(delay)
    }
}

impl From<BackoffOpts> for BackoffConfig {
    fn from(opts: BackoffOpts) -> Self {
        Self::Opts(opts)
    }
}

/// Per-error-name backoff overrides, keyed by the runtime error name.
pub type ErrorBackoffs = HashMap<String, BackoffConfig>;

/// Retention policy for finished jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemovePolicy {
    /// `true` removes the job immediately, `false` keeps everything.
    Flag(bool),
    /// Keep at most this many finished jobs.
    Count(i64),
    Criteria(KeepJobs),
}

/// Age/count retention criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepJobs {
    /// Maximum age in seconds before a finished job is pruned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u64>,
    /// Maximum number of finished jobs retained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

impl RemovePolicy {
    /// Keep-count semantics for scripts: negative means keep everything.
    pub fn keep_count(&self) -> i64 {
        match self {
            Self::Flag(true) => 0,
            Self::Flag(false) => -1,
            Self::Count(n) => *n,
            Self::Criteria(KeepJobs { count, .. }) => count.unwrap_or(-1),
        }
    }

    /// Maximum age in seconds, when age-based pruning is requested.
    pub fn keep_age(&self) -> Option<u64> {
        match self {
            Self::Criteria(KeepJobs { age, .. }) => *age,
            _ => None,
        }
    }
}

/// Server-side rate limit honored cooperatively by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    /// Jobs admitted per window.
    pub max: u32,
    /// Window length in milliseconds.
    pub duration_ms: u64,
}

/// Reference to a parent job this job is a dependency of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentRef {
    pub id: String,
    /// Parent's queue name. Cluster deployments require it to share the
    /// child's hash tag.
    pub queue: String,
}

/// Reference to the saga group a job belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRef {
    pub id: String,
    pub name: String,
    pub queue: String,
}

/// Per-job options, stored verbatim (msgpack) in the job hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobOpts {
    /// Total attempts including the first; 1 means no retries.
    pub attempts: u32,
    /// Initial delay in milliseconds before the job becomes ready.
    pub delay: u64,
    /// Priority; 0 means none, lower values run first.
    pub priority: u32,
    /// Pop from the head of the wait list instead of the tail.
    pub lifo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_backoffs: Option<ErrorBackoffs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplication_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_on_complete: Option<RemovePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_on_fail: Option<RemovePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRef>,
    /// Opaque handle linking the job to a repeating scheduler entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_job_key: Option<String>,
    pub fail_parent_on_failure: bool,
    pub continue_parent_on_failure: bool,
    pub ignore_dependency_on_failure: bool,
    pub remove_dependency_on_failure: bool,
    /// Bound on the stacktrace ring stored in the job hash.
    pub stacktrace_limit: usize,
    /// Bound on the per-job log list.
    pub keep_logs: u64,
}

impl Default for JobOpts {
    fn default() -> Self {
        Self {
            attempts: 1,
            delay: 0,
            priority: 0,
            lifo: false,
            backoff: None,
            error_backoffs: None,
            job_id: None,
            deduplication_id: None,
            remove_on_complete: None,
            remove_on_fail: None,
            parent: None,
            group: None,
            repeat_job_key: None,
            fail_parent_on_failure: false,
            continue_parent_on_failure: false,
            ignore_dependency_on_failure: false,
            remove_dependency_on_failure: false,
            stacktrace_limit: DEFAULT_STACKTRACE_LIMIT,
            keep_logs: DEFAULT_KEEP_LOGS,
        }
    }
}

impl JobOpts {
    crate::setters! {
        set {
            attempts: u32,
            delay: u64,
            priority: u32,
            lifo: bool,
        }
        option {
            backoff: BackoffConfig,
            job_id: String,
            deduplication_id: String,
            remove_on_complete: RemovePolicy,
            remove_on_fail: RemovePolicy,
            parent: ParentRef,
            group: GroupRef,
        }
    }

    /// Synchronous construction-time validation.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.attempts == 0 {
            return Err(CoreError::InvalidOptions("attempts must be at least 1".into()));
        }
        if let Some(backoff) = &self.backoff {
            backoff.normalize().validate()?;
        }
        if let Some(overrides) = &self.error_backoffs {
            for config in overrides.values() {
                config.normalize().validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "opts_tests.rs"]
mod tests;
