// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker configuration.

use crate::breaker::CircuitBreakerOptions;
use crate::logger::LifecycleLogger;
use grist_conn::ConnOptions;
use grist_core::backoff::CustomBackoff;
use grist_core::error::CoreError;
use grist_core::keys::DEFAULT_PREFIX;
use grist_core::opts::{RateLimit, RemovePolicy};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Dead-letter routing configuration.
#[derive(Debug, Clone)]
pub struct DeadLetterOptions {
    /// Destination queue; cluster deployments must pick a name sharing the
    /// source queue's hash tag.
    pub queue_name: String,
}

/// Worker construction options.
#[derive(Clone)]
pub struct WorkerOptions {
    pub prefix: String,
    pub clustered: bool,
    pub conn: ConnOptions,
    /// Worker display name carried in logs.
    pub name: Option<String>,
    /// Bound on in-flight jobs.
    pub concurrency: usize,
    pub lock_duration: Duration,
    /// Renewal cadence; defaults to half the lock duration.
    pub lock_renew_time: Option<Duration>,
    pub stalled_interval: Duration,
    /// Stall recoveries allowed before the job fails terminally.
    pub max_stalled_count: u32,
    /// Active-list scan window per stall pass.
    pub stalled_scan_limit: u32,
    /// Longest a fetch loop blocks on the wake marker.
    pub drain_delay: Duration,
    pub limiter: Option<RateLimit>,
    pub remove_on_complete: Option<RemovePolicy>,
    pub remove_on_fail: Option<RemovePolicy>,
    /// Metrics bound; 0 disables collection.
    pub metrics_max_data_points: u32,
    /// Start the loops from `Worker::start`; `false` means call `run()`.
    pub autorun: bool,
    pub circuit_breaker: Option<CircuitBreakerOptions>,
    pub dead_letter_queue: Option<DeadLetterOptions>,
    pub logger: Option<Arc<dyn LifecycleLogger>>,
    /// Allowlist of lifecycle events to log; `None` logs them all.
    pub log_events: Option<HashSet<String>>,
    /// Custom backoff strategies resolvable by name.
    pub backoff_strategies: HashMap<String, CustomBackoff>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            prefix: grist_conn::env::test_prefix()
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            clustered: false,
            conn: ConnOptions::default(),
            name: None,
            concurrency: 1,
            lock_duration: Duration::from_secs(30),
            lock_renew_time: None,
            stalled_interval: Duration::from_secs(30),
            max_stalled_count: 1,
            stalled_scan_limit: 1_000,
            drain_delay: Duration::from_secs(5),
            limiter: None,
            remove_on_complete: None,
            remove_on_fail: None,
            metrics_max_data_points: 0,
            autorun: true,
            circuit_breaker: None,
            dead_letter_queue: None,
            logger: None,
            log_events: None,
            backoff_strategies: HashMap::new(),
        }
    }
}

impl WorkerOptions {
    grist_core::setters! {
        into {
            prefix: String,
        }
        set {
            clustered: bool,
            conn: ConnOptions,
            concurrency: usize,
            lock_duration: Duration,
            stalled_interval: Duration,
            max_stalled_count: u32,
            drain_delay: Duration,
            metrics_max_data_points: u32,
            autorun: bool,
        }
        option {
            name: String,
            lock_renew_time: Duration,
            limiter: RateLimit,
            remove_on_complete: RemovePolicy,
            remove_on_fail: RemovePolicy,
            circuit_breaker: CircuitBreakerOptions,
            dead_letter_queue: DeadLetterOptions,
            logger: Arc<dyn LifecycleLogger>,
            log_events: HashSet<String>,
        }
    }

    /// Effective renewal cadence.
    pub fn renew_every(&self) -> Duration {
        self.lock_renew_time.unwrap_or(self.lock_duration / 2)
    }

    /// Synchronous construction-time validation.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.concurrency == 0 {
            return Err(CoreError::InvalidOptions("concurrency must be at least 1".into()));
        }
        if self.lock_duration.is_zero() {
            return Err(CoreError::InvalidOptions("lock duration must be positive".into()));
        }
        if let Some(dlq) = &self.dead_letter_queue {
            if dlq.queue_name.is_empty() {
                return Err(CoreError::InvalidOptions(
                    "dead letter queue name cannot be empty".into(),
                ));
            }
        }
        if let Some(breaker) = &self.circuit_breaker {
            if breaker.threshold == 0 {
                return Err(CoreError::InvalidOptions(
                    "circuit breaker threshold must be positive".into(),
                ));
            }
            if breaker.half_open_max_attempts == 0 {
                return Err(CoreError::InvalidOptions(
                    "circuit breaker half-open attempts must be positive".into(),
                ));
            }
        }
        if let Some(limiter) = &self.limiter {
            if limiter.max == 0 || limiter.duration_ms == 0 {
                return Err(CoreError::InvalidOptions(
                    "rate limiter max and duration must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for WorkerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerOptions")
            .field("prefix", &self.prefix)
            .field("concurrency", &self.concurrency)
            .field("lock_duration", &self.lock_duration)
            .field("stalled_interval", &self.stalled_interval)
            .field("drain_delay", &self.drain_delay)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("dead_letter_queue", &self.dead_letter_queue)
            .finish()
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
