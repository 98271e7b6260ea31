// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle logging contract.
//!
//! Workers emit structured entries at documented levels: debug for
//! {added, active, completed, delayed, rate-limited}, warn for
//! {retrying, stalled}, error for {failed}. When no logger is configured
//! the cost is a single truthy check per event.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

/// One structured lifecycle entry.
#[derive(Debug, Clone)]
pub struct LifecycleEntry<'a> {
    /// Epoch ms.
    pub timestamp: u64,
    /// Event name: added, active, completed, delayed, rate-limited,
    /// retrying, stalled, failed.
    pub event: &'a str,
    pub queue: &'a str,
    pub job_id: Option<&'a str>,
    pub job_name: Option<&'a str>,
    pub attempts_made: Option<u32>,
    /// Processing duration for terminal events.
    pub duration_ms: Option<u64>,
    /// Event-specific payload (delay, reason, limiter ttl).
    pub data: Option<&'a Value>,
}

/// Sink for lifecycle entries. Implementations must be cheap and
/// non-blocking; the worker calls them inline.
pub trait LifecycleLogger: Send + Sync {
    fn log(&self, level: LogLevel, entry: &LifecycleEntry<'_>);
}

/// Default sink forwarding to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLifecycleLogger;

impl LifecycleLogger for TracingLifecycleLogger {
    fn log(&self, level: LogLevel, entry: &LifecycleEntry<'_>) {
        let job_id = entry.job_id.unwrap_or("");
        let job_name = entry.job_name.unwrap_or("");
        let attempts = entry.attempts_made.unwrap_or(0);
        match level {
            LogLevel::Debug => tracing::debug!(
                queue = entry.queue,
                job_id,
                job_name,
                attempts,
                duration_ms = entry.duration_ms,
                "{}",
                entry.event
            ),
            LogLevel::Warn => tracing::warn!(
                queue = entry.queue,
                job_id,
                job_name,
                attempts,
                data = entry.data.map(|d| d.to_string()),
                "{}",
                entry.event
            ),
            LogLevel::Error => tracing::error!(
                queue = entry.queue,
                job_id,
                job_name,
                attempts,
                duration_ms = entry.duration_ms,
                data = entry.data.map(|d| d.to_string()),
                "{}",
                entry.event
            ),
        }
    }
}

/// The documented level for each lifecycle event.
pub fn level_for(event: &str) -> LogLevel {
    match event {
        "retrying" | "stalled" => LogLevel::Warn,
        "failed" => LogLevel::Error,
        _ => LogLevel::Debug,
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
