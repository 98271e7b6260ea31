// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure retry-delay computation.
//!
//! Strategies are pure functions of `(opts, attemptsMade, error, job data)`
//! with one exception: `decorrelatedJitter` persists its previous delay in a
//! reserved job-data field so the sequence survives retries.

use crate::error::CoreError;
use crate::opts::BackoffOpts;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;

/// Reserved job-data field holding the previous decorrelated-jitter delay.
///
/// User payloads must not use this key; it is written back by the worker on
/// every retry so the chain continues where it left off.
pub const PREV_DELAY_FIELD: &str = "__grist_prev_delay";

/// User-supplied strategy: `(attemptsMade, errorName, data) -> delayMs`.
pub type CustomBackoff = Arc<dyn Fn(u32, Option<&str>, &Value) -> u64 + Send + Sync>;

/// Named registry entry for custom strategies.
#[derive(Clone)]
pub struct BackoffStrategy {
    pub name: String,
    pub compute: CustomBackoff,
}

impl BackoffStrategy {
    pub fn new(name: impl Into<String>, compute: CustomBackoff) -> Self {
        Self { name: name.into(), compute }
    }
}

/// Compute the retry delay in milliseconds for the given attempt.
///
/// `attempts_made` counts terminal outcomes, so the first retry computes with
/// `attempts_made = 1`. `data` is the job payload; only `decorrelatedJitter`
/// mutates it. `custom` resolves `BackoffOpts::Custom` by name; an unresolved
/// name is a configuration error.
pub fn compute_backoff(
    opts: &BackoffOpts,
    attempts_made: u32,
    error_name: Option<&str>,
    data: &mut Value,
    custom: Option<&CustomBackoff>,
) -> Result<u64, CoreError> {
    let raw = match opts {
        BackoffOpts::Fixed { delay, jitter, .. } => apply_jitter(*delay, *jitter),
        BackoffOpts::Exponential { delay, jitter, .. } => {
            let exp = attempts_made.saturating_sub(1).min(63);
            let base = delay.saturating_mul(1u64 << exp);
            apply_jitter(base, *jitter)
        }
        BackoffOpts::Linear { delay, .. } => delay.saturating_mul(attempts_made as u64),
        BackoffOpts::Polynomial { delay, exponent, .. } => {
            let exponent = exponent.unwrap_or(2.0);
            if exponent <= 0.0 {
                return Err(CoreError::InvalidOptions(format!(
                    "polynomial backoff exponent must be positive, got {exponent}"
                )));
            }
            (*delay as f64 * (attempts_made as f64).powf(exponent)).round() as u64
        }
        BackoffOpts::DecorrelatedJitter { base_delay, max_delay } => {
            decorrelated_jitter(*base_delay, *max_delay, data)
        }
        BackoffOpts::Custom { name, .. } => match custom {
            Some(compute) => compute(attempts_made, error_name, data),
            None => {
                return Err(CoreError::InvalidOptions(format!("unknown backoff strategy: {name}")))
            }
        },
    };

    Ok(match opts.max_delay() {
        Some(max) if max > 0 => raw.min(max),
        _ => raw,
    })
}

/// Uniform in `[delay * (1 - jitter), delay)`; no-op for zero jitter.
fn apply_jitter(delay: u64, jitter: Option<f64>) -> u64 {
    match jitter {
        Some(j) if j > 0.0 && delay > 0 => {
            let lo = (delay as f64 * (1.0 - j)).floor() as u64;
            rand::thread_rng().gen_range(lo..delay.max(lo + 1))
        }
        _ => delay,
    }
}

/// `min(maxDelay, floor(random(baseDelay, prevDelay * 3)))`, persisting the
/// result into the reserved data field.
fn decorrelated_jitter(base_delay: u64, max_delay: u64, data: &mut Value) -> u64 {
    let prev = data
        .get(PREV_DELAY_FIELD)
        .and_then(Value::as_u64)
        .unwrap_or(base_delay)
        .max(base_delay);
    let hi = prev.saturating_mul(3).max(base_delay + 1);
    let next = rand::thread_rng().gen_range(base_delay..hi).min(max_delay);
    if let Value::Object(map) = data {
        map.insert(PREV_DELAY_FIELD.to_string(), Value::from(next));
    }
    next
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
