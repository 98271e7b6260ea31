// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker circuit breaker.
//!
//! Three states gate fetching: CLOSED counts consecutive failures, OPEN
//! refuses fetches until the duration timer fires, HALF_OPEN admits a
//! bounded number of trial jobs. State is process-local; transitions are
//! reported through a callback only, never emitted here.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerOptions {
    /// Consecutive failures that open the circuit.
    pub threshold: u32,
    /// How long the circuit stays open before probing.
    pub duration: Duration,
    /// Trial jobs admitted while half-open.
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerOptions {
    fn default() -> Self {
        Self { threshold: 5, duration: Duration::from_secs(60), half_open_max_attempts: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

grist_core::simple_display! {
    CircuitState {
        Closed => "closed",
        Open => "open",
        HalfOpen => "half-open",
    }
}

/// Transition notifications delivered to the configured callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitTransition {
    Opened { failures: u32, threshold: u32 },
    HalfOpened,
    Closed { test_job_id: Option<String> },
}

type TransitionCallback = Box<dyn Fn(CircuitTransition) + Send + Sync>;

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    trials_started: u32,
    trials_succeeded: u32,
    closed_down: bool,
    timer: Option<JoinHandle<()>>,
}

pub struct CircuitBreaker {
    options: CircuitBreakerOptions,
    inner: Mutex<Inner>,
    on_transition: Mutex<Option<TransitionCallback>>,
}

impl CircuitBreaker {
    pub fn new(options: CircuitBreakerOptions) -> Arc<Self> {
        Arc::new(Self {
            options,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                trials_started: 0,
                trials_succeeded: 0,
                closed_down: false,
                timer: None,
            }),
            on_transition: Mutex::new(None),
        })
    }

    /// Register the transition callback (replaces any previous one).
    pub fn set_on_transition(&self, callback: TransitionCallback) {
        *self.on_transition.lock() = Some(callback);
    }

    fn notify(&self, transition: CircuitTransition) {
        if let Some(callback) = self.on_transition.lock().as_ref() {
            callback(transition);
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Gate consulted before every fetch.
    pub fn should_allow_job(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.trials_started < self.options.half_open_max_attempts {
                    inner.trials_started += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful job outcome.
    pub fn record_success(self: &Arc<Self>, job_id: &str) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.trials_succeeded += 1;
                if inner.trials_succeeded >= self.options.half_open_max_attempts {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.trials_started = 0;
                    inner.trials_succeeded = 0;
                    drop(inner);
                    self.notify(CircuitTransition::Closed {
                        test_job_id: Some(job_id.to_string()),
                    });
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed job outcome. Stalled jobs must not be reported here.
    pub fn record_failure(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.options.threshold {
                    let failures = inner.consecutive_failures;
                    inner.state = CircuitState::Open;
                    self.schedule_probe(&mut inner);
                    drop(inner);
                    self.notify(CircuitTransition::Opened {
                        failures,
                        threshold: self.options.threshold,
                    });
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.trials_started = 0;
                inner.trials_succeeded = 0;
                self.schedule_probe(&mut inner);
                drop(inner);
                self.notify(CircuitTransition::Opened {
                    failures: self.options.threshold,
                    threshold: self.options.threshold,
                });
            }
            CircuitState::Open => {}
        }
    }

    /// Arm the OPEN -> HALF_OPEN timer. Caller holds the lock.
    fn schedule_probe(self: &Arc<Self>, inner: &mut Inner) {
        if inner.closed_down {
            return;
        }
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        let breaker = Arc::downgrade(self);
        let duration = self.options.duration;
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let Some(breaker) = breaker.upgrade() else {
                return;
            };
            let mut inner = breaker.inner.lock();
            if inner.closed_down || inner.state != CircuitState::Open {
                return;
            }
            inner.state = CircuitState::HalfOpen;
            inner.trials_started = 0;
            inner.trials_succeeded = 0;
            drop(inner);
            breaker.notify(CircuitTransition::HalfOpened);
        }));
    }

    /// Tear down: aborts the timer and disables further scheduling.
    /// Resolves immediately even while the circuit is open.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed_down = true;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
