// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time source for the queue.
//!
//! Every durable timestamp is wall-clock epoch milliseconds; `Instant` is
//! only used for process-local interval math (lock renewal, stall cadence).
//! The trait carries the two schedule computations the state scripts are
//! fed so call sites cannot mix the units up.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Epoch the fake clock starts at.
pub const FAKE_EPOCH_MS: u64 = 1_700_000_000_000;

/// A clock that provides the current time.
pub trait Clock: Clone + Send + Sync {
    /// Monotonic instant for local interval math.
    fn now(&self) -> Instant;

    /// Wall-clock epoch milliseconds, the unit of every durable timestamp.
    fn epoch_ms(&self) -> u64;

    /// Absolute fire time for a delay measured from now (delayed set
    /// scores, lock deadlines).
    fn fire_at(&self, delay_ms: u64) -> u64 {
        self.epoch_ms().saturating_add(delay_ms)
    }

    /// Oldest timestamp that survives a grace period (clean sweeps,
    /// age-based retention).
    fn cutoff(&self, grace_ms: u64) -> u64 {
        self.epoch_ms().saturating_sub(grace_ms)
    }
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

struct FakeState {
    instant: Instant,
    epoch_ms: u64,
}

/// Fake clock for testing; both time axes advance together and only under
/// explicit control.
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClock {
    /// A fake clock pinned to [`FAKE_EPOCH_MS`].
    pub fn new() -> Self {
        Self::at(FAKE_EPOCH_MS)
    }

    /// A fake clock pinned to the given epoch.
    pub fn at(epoch_ms: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState { instant: Instant::now(), epoch_ms })),
        }
    }

    /// Advance both time axes.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.instant += duration;
        state.epoch_ms += duration.as_millis() as u64;
    }

    /// Advance both time axes by whole milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
