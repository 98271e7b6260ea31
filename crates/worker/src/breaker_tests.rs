// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn options(threshold: u32, duration_ms: u64) -> CircuitBreakerOptions {
    CircuitBreakerOptions {
        threshold,
        duration: Duration::from_millis(duration_ms),
        half_open_max_attempts: 1,
    }
}

#[tokio::test]
async fn opens_after_threshold_consecutive_failures() {
    let breaker = CircuitBreaker::new(options(3, 60_000));
    assert!(breaker.should_allow_job());
    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.should_allow_job());
}

#[tokio::test]
async fn success_resets_the_failure_counter() {
    let breaker = CircuitBreaker::new(options(3, 60_000));
    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success("1");
    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn duration_expiry_moves_open_to_half_open() {
    let breaker = CircuitBreaker::new(options(1, 5_000));
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn half_open_admits_bounded_trials() {
    let breaker = CircuitBreaker::new(options(1, 1_000));
    breaker.record_failure();
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    // half_open_max_attempts = 1: one trial allowed, the next refused.
    assert!(breaker.should_allow_job());
    assert!(!breaker.should_allow_job());
}

#[tokio::test(start_paused = true)]
async fn half_open_success_closes_the_circuit() {
    let breaker = CircuitBreaker::new(options(1, 1_000));
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let seen = transitions.clone();
    breaker.set_on_transition(Box::new(move |t| seen.lock().push(t)));

    breaker.record_failure();
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(breaker.should_allow_job());
    breaker.record_success("42");

    assert_eq!(breaker.state(), CircuitState::Closed);
    let transitions = transitions.lock();
    assert!(transitions.contains(&CircuitTransition::Opened { failures: 1, threshold: 1 }));
    assert!(transitions.contains(&CircuitTransition::HalfOpened));
    assert!(transitions
        .contains(&CircuitTransition::Closed { test_job_id: Some("42".to_string()) }));
}

#[tokio::test(start_paused = true)]
async fn half_open_failure_reopens_and_restarts_the_timer() {
    let breaker = CircuitBreaker::new(options(1, 1_000));
    breaker.record_failure();
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(breaker.should_allow_job());
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    // The restarted timer probes again after another full duration.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn close_during_open_resolves_immediately_and_stops_probing() {
    let breaker = CircuitBreaker::new(options(1, 60_000));
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    breaker.close();
    // Even after the would-be expiry, no transition fires.
    tokio::time::sleep(Duration::from_millis(61_000)).await;
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn open_state_ignores_further_outcomes() {
    let breaker = CircuitBreaker::new(options(1, 60_000));
    breaker.record_failure();
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    breaker.set_on_transition(Box::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    }));
    breaker.record_failure();
    breaker.record_success("1");
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn state_display() {
    assert_eq!(CircuitState::Closed.to_string(), "closed");
    assert_eq!(CircuitState::Open.to_string(), "open");
    assert_eq!(CircuitState::HalfOpen.to_string(), "half-open");
}
