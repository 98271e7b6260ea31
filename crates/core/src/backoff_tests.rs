// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn compute(opts: &BackoffOpts, attempts_made: u32) -> u64 {
    let mut data = json!({});
    compute_backoff(opts, attempts_made, None, &mut data, None).unwrap()
}

#[parameterized(
    first = { 1, 1000 },
    second = { 2, 2000 },
    fifth = { 5, 5000 },
)]
fn linear_scales_with_attempts(attempts: u32, expected: u64) {
    let opts = BackoffOpts::Linear { delay: 1000, max_delay: None };
    assert_eq!(compute(&opts, attempts), expected);
}

#[parameterized(
    first = { 1, 1000 },
    second = { 2, 2000 },
    third = { 3, 4000 },
    sixth = { 6, 32000 },
)]
fn exponential_doubles_per_attempt(attempts: u32, expected: u64) {
    let opts = BackoffOpts::Exponential { delay: 1000, jitter: None, max_delay: None };
    assert_eq!(compute(&opts, attempts), expected);
}

#[test]
fn polynomial_cube_law() {
    let opts = BackoffOpts::Polynomial { delay: 100, exponent: Some(3.0), max_delay: None };
    assert_eq!(compute(&opts, 2), 800);
}

#[test]
fn polynomial_defaults_to_square() {
    let opts = BackoffOpts::Polynomial { delay: 100, exponent: None, max_delay: None };
    assert_eq!(compute(&opts, 3), 900);
}

#[test]
fn fixed_ignores_attempts() {
    let opts = BackoffOpts::Fixed { delay: 750, jitter: None, max_delay: None };
    assert_eq!(compute(&opts, 1), 750);
    assert_eq!(compute(&opts, 9), 750);
}

#[test]
fn fixed_jitter_stays_in_band() {
    let opts = BackoffOpts::Fixed { delay: 1000, jitter: Some(0.5), max_delay: None };
    for _ in 0..200 {
        let d = compute(&opts, 1);
        assert!((500..1000).contains(&d), "delay {d} out of [500, 1000)");
    }
}

#[test]
fn max_delay_clamps_all_strategies() {
    let opts = BackoffOpts::Exponential { delay: 1000, jitter: None, max_delay: Some(3000) };
    assert_eq!(compute(&opts, 10), 3000);

    let opts = BackoffOpts::Linear { delay: 1000, max_delay: Some(2500) };
    assert_eq!(compute(&opts, 5), 2500);
}

#[test]
fn decorrelated_jitter_persists_prev_delay() {
    let opts = BackoffOpts::DecorrelatedJitter { base_delay: 100, max_delay: 30_000 };
    let mut data = json!({"payload": "kept"});
    let first = compute_backoff(&opts, 1, None, &mut data, None).unwrap();
    assert!((100..=30_000).contains(&first));
    assert_eq!(data[PREV_DELAY_FIELD], json!(first));
    // User payload survives the mutation.
    assert_eq!(data["payload"], "kept");

    let second = compute_backoff(&opts, 2, None, &mut data, None).unwrap();
    assert!(second >= 100);
    assert!(second <= first.max(100) * 3);
    assert_eq!(data[PREV_DELAY_FIELD], json!(second));
}

#[test]
fn decorrelated_jitter_respects_max_delay() {
    let opts = BackoffOpts::DecorrelatedJitter { base_delay: 100, max_delay: 150 };
    let mut data = json!({ PREV_DELAY_FIELD: 10_000 });
    for _ in 0..50 {
        let d = compute_backoff(&opts, 3, None, &mut data, None).unwrap();
        assert!(d <= 150);
    }
}

#[test]
fn custom_strategy_resolves_by_registry() {
    let opts = BackoffOpts::Custom { name: "stepwise".into(), max_delay: Some(500) };
    let compute_fn: CustomBackoff = Arc::new(|attempts, _err, _data| 300 * attempts as u64);
    let mut data = json!({});
    let d = compute_backoff(&opts, 1, None, &mut data, Some(&compute_fn)).unwrap();
    assert_eq!(d, 300);
    // Clamp applies to custom results as well.
    let d = compute_backoff(&opts, 3, None, &mut data, Some(&compute_fn)).unwrap();
    assert_eq!(d, 500);
}

#[test]
fn unresolved_custom_strategy_errors() {
    let opts = BackoffOpts::Custom { name: "missing".into(), max_delay: None };
    let mut data = json!({});
    assert!(compute_backoff(&opts, 1, None, &mut data, None).is_err());
}

#[test]
fn custom_strategy_sees_error_name() {
    let opts = BackoffOpts::Custom { name: "by-error".into(), max_delay: None };
    let compute_fn: CustomBackoff =
        Arc::new(|_, err, _| if err == Some("Timeout") { 50 } else { 5000 });
    let mut data = json!({});
    let d = compute_backoff(&opts, 1, Some("Timeout"), &mut data, Some(&compute_fn)).unwrap();
    assert_eq!(d, 50);
}
