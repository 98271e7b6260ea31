// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn bare_number_normalizes_to_fixed() {
    let config: BackoffConfig = serde_json::from_str("5000").unwrap();
    assert_eq!(
        config.normalize(),
        BackoffOpts::Fixed { delay: 5000, jitter: None, max_delay: None }
    );
}

#[test]
fn tagged_backoff_round_trips() {
    let json = r#"{"type":"exponential","delay":1000,"jitter":0.5}"#;
    let config: BackoffConfig = serde_json::from_str(json).unwrap();
    match config.normalize() {
        BackoffOpts::Exponential { delay, jitter, max_delay } => {
            assert_eq!(delay, 1000);
            assert_eq!(jitter, Some(0.5));
            assert_eq!(max_delay, None);
        }
        other => panic!("expected exponential, got {other:?}"),
    }
}

#[test]
fn decorrelated_jitter_requires_max_delay() {
    let json = r#"{"type":"decorrelatedJitter","baseDelay":100,"maxDelay":30000}"#;
    let config: BackoffConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.normalize().max_delay(), Some(30000));
}

#[parameterized(
    zero = { 0.0 },
    negative = { -2.0 },
)]
fn polynomial_rejects_non_positive_exponent(exponent: f64) {
    let opts = JobOpts::default().backoff(BackoffConfig::Opts(BackoffOpts::Polynomial {
        delay: 100,
        exponent: Some(exponent),
        max_delay: None,
    }));
    assert!(opts.validate().is_err());
}

#[test]
fn jitter_outside_unit_interval_rejected() {
    let opts = JobOpts::default().backoff(BackoffConfig::Opts(BackoffOpts::Fixed {
        delay: 100,
        jitter: Some(1.5),
        max_delay: None,
    }));
    assert!(opts.validate().is_err());
}

#[test]
fn zero_attempts_rejected() {
    let opts = JobOpts::default().attempts(0);
    assert!(opts.validate().is_err());
}

#[parameterized(
    flag_true = { RemovePolicy::Flag(true), 0 },
    flag_false = { RemovePolicy::Flag(false), -1 },
    count = { RemovePolicy::Count(25), 25 },
    criteria_count = { RemovePolicy::Criteria(KeepJobs { age: None, count: Some(3) }), 3 },
    criteria_age_only = { RemovePolicy::Criteria(KeepJobs { age: Some(60), count: None }), -1 },
)]
fn remove_policy_keep_count(policy: RemovePolicy, expected: i64) {
    assert_eq!(policy.keep_count(), expected);
}

#[test]
fn remove_policy_age() {
    let policy = RemovePolicy::Criteria(KeepJobs { age: Some(3600), count: None });
    assert_eq!(policy.keep_age(), Some(3600));
    assert_eq!(RemovePolicy::Flag(true).keep_age(), None);
}

#[test]
fn job_opts_default_is_valid() {
    let opts = JobOpts::default();
    assert_eq!(opts.attempts, 1);
    assert_eq!(opts.delay, 0);
    assert_eq!(opts.priority, 0);
    assert!(!opts.lifo);
    assert!(opts.validate().is_ok());
}

#[test]
fn opts_serde_uses_camel_case() {
    let opts = JobOpts::default()
        .deduplication_id("order-1")
        .parent(ParentRef { id: "9".into(), queue: "parents".into() });
    let json = serde_json::to_value(&opts).unwrap();
    assert_eq!(json["deduplicationId"], "order-1");
    assert_eq!(json["parent"]["queue"], "parents");
    assert_eq!(json["failParentOnFailure"], false);
}
