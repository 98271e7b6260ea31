// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::keys::KeySpace;
use crate::opts::ParentRef;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    wait = { JobState::Wait, "wait" },
    paused = { JobState::Paused, "paused" },
    active = { JobState::Active, "active" },
    delayed = { JobState::Delayed, "delayed" },
    prioritized = { JobState::Prioritized, "prioritized" },
    waiting_children = { JobState::WaitingChildren, "waiting-children" },
    completed = { JobState::Completed, "completed" },
    failed = { JobState::Failed, "failed" },
)]
fn state_display_round_trip(state: JobState, s: &str) {
    assert_eq!(state.to_string(), s);
    assert_eq!(s.parse::<JobState>().unwrap(), state);
}

#[test]
fn unknown_state_fails_to_parse() {
    assert!("gone".parse::<JobState>().is_err());
}

#[test]
fn finished_states() {
    assert!(JobState::Completed.is_finished());
    assert!(JobState::Failed.is_finished());
    assert!(!JobState::Active.is_finished());
    assert!(!JobState::WaitingChildren.is_finished());
}

fn hash(entries: &[(&str, &str)]) -> HashMap<String, Vec<u8>> {
    entries.iter().map(|(k, v)| (k.to_string(), v.as_bytes().to_vec())).collect()
}

#[test]
fn from_hash_parses_lifecycle_fields() {
    let mut fields = hash(&[
        ("name", "send-email"),
        ("data", r#"{"to":"a@b.c"}"#),
        ("timestamp", "1700000000000"),
        ("attemptsMade", "2"),
        ("attemptsStarted", "3"),
        ("processedOn", "1700000001000"),
        ("failedReason", "boom"),
        ("stacktrace", r#"["trace-2","trace-1"]"#),
    ]);
    let opts = JobOpts::default().attempts(3);
    fields.insert("opts".into(), crate::codec::encode(&opts).unwrap());

    let job = Job::from_hash("mail", "7", fields).unwrap();
    assert_eq!(job.name, "send-email");
    assert_eq!(job.data["to"], "a@b.c");
    assert_eq!(job.opts.attempts, 3);
    assert_eq!(job.attempts_made, 2);
    assert_eq!(job.attempts_started, 3);
    assert_eq!(job.processed_on, Some(1_700_000_001_000));
    assert_eq!(job.finished_on, None);
    assert_eq!(job.failed_reason.as_deref(), Some("boom"));
    assert_eq!(job.stacktrace.len(), 2);
}

#[test]
fn from_hash_tolerates_missing_fields() {
    let job = Job::from_hash("q", "1", HashMap::new()).unwrap();
    assert_eq!(job.name, "");
    assert_eq!(job.data, Value::Null);
    assert_eq!(job.attempts_made, 0);
}

#[test]
fn job_key_uses_layout() {
    let job = Job::builder().id("42").build();
    let keys = KeySpace::new("grist", "test");
    assert_eq!(job.key(&keys), "grist:test:42");
}

#[test]
fn attempts_exhausted_respects_opts() {
    let mut job = Job::builder().opts(JobOpts::default().attempts(3)).build();
    assert!(!job.attempts_exhausted());
    job.attempts_made = 3;
    assert!(job.attempts_exhausted());
}

#[test]
fn record_failure_bounds_the_ring() {
    let mut opts = JobOpts::default();
    opts.stacktrace_limit = 2;
    let mut job = Job::builder().opts(opts).build();

    job.record_failure("first", "t1");
    job.record_failure("second", "t2");
    job.record_failure("third", "t3");

    assert_eq!(job.failed_reason.as_deref(), Some("third"));
    // Newest first, oldest dropped.
    assert_eq!(job.stacktrace, vec!["t3".to_string(), "t2".to_string()]);
}

#[test]
fn dlq_meta_round_trip() {
    let meta = DlqMeta {
        source_queue: "orders".into(),
        original_job_id: "12".into(),
        failed_reason: "Connection refused".into(),
        stacktrace: vec!["t".into()],
        attempts_made: 3,
        dead_lettered_at: 1_700_000_000_000,
        original_timestamp: 1_699_999_000_000,
        original_opts: JobOpts::default().parent(ParentRef { id: "1".into(), queue: "q".into() }),
    };
    let data = json!({ "orderId": 123, DLQ_META_FIELD: serde_json::to_value(&meta).unwrap() });
    let job = Job::builder().data(data).build();

    assert_eq!(job.dlq_meta().unwrap(), meta);
    let replay = job.data_without_dlq_meta();
    assert_eq!(replay, json!({"orderId": 123}));
}

#[test]
fn dlq_meta_absent_on_plain_jobs() {
    let job = Job::builder().data(json!({"x": 1})).build();
    assert!(job.dlq_meta().is_none());
}
