// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry-then-succeed specs.

use crate::prelude::*;
use grist_core::event::Event;

/// Fails twice, succeeds on the third attempt: completed with
/// attemptsMade = 3, two delayed transitions, one completed event, no DLQ.
#[tokio::test]
async fn retry_twice_then_succeed() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("retries", queue_options(&prefix)).await.unwrap();
    let (processor, calls) = flaky_processor(2, json!("ok"));
    let worker = Worker::start("retries", processor, worker_options(&prefix)).await.unwrap();

    let opts = JobOpts::default()
        .attempts(3)
        .backoff(BackoffConfig::Opts(BackoffOpts::Fixed {
            delay: 10,
            jitter: None,
            max_delay: None,
        }));
    let job_id = queue.add("job", json!({}), opts).await.unwrap();

    let job = poll_until(Duration::from_secs(15), || async {
        match queue.get_job(&job_id).await.unwrap() {
            Some(job) if job.finished_on.is_some() && job.returnvalue.is_some() => Some(job),
            _ => None,
        }
    })
    .await;

    assert_eq!(queue.get_state(&job_id).await.unwrap(), Some(JobState::Completed));
    assert_eq!(job.attempts_made, 3);
    assert_eq!(job.returnvalue, Some(json!("ok")));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let events = events_of(&prefix, "retries").await;
    let completed = events
        .iter()
        .filter(|e| matches!(e, Event::Completed { .. }))
        .count();
    let delayed = events.iter().filter(|e| matches!(e, Event::Delayed { .. })).count();
    assert_eq!(completed, 1, "exactly one completed event: {events:?}");
    assert_eq!(delayed, 2, "one delayed transition per failed attempt: {events:?}");

    worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// A single-attempt failure lands in the failed set with its reason.
#[tokio::test]
async fn failure_without_retries_lands_in_failed() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("one-shot", queue_options(&prefix)).await.unwrap();
    let worker = Worker::start(
        "one-shot",
        failing_processor("nope"),
        worker_options(&prefix),
    )
    .await
    .unwrap();

    let job_id = queue.add("job", json!({}), JobOpts::default()).await.unwrap();

    let job = poll_until(Duration::from_secs(10), || async {
        match queue.get_state(&job_id).await.unwrap() {
            Some(JobState::Failed) => queue.get_job(&job_id).await.unwrap(),
            _ => None,
        }
    })
    .await;

    assert_eq!(job.failed_reason.as_deref(), Some("nope"));
    assert_eq!(job.attempts_made, 1);
    assert_eq!(job.stacktrace.len(), 1);

    worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}
