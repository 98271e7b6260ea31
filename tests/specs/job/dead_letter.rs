// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead-letter routing and replay specs.

use crate::prelude::*;
use grist_worker::DeadLetterOptions;

/// Exhausted retries route to the DLQ with provenance; the failed set
/// stays empty.
#[tokio::test]
async fn exhausted_retries_route_to_dlq() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect(
        "orders",
        queue_options(&prefix).dead_letter_queue("orders-dlq"),
    )
    .await
    .unwrap();
    let options = worker_options(&prefix)
        .dead_letter_queue(DeadLetterOptions { queue_name: "orders-dlq".into() });
    let worker = Worker::start(
        "orders",
        failing_processor("Connection refused"),
        options,
    )
    .await
    .unwrap();

    let opts = JobOpts::default().attempts(3).backoff(BackoffConfig::Millis(10));
    let job_id = queue.add("t", json!({"orderId": 123}), opts).await.unwrap();

    let dead = poll_until(Duration::from_secs(15), || async {
        let jobs = queue.get_dead_letter_jobs(0, -1).await.unwrap();
        jobs.into_iter().next()
    })
    .await;

    let meta = dead.dlq_meta().expect("dead letter carries _dlqMeta");
    assert_eq!(meta.source_queue, "orders");
    assert_eq!(meta.original_job_id, job_id);
    assert_eq!(meta.failed_reason, "Connection refused");
    assert_eq!(meta.attempts_made, 3);
    assert_eq!(meta.stacktrace.len(), 3);
    assert_eq!(dead.data["orderId"], 123);

    // the source queue keeps no failed residue
    let counts = queue.get_counts(&[JobState::Failed]).await.unwrap();
    assert_eq!(counts[&JobState::Failed], 0);
    assert_eq!(queue.get_dead_letter_count().await.unwrap(), 1);

    worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// An unrecoverable error takes a single attempt regardless of the
/// configured budget.
#[tokio::test]
async fn unrecoverable_error_skips_retries() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect(
        "imports",
        queue_options(&prefix).dead_letter_queue("imports-dlq"),
    )
    .await
    .unwrap();
    let processor: Processor = Arc::new(|_job, _ctx| {
        Box::pin(async { Err(ProcessError::unrecoverable("bad")) })
    });
    let options = worker_options(&prefix)
        .dead_letter_queue(DeadLetterOptions { queue_name: "imports-dlq".into() });
    let worker = Worker::start("imports", processor, options).await.unwrap();

    queue.add("e", json!({}), JobOpts::default().attempts(5)).await.unwrap();

    let dead = poll_until(Duration::from_secs(10), || async {
        let jobs = queue.get_dead_letter_jobs(0, -1).await.unwrap();
        jobs.into_iter().next()
    })
    .await;

    let meta = dead.dlq_meta().unwrap();
    assert_eq!(meta.attempts_made, 1);
    assert_eq!(meta.failed_reason, "bad");

    worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// Replay restores the original payload with a fresh attempt budget and
/// shrinks the DLQ by exactly the replayed count.
#[tokio::test]
async fn replay_restores_the_original_job() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect(
        "syncs",
        queue_options(&prefix).dead_letter_queue("syncs-dlq"),
    )
    .await
    .unwrap();
    let options = worker_options(&prefix)
        .dead_letter_queue(DeadLetterOptions { queue_name: "syncs-dlq".into() });
    let worker =
        Worker::start("syncs", failing_processor("boom"), options).await.unwrap();

    queue.add("s", json!({"n": 7}), JobOpts::default()).await.unwrap();
    let dead = poll_until(Duration::from_secs(10), || async {
        queue.get_dead_letter_jobs(0, -1).await.unwrap().into_iter().next()
    })
    .await;
    // stop the worker so the replayed job stays put
    worker.close().await;

    let new_id = queue.replay_dead_letter(&dead.id).await.unwrap();
    assert_eq!(queue.get_dead_letter_count().await.unwrap(), 0);

    let replayed = queue.get_job(&new_id).await.unwrap().unwrap();
    assert_eq!(replayed.data, json!({"n": 7}));
    assert_eq!(replayed.attempts_made, 0);
    assert!(replayed.dlq_meta().is_none());

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}
