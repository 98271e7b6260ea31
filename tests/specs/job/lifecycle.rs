// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Producer-side lifecycle specs: add, inspect, remove, pause, dedup.

use crate::prelude::*;
use grist_core::event::Event;

/// add / getJob / remove / getJob round trip.
#[tokio::test]
async fn add_get_remove_round_trip() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("round-trip", queue_options(&prefix)).await.unwrap();

    let job_id = queue
        .add("send", json!({"to": "a@b.c"}), JobOpts::default().attempts(2))
        .await
        .unwrap();

    let job = queue.get_job(&job_id).await.unwrap().expect("job exists after add");
    assert_eq!(job.name, "send");
    assert_eq!(job.data["to"], "a@b.c");
    assert_eq!(job.opts.attempts, 2);
    assert_eq!(queue.get_state(&job_id).await.unwrap(), Some(JobState::Wait));

    queue.remove(&job_id).await.unwrap();
    assert!(queue.get_job(&job_id).await.unwrap().is_none());
    assert_eq!(queue.get_state(&job_id).await.unwrap(), None);

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// Destination routing: delay and priority pick their sets.
#[tokio::test]
async fn destination_by_flags() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("routing", queue_options(&prefix)).await.unwrap();

    let plain = queue.add("p", json!({}), JobOpts::default()).await.unwrap();
    let delayed = queue
        .add("d", json!({}), JobOpts::default().delay(60_000))
        .await
        .unwrap();
    let prioritized = queue
        .add("hi", json!({}), JobOpts::default().priority(2))
        .await
        .unwrap();

    assert_eq!(queue.get_state(&plain).await.unwrap(), Some(JobState::Wait));
    assert_eq!(queue.get_state(&delayed).await.unwrap(), Some(JobState::Delayed));
    assert_eq!(
        queue.get_state(&prioritized).await.unwrap(),
        Some(JobState::Prioritized)
    );

    let counts = queue
        .get_counts(&[JobState::Wait, JobState::Delayed, JobState::Prioritized])
        .await
        .unwrap();
    assert_eq!(counts[&JobState::Wait], 1);
    assert_eq!(counts[&JobState::Delayed], 1);
    assert_eq!(counts[&JobState::Prioritized], 1);

    // promote moves the delayed job to ready ahead of time
    queue.promote(&delayed).await.unwrap();
    assert_eq!(queue.get_state(&delayed).await.unwrap(), Some(JobState::Wait));

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// A paused queue parks adds in the paused list and resumes them in order.
#[tokio::test]
async fn paused_queue_parks_new_jobs() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("pausing", queue_options(&prefix)).await.unwrap();

    queue.pause().await.unwrap();
    assert!(queue.is_paused().await.unwrap());
    let job_id = queue.add("j", json!({}), JobOpts::default()).await.unwrap();
    assert_eq!(queue.get_state(&job_id).await.unwrap(), Some(JobState::Paused));

    queue.resume().await.unwrap();
    assert_eq!(queue.get_state(&job_id).await.unwrap(), Some(JobState::Wait));

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// A second add with the same deduplication id returns the existing job id
/// and emits a duplicated event.
#[tokio::test]
async fn deduplication_short_circuits() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("dedup", queue_options(&prefix)).await.unwrap();

    let opts = JobOpts::default().deduplication_id("order-9");
    let first = queue.add("a", json!({"v": 1}), opts.clone()).await.unwrap();
    let second = queue.add("a", json!({"v": 2}), opts).await.unwrap();
    assert_eq!(first, second);

    let counts = queue.get_counts(&[JobState::Wait]).await.unwrap();
    assert_eq!(counts[&JobState::Wait], 1);

    let events = events_of(&prefix, "dedup").await;
    assert!(
        events
            .iter()
            .any(|e| matches!(e, Event::Duplicated { deduplication_id, .. } if deduplication_id == "order-9")),
        "expected a duplicated event: {events:?}"
    );

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// The events reader re-dispatches typed events in per-job order:
/// waiting, then active, then completed.
#[tokio::test]
async fn events_reader_preserves_per_job_order() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("observed", queue_options(&prefix)).await.unwrap();
    let reader = grist_queue::QueueEvents::run(
        "observed",
        grist_queue::QueueEventsOptions {
            prefix: prefix.clone(),
            start_id: "0-0".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let mut rx = reader.subscribe();

    let worker = Worker::start(
        "observed",
        crate::prelude::ok_processor(json!(1)),
        worker_options(&prefix),
    )
    .await
    .unwrap();
    let job_id = queue.add("watched", json!({}), JobOpts::default()).await.unwrap();

    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !matches!(seen.last(), Some(Event::Completed { .. })) {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("events within the deadline")
            .expect("reader stays alive");
        if event.1.job_id() == Some(job_id.as_str()) {
            seen.push(event.1);
        }
    }

    assert!(matches!(seen[0], Event::Waiting { .. }), "events: {seen:?}");
    assert!(seen.iter().any(|e| matches!(e, Event::Active { .. })), "events: {seen:?}");
    assert!(matches!(seen.last(), Some(Event::Completed { .. })), "events: {seen:?}");

    reader.close().await;
    worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// addBulk inserts atomically and returns ids in input order.
#[tokio::test]
async fn add_bulk_preserves_order() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("bulk", queue_options(&prefix)).await.unwrap();

    let ids = queue
        .add_bulk(vec![
            ("one".into(), json!({"i": 1}), JobOpts::default()),
            ("two".into(), json!({"i": 2}), JobOpts::default()),
            ("three".into(), json!({"i": 3}), JobOpts::default()),
        ])
        .await
        .unwrap();
    assert_eq!(ids.len(), 3);

    for (id, name) in ids.iter().zip(["one", "two", "three"]) {
        let job = queue.get_job(id).await.unwrap().unwrap();
        assert_eq!(job.name, name);
    }

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}
