// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit breaker integration specs.

use crate::prelude::*;
use grist_core::event::Event;
use grist_worker::{CircuitBreakerOptions, CircuitState};

/// Three consecutive failures open the circuit: the open event carries the
/// counters, later adds stay parked, and close() returns promptly.
#[tokio::test]
async fn breaker_opens_after_threshold_failures() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("brittle", queue_options(&prefix)).await.unwrap();
    let options = worker_options(&prefix).circuit_breaker(CircuitBreakerOptions {
        threshold: 3,
        duration: Duration::from_secs(60),
        half_open_max_attempts: 1,
    });
    let worker = Worker::start(
        "brittle",
        failing_processor("dependency down"),
        options,
    )
    .await
    .unwrap();

    for _ in 0..3 {
        queue.add("j", json!({}), JobOpts::default()).await.unwrap();
    }

    poll_until(Duration::from_secs(15), || async {
        (worker.get_circuit_breaker_state() == Some(CircuitState::Open)).then_some(())
    })
    .await;

    // the open event carries the failure counters
    let events = poll_until(Duration::from_secs(5), || async {
        let events = events_of(&prefix, "brittle").await;
        events
            .iter()
            .any(|e| matches!(e, Event::CircuitOpen { .. }))
            .then_some(events)
    })
    .await;
    assert!(events
        .iter()
        .any(|e| *e == Event::CircuitOpen { failures: 3, threshold: 3 }));

    // while open, new jobs are not fetched
    let parked = queue.add("parked", json!({}), JobOpts::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(queue.get_state(&parked).await.unwrap(), Some(JobState::Wait));

    // close() resolves promptly even though the duration timer is pending
    let closed_in = std::time::Instant::now();
    worker.close().await;
    assert!(closed_in.elapsed() < Duration::from_secs(5));

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// Rate limiting: the server-side limiter admits at most `max` jobs per
/// window and workers honor the returned TTL.
#[tokio::test]
async fn rate_limiter_paces_fetches() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("throttled", queue_options(&prefix)).await.unwrap();
    let processed = Arc::new(AtomicU32::new(0));
    let seen = processed.clone();
    let processor: Processor = Arc::new(move |_job, _ctx| {
        let seen = seen.clone();
        Box::pin(async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(json!(null))
        })
    });
    let options = worker_options(&prefix)
        .limiter(grist_core::opts::RateLimit { max: 2, duration_ms: 2_000 });
    let worker = Worker::start("throttled", processor, options).await.unwrap();

    for _ in 0..4 {
        queue.add("j", json!({}), JobOpts::default()).await.unwrap();
    }

    // within the first window only the admitted jobs run
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert!(processed.load(Ordering::SeqCst) <= 2);

    // eventually every job completes
    poll_until(Duration::from_secs(15), || async {
        (processed.load(Ordering::SeqCst) == 4).then_some(())
    })
    .await;

    worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}
