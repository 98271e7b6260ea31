// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the integration specs.

#![allow(dead_code)]

pub use grist_core::job::JobState;
pub use grist_core::opts::{BackoffConfig, BackoffOpts, JobOpts};
pub use grist_queue::{Queue, QueueOptions};
pub use grist_worker::{ProcessError, Processor, Worker, WorkerOptions};
pub use serde_json::{json, Value};
pub use std::sync::atomic::{AtomicU32, Ordering};
pub use std::sync::Arc;
pub use std::time::Duration;

/// Specs skip early when no Redis is configured.
pub fn redis_ready() -> bool {
    let set = |name: &str| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);
    if set("REDIS_URL") || set("REDIS_HOST") {
        true
    } else {
        eprintln!("skipping: no REDIS_URL/REDIS_HOST configured");
        false
    }
}

/// Per-test key prefix so runs never collide.
pub fn test_prefix() -> String {
    format!("grist-test-{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

pub fn queue_options(prefix: &str) -> QueueOptions {
    QueueOptions::default().prefix(prefix)
}

pub fn worker_options(prefix: &str) -> WorkerOptions {
    WorkerOptions::default()
        .prefix(prefix)
        .stalled_interval(Duration::from_secs(5))
        .drain_delay(Duration::from_millis(250))
}

/// A processor that runs the given closure result sequence: entries are
/// `Err(message)` until the counter passes `failures`, then `Ok(value)`.
pub fn flaky_processor(failures: u32, value: Value) -> (Processor, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let processor: Processor = Arc::new(move |_job, _ctx| {
        let n = seen.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        Box::pin(async move {
            if n < failures {
                Err(ProcessError::transient("induced failure"))
            } else {
                Ok(value)
            }
        })
    });
    (processor, calls)
}

/// A processor that always fails with the given message.
pub fn failing_processor(message: &str) -> Processor {
    let message = message.to_string();
    Arc::new(move |_job, _ctx| {
        let message = message.clone();
        Box::pin(async move { Err(ProcessError::transient(message)) })
    })
}

/// A processor that always succeeds with the given value.
pub fn ok_processor(value: Value) -> Processor {
    Arc::new(move |_job, _ctx| {
        let value = value.clone();
        Box::pin(async move { Ok(value) })
    })
}

/// All events appended to a queue's stream so far, oldest first.
pub async fn events_of(prefix: &str, queue: &str) -> Vec<grist_core::event::Event> {
    use redis::streams::StreamRangeReply;

    let opts = grist_conn::ConnOptions::default();
    let mut conn = grist_conn::connect(&opts).await.expect("connect for events");
    let keys = grist_core::keys::KeySpace::new(prefix, queue);
    let reply: StreamRangeReply = redis::cmd("XRANGE")
        .arg(keys.events())
        .arg("-")
        .arg("+")
        .query_async(&mut conn)
        .await
        .expect("read events stream");

    reply
        .ids
        .iter()
        .filter_map(|entry| {
            let fields: Vec<(String, String)> = entry
                .map
                .iter()
                .filter_map(|(k, v)| match v {
                    redis::Value::BulkString(bytes) => {
                        Some((k.clone(), String::from_utf8_lossy(bytes).into_owned()))
                    }
                    redis::Value::SimpleString(s) => Some((k.clone(), s.clone())),
                    redis::Value::Int(n) => Some((k.clone(), n.to_string())),
                    _ => None,
                })
                .collect();
            grist_core::event::Event::from_fields(&fields)
        })
        .collect()
}

/// Poll until the probe returns `Some`, or panic at the deadline.
pub async fn poll_until<T, F, Fut>(timeout: Duration, mut probe: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return value;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
