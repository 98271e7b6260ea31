// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Saga group specs: happy path, compensation, cancellation.

use crate::prelude::*;
use grist_conn::ConnOptions;
use grist_core::group::{CompensationSpec, GroupState};
use grist_queue::{FlowProducer, GroupSpec};
use std::collections::HashMap;

async fn producer(prefix: &str) -> FlowProducer {
    FlowProducer::connect(Some(prefix.to_string()), false, ConnOptions::default())
        .await
        .unwrap()
}

fn compensation_for(names: &[&str]) -> HashMap<String, CompensationSpec> {
    names
        .iter()
        .map(|name| {
            (
                name.to_string(),
                CompensationSpec {
                    name: format!("undo-{name}"),
                    data: None,
                    attempts: None,
                },
            )
        })
        .collect()
}

/// All members succeed: the group completes exactly once.
#[tokio::test]
async fn group_happy_path() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("sagas", queue_options(&prefix)).await.unwrap();
    let worker =
        Worker::start("sagas", ok_processor(json!("done")), worker_options(&prefix))
            .await
            .unwrap();

    let (group_id, member_ids) = producer(&prefix)
        .await
        .add_group(GroupSpec {
            name: "g".into(),
            queue_name: "sagas".into(),
            jobs: vec![
                ("A".into(), json!({}), JobOpts::default()),
                ("B".into(), json!({}), JobOpts::default()),
                ("C".into(), json!({}), JobOpts::default()),
            ],
            compensation: None,
        })
        .await
        .unwrap();
    assert_eq!(member_ids.len(), 3);

    let record = poll_until(Duration::from_secs(15), || async {
        let record = queue.get_group(&group_id).await.unwrap();
        (record.state == GroupState::Completed).then_some(record)
    })
    .await;

    assert_eq!(record.completed_count, 3);
    assert_eq!(record.failed_count, 0);
    assert_eq!(record.total_jobs, 3);

    let events = events_of(&prefix, "sagas").await;
    let completed_events = events
        .iter()
        .filter(|e| matches!(e, grist_core::event::Event::GroupCompleted { .. }))
        .count();
    assert_eq!(completed_events, 1, "group:completed fires exactly once");

    worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// One member fails after two succeeded: compensations run for the
/// completed members and the group settles to FAILED.
#[tokio::test]
async fn group_compensation_settles_to_failed() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("checkout", queue_options(&prefix)).await.unwrap();

    // member processor: C fails, everything else succeeds
    let processor: Processor = Arc::new(|job, _ctx| {
        Box::pin(async move {
            if job.name == "C" {
                Err(ProcessError::transient("C exploded"))
            } else {
                Ok(json!({ "done": job.name }))
            }
        })
    });
    let worker = Worker::start("checkout", processor, worker_options(&prefix))
        .await
        .unwrap();

    // compensation processor records which originals it reversed
    let reversed = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
    let seen = reversed.clone();
    let comp_processor: Processor = Arc::new(move |job, _ctx| {
        let seen = seen.clone();
        Box::pin(async move {
            let original = job.data["originalJobName"].as_str().unwrap_or("").to_string();
            seen.lock().push(original);
            Ok(json!("reversed"))
        })
    });
    let comp_worker = Worker::start(
        "checkout:compensation",
        comp_processor,
        worker_options(&prefix),
    )
    .await
    .unwrap();

    let (group_id, _) = producer(&prefix)
        .await
        .add_group(GroupSpec {
            name: "g".into(),
            queue_name: "checkout".into(),
            jobs: vec![
                ("A".into(), json!({}), JobOpts::default()),
                ("B".into(), json!({}), JobOpts::default()),
                // C waits so A and B complete first
                ("C".into(), json!({}), JobOpts::default().delay(500)),
            ],
            compensation: Some(compensation_for(&["A", "B"])),
        })
        .await
        .unwrap();

    // the group passes through COMPENSATING and settles to FAILED once
    // both compensations succeed
    let record = poll_until(Duration::from_secs(20), || async {
        let record = queue.get_group(&group_id).await.unwrap();
        (record.state == GroupState::Failed).then_some(record)
    })
    .await;

    assert_eq!(record.completed_count, 2);
    assert_eq!(record.failed_count, 1);
    assert_eq!(record.total_compensation_jobs, 2);
    assert_eq!(record.compensation_done_count, 2);

    let mut originals = reversed.lock().clone();
    originals.sort();
    assert_eq!(originals, vec!["A".to_string(), "B".to_string()]);

    let events = events_of(&prefix, "checkout").await;
    let compensating = events
        .iter()
        .filter(|e| matches!(e, grist_core::event::Event::GroupCompensating { .. }))
        .count();
    assert_eq!(compensating, 1, "exactly one compensation trigger");

    worker.close().await;
    comp_worker.close().await;
    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// Cancelling a group with no completed members fails it and drops the
/// pending members atomically.
#[tokio::test]
async fn cancel_without_completions_fails_the_group() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let queue = Queue::connect("batch", queue_options(&prefix)).await.unwrap();

    let (group_id, member_ids) = producer(&prefix)
        .await
        .add_group(GroupSpec {
            name: "g".into(),
            queue_name: "batch".into(),
            jobs: vec![
                ("A".into(), json!({}), JobOpts::default().delay(60_000)),
                ("B".into(), json!({}), JobOpts::default().delay(60_000)),
            ],
            compensation: None,
        })
        .await
        .unwrap();

    let state = queue.cancel_group(&group_id).await.unwrap();
    assert_eq!(state, GroupState::Failed);

    let record = queue.get_group(&group_id).await.unwrap();
    assert_eq!(record.cancelled_count, 2);
    for id in &member_ids {
        assert_eq!(queue.get_state(id).await.unwrap(), None);
    }

    // cancelling a terminal group is rejected
    assert!(queue.cancel_group(&group_id).await.is_err());

    queue.pause().await.unwrap();
    queue.obliterate(Default::default()).await.unwrap();
}

/// Group preconditions reject bad specs without writing anything.
#[tokio::test]
async fn group_preconditions() {
    if !redis_ready() {
        return;
    }
    let prefix = test_prefix();
    let flow = producer(&prefix).await;

    let empty = flow
        .add_group(GroupSpec {
            name: "g".into(),
            queue_name: "batch".into(),
            jobs: vec![],
            compensation: None,
        })
        .await;
    assert!(empty.is_err());

    let unmatched = flow
        .add_group(GroupSpec {
            name: "g".into(),
            queue_name: "batch".into(),
            jobs: vec![("A".into(), json!({}), JobOpts::default())],
            compensation: Some(compensation_for(&["Z"])),
        })
        .await;
    assert!(unmatched.is_err());
}
