// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! grist-queue: the producer and observer surface.
//!
//! [`Queue`] wraps one state-engine script per operation; [`FlowProducer`]
//! composes parent/child trees and saga groups; [`QueueEvents`] re-dispatches
//! the per-queue events stream as typed events. Nothing here mutates durable
//! state directly.

pub mod compensation;
pub mod dlq;
pub mod events;
pub mod flow;
pub mod groups;
pub mod paginate;
pub mod queue;

pub use compensation::dispatch_compensations;
pub use dlq::{DlqFilter, ReplayReport};
pub use events::{QueueEvents, QueueEventsOptions};
pub use flow::{FlowJob, FlowNodeIds, FlowProducer, GroupSpec};
pub use groups::split_job_key;
pub use paginate::{Page, PaginateOpts};
pub use queue::{JobCounts, Metrics, ObliterateOpts, Queue, QueueOptions};

use grist_conn::ConnError;
use grist_core::error::CoreError;
use grist_scripts::ScriptError;
use thiserror::Error;

/// Errors surfaced by the queue API.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("connection error: {0}")]
    Conn(#[from] ConnError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("job {0} not found")]
    JobNotFound(String),

    #[error("group {0} not found")]
    GroupNotFound(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
