// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! grist-worker: the cooperative worker runtime.
//!
//! A worker runs `concurrency` fetch loops plus a stall checker and a lock
//! renewal timer, all process-local and non-authoritative: durable truth
//! lives behind the state scripts. Processor failures are consumed by the
//! backoff/retry router and never propagate out of the loop.

pub mod breaker;
pub mod dlq;
pub mod logger;
pub mod options;
pub mod worker;

pub use breaker::{CircuitBreaker, CircuitBreakerOptions, CircuitState, CircuitTransition};
pub use logger::{LifecycleEntry, LifecycleLogger, LogLevel, TracingLifecycleLogger};
pub use options::{DeadLetterOptions, WorkerOptions};
pub use worker::{JobContext, ProcessError, Processor, ProcessorFuture, Worker};

use grist_conn::ConnError;
use grist_core::error::CoreError;
use grist_queue::QueueError;
use grist_scripts::ScriptError;
use thiserror::Error;

/// Errors surfaced by the worker runtime.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("connection error: {0}")]
    Conn(#[from] ConnError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The lock could not be renewed: another holder owns the job now.
    #[error("lock on job {0} was not renewed")]
    UnrenewedLock(String),

    #[error("worker is closed")]
    Closed,
}
