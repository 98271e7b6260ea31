// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! grist-scripts: the atomic state engine.
//!
//! Every durable transition is one server-side Lua script; this crate owns
//! the Lua catalog and the typed invokers around it. Scripts never raise:
//! they return negative codes that [`ScriptError`] translates into named
//! errors. State sets and job hashes are mutated here and nowhere else.

pub mod add;
pub mod admin;
pub mod catalog;
pub mod engine;
pub mod fetch;
pub mod finish;
pub mod groups;
pub mod reply;

pub use add::AddJobArgs;
pub use admin::CleanTarget;
pub use catalog::ScriptCatalog;
pub use engine::{parent_policy, StateEngine};
pub use fetch::{FetchResult, StalledReport};
pub use finish::{FinishOutcome, FinishSpec, FinishTarget, RuntimeArgs};
pub use groups::CancelOutcome;

use grist_core::error::CoreError;
use thiserror::Error;

/// Errors raised while invoking state scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{command}: unexpected reply: {detail}")]
    UnexpectedReply { command: &'static str, detail: String },
}

impl ScriptError {
    /// Translate a raw script return code into a typed error.
    pub fn from_code(raw: i64, command: &'static str, job_id: impl Into<String>) -> Self {
        Self::Core(CoreError::from_script_code(raw, command, job_id))
    }
}
