// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! grist-core: types, key layout, codec, and backoff math for the grist job queue

pub mod macros;

pub mod backoff;
pub mod clock;
pub mod codec;
pub mod error;
pub mod event;
pub mod group;
pub mod job;
pub mod keys;
pub mod opts;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use backoff::{compute_backoff, BackoffStrategy, CustomBackoff, PREV_DELAY_FIELD};
pub use clock::{Clock, FakeClock, SystemClock};
pub use codec::{decode, encode};
pub use error::{CoreError, ScriptCode};
pub use event::{Event, RawStreamEntry};
pub use group::{
    CompensationSpec, GroupJobStatus, GroupRecord, GroupState, COMPENSATION_QUEUE_SUFFIX,
};
pub use job::{DlqMeta, Job, JobState, DLQ_META_FIELD};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use keys::KeySpace;
pub use opts::{
    BackoffConfig, BackoffOpts, ErrorBackoffs, GroupRef, JobOpts, KeepJobs, ParentRef, RateLimit,
    RemovePolicy,
};
