// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders and proptest strategies shared by other crates' tests.

/// Proptest strategies for core types.
#[cfg(any(test, feature = "test-support"))]
pub mod strategies {
    use crate::opts::{BackoffConfig, BackoffOpts, JobOpts, KeepJobs, ParentRef, RemovePolicy};
    use proptest::prelude::*;

    pub fn backoff_opts() -> impl Strategy<Value = BackoffOpts> {
        prop_oneof![
            (1u64..100_000, proptest::option::of(0.0f64..=1.0)).prop_map(|(delay, jitter)| {
                BackoffOpts::Fixed { delay, jitter, max_delay: None }
            }),
            (1u64..100_000, proptest::option::of(0.0f64..=1.0)).prop_map(|(delay, jitter)| {
                BackoffOpts::Exponential { delay, jitter, max_delay: None }
            }),
            (1u64..100_000).prop_map(|delay| BackoffOpts::Linear { delay, max_delay: None }),
            (1u64..10_000, 1.0f64..4.0).prop_map(|(delay, exponent)| BackoffOpts::Polynomial {
                delay,
                exponent: Some(exponent),
                max_delay: None,
            }),
            (1u64..1_000, 10_000u64..1_000_000).prop_map(|(base_delay, max_delay)| {
                BackoffOpts::DecorrelatedJitter { base_delay, max_delay }
            }),
        ]
    }

    pub fn remove_policy() -> impl Strategy<Value = RemovePolicy> {
        prop_oneof![
            any::<bool>().prop_map(RemovePolicy::Flag),
            (0i64..10_000).prop_map(RemovePolicy::Count),
            (proptest::option::of(1u64..100_000), proptest::option::of(0i64..10_000))
                .prop_map(|(age, count)| RemovePolicy::Criteria(KeepJobs { age, count })),
        ]
    }

    pub fn job_opts() -> impl Strategy<Value = JobOpts> {
        (
            1u32..20,
            0u64..100_000,
            0u32..100,
            any::<bool>(),
            proptest::option::of(backoff_opts()),
            proptest::option::of(remove_policy()),
            proptest::option::of("[a-z]{1,12}"),
        )
            .prop_map(|(attempts, delay, priority, lifo, backoff, remove, dedup)| {
                let mut opts = JobOpts::default();
                opts.attempts = attempts;
                opts.delay = delay;
                opts.priority = priority;
                opts.lifo = lifo;
                opts.backoff = backoff.map(BackoffConfig::Opts);
                opts.remove_on_complete = remove;
                opts.deduplication_id = dedup;
                opts
            })
    }

    pub fn parent_ref() -> impl Strategy<Value = ParentRef> {
        ("[0-9]{1,6}", "[a-z]{1,10}").prop_map(|(id, queue)| ParentRef { id, queue })
    }
}
