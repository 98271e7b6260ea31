// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::opts::{BackoffConfig, BackoffOpts, JobOpts, ParentRef, RemovePolicy};
use crate::test_support::strategies;
use proptest::prelude::*;

#[test]
fn opts_round_trip() {
    let opts = JobOpts::default()
        .attempts(3)
        .delay(250)
        .priority(2)
        .backoff(BackoffConfig::Opts(BackoffOpts::Exponential {
            delay: 1000,
            jitter: Some(0.25),
            max_delay: Some(60_000),
        }))
        .parent(ParentRef { id: "41".into(), queue: "parents".into() })
        .remove_on_complete(RemovePolicy::Count(100));

    let bytes = encode(&opts).unwrap();
    let decoded: JobOpts = decode(&bytes).unwrap();
    assert_eq!(decoded, opts);
}

#[test]
fn encoding_is_deterministic() {
    let opts = JobOpts::default().attempts(5).deduplication_id("abc");
    assert_eq!(encode(&opts).unwrap(), encode(&opts).unwrap());
}

#[test]
fn garbage_fails_to_decode() {
    let result: Result<JobOpts, _> = decode(&[0xc1, 0xff, 0x00]);
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn encode_decode_identity(opts in strategies::job_opts()) {
        let bytes = encode(&opts).unwrap();
        let decoded: JobOpts = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, opts);
    }
}
