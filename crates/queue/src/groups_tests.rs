// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "grist:orders:42", "grist:orders", "42" },
    tagged = { "grist:{orders}:42", "grist:{orders}", "42" },
    uuid_id = { "grist:q:7d2f", "grist:q", "7d2f" },
    nested_queue_name = { "grist:team:orders:9", "grist:team:orders", "9" },
)]
fn split_from_the_last_colon(full: &str, base: &str, id: &str) {
    assert_eq!(split_job_key(full), (base, id));
}

#[test]
fn split_without_colon_yields_the_input_as_id() {
    assert_eq!(split_job_key("bare"), ("", "bare"));
}
