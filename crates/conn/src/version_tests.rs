// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn parses_redis_info() {
    let info = "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\n";
    let v = parse_info(info).unwrap();
    assert_eq!(v.to_string(), "7.2.4");
    assert_eq!(v.flavor, BackendFlavor::Redis);
    assert!(v.supports_lpos());
}

#[test]
fn rejects_pre_six_servers() {
    let info = "redis_version:5.0.14\r\n";
    assert!(parse_info(info).is_err());
}

#[test]
fn rejects_missing_version() {
    assert!(parse_info("# Server\r\nuptime_in_seconds:1\r\n").is_err());
}

#[parameterized(
    at_boundary = { 6, 0, 6, true },
    below_boundary = { 6, 0, 5, false },
    seven = { 7, 0, 0, true },
)]
fn lpos_boundary(major: u32, minor: u32, patch: u32, expected: bool) {
    assert_eq!(ServerVersion::new(major, minor, patch).supports_lpos(), expected);
}

#[test]
fn valkey_marks_compat_flavor() {
    let info = "redis_version:7.2.4\r\nvalkey_version:8.0.1\r\n";
    let v = parse_info(info).unwrap();
    assert_eq!(v.flavor, BackendFlavor::Compat);
}

#[test]
fn two_part_versions_parse() {
    let info = "redis_version:6.2\r\n";
    let v = parse_info(info).unwrap();
    assert_eq!((v.major, v.minor, v.patch), (6, 2, 0));
}
