// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for connection defaults.

/// Resolve the Redis URL: `REDIS_URL` > `REDIS_HOST` (port 6379) > localhost.
pub fn redis_url() -> String {
    if let Ok(url) = std::env::var("REDIS_URL") {
        if !url.is_empty() {
            return url;
        }
    }
    let host = std::env::var("REDIS_HOST").unwrap_or_default();
    if host.is_empty() {
        "redis://127.0.0.1:6379".to_string()
    } else {
        format!("redis://{host}:6379")
    }
}

/// Key prefix override for test isolation (`GRIST_TEST_PREFIX`), if set.
pub fn test_prefix() -> Option<String> {
    std::env::var("GRIST_TEST_PREFIX").ok().filter(|s| !s.is_empty())
}
