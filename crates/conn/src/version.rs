// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server version probing.
//!
//! `LPOS` needs Redis >= 6.0.6; older servers (and some compatible
//! alternatives) route list-membership checks through a script instead.

use crate::ConnError;

/// Which server implementation answered the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFlavor {
    Redis,
    /// A Redis-protocol-compatible alternative (valkey et al.).
    Compat,
}

/// Parsed `INFO server` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub flavor: BackendFlavor,
}

impl ServerVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch, flavor: BackendFlavor::Redis }
    }

    /// Whether the native `LPOS` command is available.
    pub fn supports_lpos(&self) -> bool {
        #[cfg(feature = "compat-backend")]
        if self.flavor == BackendFlavor::Compat {
            return false;
        }
        (self.major, self.minor, self.patch) >= (6, 0, 6)
    }
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parse an `INFO server` reply.
pub fn parse_info(info: &str) -> Result<ServerVersion, ConnError> {
    let mut version: Option<(u32, u32, u32)> = None;
    let mut flavor = BackendFlavor::Redis;

    for line in info.lines() {
        let line = line.trim();
        if let Some(raw) = line.strip_prefix("redis_version:") {
            version = parse_semver(raw);
        }
        if line.starts_with("valkey_version:") || line.starts_with("server_name:") {
            flavor = BackendFlavor::Compat;
        }
    }

    let (major, minor, patch) = version
        .ok_or_else(|| ConnError::UnsupportedServer("missing redis_version in INFO".into()))?;
    if major < 6 {
        return Err(ConnError::UnsupportedServer(format!(
            "server {major}.{minor}.{patch} is below the 6.0 minimum"
        )));
    }
    Ok(ServerVersion { major, minor, patch, flavor })
}

fn parse_semver(raw: &str) -> Option<(u32, u32, u32)> {
    let mut parts = raw.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some((major, minor, patch))
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
