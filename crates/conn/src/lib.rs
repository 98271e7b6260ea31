// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! grist-conn: Redis connection management for the grist job queue.
//!
//! Queues share one multiplexed command connection; each worker additionally
//! holds a dedicated connection for blocking marker waits. Connection
//! authority is thin on purpose: durable state and atomicity live in the
//! server-side scripts, never here.

pub mod env;
pub mod version;

pub use version::{BackendFlavor, ServerVersion};

use redis::aio::ConnectionManager;
use redis::{Client, IntoConnectionInfo, RedisError};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while establishing or probing connections.
#[derive(Debug, Error)]
pub enum ConnError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("could not connect to {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: RedisError,
    },

    #[error("unsupported server: {0}")]
    UnsupportedServer(String),
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnOptions {
    pub url: String,
    /// Attempts before `connect` gives up.
    pub max_attempts: u32,
    /// Initial retry pause; doubles per attempt up to 30s.
    pub retry_base: Duration,
}

impl Default for ConnOptions {
    fn default() -> Self {
        Self {
            url: env::redis_url(),
            max_attempts: 10,
            retry_base: Duration::from_millis(250),
        }
    }
}

impl ConnOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }
}

/// Open a client for the configured URL.
pub fn client(opts: &ConnOptions) -> Result<Client, ConnError> {
    let info = opts.url.as_str().into_connection_info()?;
    Ok(Client::open(info)?)
}

/// Connect with exponential backoff between attempts.
///
/// The returned [`ConnectionManager`] reconnects on its own after transient
/// drops; this retry loop only covers initial establishment.
pub async fn connect(opts: &ConnOptions) -> Result<ConnectionManager, ConnError> {
    let client = client(opts)?;
    let mut pause = opts.retry_base;
    let mut last: Option<RedisError> = None;

    for attempt in 1..=opts.max_attempts.max(1) {
        match client.get_connection_manager().await {
            Ok(conn) => return Ok(conn),
            Err(err) => {
                tracing::warn!(
                    url = %opts.url,
                    attempt,
                    error = %err,
                    "connection attempt failed"
                );
                last = Some(err);
            }
        }
        tokio::time::sleep(pause).await;
        pause = (pause * 2).min(Duration::from_secs(30));
    }

    Err(ConnError::Exhausted {
        url: opts.url.clone(),
        attempts: opts.max_attempts.max(1),
        last: last.unwrap_or_else(|| RedisError::from((redis::ErrorKind::IoError, "no attempt"))),
    })
}

/// Open a second, dedicated connection for blocking commands.
///
/// Blocking pops must not share the multiplexed command connection: a
/// `BZPOPMIN` would park every caller multiplexed onto it.
pub async fn connect_blocking(opts: &ConnOptions) -> Result<ConnectionManager, ConnError> {
    connect(opts).await
}

/// Probe the server version and flavor via `INFO server`.
pub async fn probe_server(conn: &mut ConnectionManager) -> Result<ServerVersion, ConnError> {
    let info: String = redis::cmd("INFO").arg("server").query_async(conn).await?;
    version::parse_info(&info)
}
