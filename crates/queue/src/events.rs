// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events stream reader.
//!
//! Consumes `{prefix}:{queue}:events` on a dedicated blocking connection,
//! tracks its cursor by stream id, and re-dispatches typed events to
//! subscribers. Entries written by newer versions parse to nothing and are
//! skipped, so mixed deployments stay quiet rather than loud.

use crate::QueueError;
use grist_conn::{connect_blocking, ConnOptions};
use grist_core::event::Event;
use grist_core::keys::{KeySpace, DEFAULT_PREFIX};
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const READ_BLOCK_MS: usize = 5_000;
const READ_COUNT: usize = 128;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct QueueEventsOptions {
    pub conn: ConnOptions,
    pub prefix: String,
    pub clustered: bool,
    /// Stream id to start after; `$` reads only new entries.
    pub start_id: String,
    /// Pause between reconnect attempts after a transport error.
    pub reconnect_pause: Duration,
    /// Subscriber channel capacity.
    pub capacity: usize,
}

impl Default for QueueEventsOptions {
    fn default() -> Self {
        Self {
            conn: ConnOptions::default(),
            prefix: grist_conn::env::test_prefix()
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            clustered: false,
            start_id: "$".to_string(),
            reconnect_pause: Duration::from_millis(500),
            capacity: 1024,
        }
    }
}

/// A running events reader for one queue.
pub struct QueueEvents {
    queue: String,
    tx: broadcast::Sender<(String, Event)>,
    shutdown: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl QueueEvents {
    /// Connect and start the reader task.
    pub async fn run(
        queue: impl Into<String>,
        options: QueueEventsOptions,
    ) -> Result<Self, QueueError> {
        let queue = queue.into();
        let keys = if options.clustered {
            KeySpace::clustered(&options.prefix, &queue)
        } else {
            KeySpace::new(&options.prefix, &queue)
        };
        let conn = connect_blocking(&options.conn).await?;
        let (tx, _) = broadcast::channel(options.capacity.max(16));
        let shutdown = CancellationToken::new();

        let reader = tokio::spawn(read_loop(
            keys,
            conn,
            options.start_id.clone(),
            options.reconnect_pause,
            tx.clone(),
            shutdown.clone(),
        ));

        Ok(Self { queue, tx, shutdown, reader: Some(reader) })
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Subscribe to `(streamId, event)` pairs from the current cursor on.
    pub fn subscribe(&self) -> broadcast::Receiver<(String, Event)> {
        self.tx.subscribe()
    }

    /// Stop the reader and wait for it to exit.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
    }
}

async fn read_loop(
    keys: KeySpace,
    mut conn: redis::aio::ConnectionManager,
    start_id: String,
    reconnect_pause: Duration,
    tx: broadcast::Sender<(String, Event)>,
    shutdown: CancellationToken,
) {
    let events_key = keys.events();
    let mut cursor = start_id;
    let options = StreamReadOptions::default().block(READ_BLOCK_MS).count(READ_COUNT);

    loop {
        if shutdown.is_cancelled() {
            return;
        }
        let keys_arg = [&events_key];
        let cursor_arg = [&cursor];
        let read = conn.xread_options::<_, _, Option<StreamReadReply>>(
            &keys_arg,
            &cursor_arg,
            &options,
        );
        let reply = tokio::select! {
            _ = shutdown.cancelled() => return,
            reply = read => reply,
        };
        match reply {
            Ok(Some(reply)) => {
                for stream in reply.keys {
                    for entry in stream.ids {
                        cursor = entry.id.clone();
                        let fields: Vec<(String, String)> = entry
                            .map
                            .iter()
                            .filter_map(|(k, v)| {
                                stream_value_to_string(v).map(|v| (k.clone(), v))
                            })
                            .collect();
                        if let Some(event) = Event::from_fields(&fields) {
                            let _ = tx.send((entry.id.clone(), event));
                        }
                    }
                }
            }
            Ok(None) => {
                // block timed out with no entries; keep the cursor
            }
            Err(err) => {
                tracing::warn!(
                    queue = %keys.queue(),
                    error = %err,
                    "events stream read failed, reconnecting"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(reconnect_pause) => {}
                }
            }
        }
    }
}

fn stream_value_to_string(value: &redis::Value) -> Option<String> {
    match value {
        redis::Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        redis::Value::SimpleString(s) => Some(s.clone()),
        redis::Value::Int(n) => Some(n.to_string()),
        _ => None,
    }
}
