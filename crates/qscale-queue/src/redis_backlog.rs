//! Redis-backed backlog source.
//!
//! Opens a multiplexed connection lazily and caches it. A connection-class
//! failure drops the cached connection so the next attempt reconnects;
//! such failures are retried under a bounded policy before surfacing.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use qscale_core::RetryPolicy;

use crate::error::{QueueError, QueueResult};
use crate::source::BacklogSource;

/// Keys requested per SCAN round trip.
const SCAN_COUNT: usize = 1000;

/// Attempts per queue store call before the error surfaces.
const MAX_ATTEMPTS: u32 = 3;

/// Queue store client over Redis hashes.
pub struct RedisBacklog {
    client: redis::Client,
    url: String,
    connection: Mutex<Option<MultiplexedConnection>>,
    retry: RetryPolicy,
}

impl RedisBacklog {
    /// Create a client for `redis://{host}:{port}/`. Does not connect.
    ///
    /// `backoff` is the pause between retries of a failed call.
    pub fn new(host: &str, port: u16, backoff: Duration) -> QueueResult<Self> {
        let url = format!("redis://{host}:{port}/");
        let client = redis::Client::open(url.as_str())?;
        Ok(Self {
            client,
            url,
            connection: Mutex::new(None),
            retry: RetryPolicy::fixed(MAX_ATTEMPTS, backoff),
        })
    }

    async fn connection(&self) -> QueueResult<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        debug!(url = %self.url, "connected to queue store");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the cached connection after a transient failure.
    async fn note_failure(&self, command: &str, error: &QueueError) {
        if error.is_transient() {
            warn!(
                url = %self.url,
                command,
                error = %error,
                backoff_secs = self.retry.delay().as_secs_f64(),
                "queue store call failed, will retry"
            );
            *self.connection.lock().await = None;
        }
    }

    async fn scan_once(&self, pattern: &str) -> QueueResult<Vec<String>> {
        let result = async {
            let mut conn = self.connection().await?;
            let mut keys = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query_async(&mut conn)
                    .await?;
                keys.extend(decode_keys(batch));
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            Ok::<_, QueueError>(keys)
        }
        .await;

        if let Err(e) = &result {
            self.note_failure("SCAN", e).await;
        }
        result
    }

    async fn hget_once(&self, key: &str, field: &str) -> QueueResult<Option<String>> {
        let result = async {
            let mut conn = self.connection().await?;
            let value: Option<String> = redis::cmd("HGET")
                .arg(key)
                .arg(field)
                .query_async(&mut conn)
                .await?;
            Ok::<_, QueueError>(value)
        }
        .await;

        if let Err(e) = &result {
            self.note_failure("HGET", e).await;
        }
        result
    }
}

/// Keep the UTF-8 key names of a SCAN batch. Other keys cannot be work
/// items written by the producers, so they are dropped.
fn decode_keys(batch: Vec<Vec<u8>>) -> Vec<String> {
    batch
        .into_iter()
        .filter_map(|raw| match String::from_utf8(raw) {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(key = ?e.as_bytes(), "skipping non-UTF-8 key");
                None
            }
        })
        .collect()
}

#[async_trait]
impl BacklogSource for RedisBacklog {
    async fn keys_matching(&self, pattern: &str) -> QueueResult<Vec<String>> {
        let mut keys = self
            .retry
            .retry_if(|_| self.scan_once(pattern), QueueError::is_transient)
            .await?;
        // SCAN may return a key more than once.
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn field(&self, key: &str, field: &str) -> QueueResult<Option<String>> {
        self.retry
            .retry_if(|_| self.hget_once(key, field), QueueError::is_transient)
            .await
    }

    fn name(&self) -> &str {
        "redis"
    }
}
