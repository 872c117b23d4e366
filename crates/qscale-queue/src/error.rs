//! Error types for queue store access.

use thiserror::Error;

/// Result type alias for queue store operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while reading the queue store.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The store could not be reached. Safe to retry.
    #[error("queue store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but the command failed.
    #[error("queue store command `{command}` failed: {message}")]
    Command { command: &'static str, message: String },
}

impl QueueError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_timeout() || e.is_connection_dropped() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Command {
                command: "redis",
                message: e.to_string(),
            }
        }
    }
}
