//! Error types for control-plane access.

use thiserror::Error;

/// Result type alias for control-plane operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Message fragments that indicate the control plane could not be reached.
pub const CONNECTIVITY_KEYWORDS: &[&str] = &[
    "unable to connect",
    "connection refused",
    "connection reset",
    "timed out",
    "timeout",
    "no route to host",
    "dns error",
];

/// Errors that can occur while talking to the control plane.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to build control-plane client: {0}")]
    Client(String),

    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("`{operation}` failed: {message}")]
    Api {
        operation: &'static str,
        message: String,
    },
}

impl ClusterError {
    /// Whether the error message points at a connectivity problem rather
    /// than a control plane that answered.
    pub fn is_connectivity(&self) -> bool {
        let message = self.to_string().to_ascii_lowercase();
        CONNECTIVITY_KEYWORDS.iter().any(|kw| message.contains(kw))
    }
}
