//! Error types for the per-target decision pipeline.

use thiserror::Error;

use qscale_queue::QueueError;

/// Result type alias for decision pipeline operations.
pub type ScaleResult<T> = Result<T, ScaleError>;

/// Reasons a target's pipeline stops before a decision is made.
///
/// None of these are fatal; the target is re-evaluated next pass.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("backlog sample failed: {0}")]
    Queue(#[from] QueueError),

    #[error("current replica count of {resource} is unknown")]
    ReplicasUnknown { resource: String },
}
