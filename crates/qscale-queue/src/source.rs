//! The queue store capability the sampler depends on.

use async_trait::async_trait;

use crate::error::QueueResult;

/// Read-only view of the queue store.
#[async_trait]
pub trait BacklogSource: Send + Sync {
    /// List every key matching a glob `pattern` (e.g. `predict_*`).
    async fn keys_matching(&self, pattern: &str) -> QueueResult<Vec<String>>;

    /// Read one hash field. `None` when the key or field is absent.
    async fn field(&self, key: &str, field: &str) -> QueueResult<Option<String>>;

    /// Source name (for logging).
    fn name(&self) -> &str;
}
