//! Backlog sampler: tallies pending work items per category.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::debug;

use qscale_core::{BacklogSnapshot, ScalingTarget, WorkCategory};

use crate::error::QueueResult;
use crate::source::BacklogSource;

/// Hash field holding an item's lifecycle status.
pub const STATUS_FIELD: &str = "status";

/// Hash field holding the uploaded file name.
pub const FILE_NAME_FIELD: &str = "file_name";

/// Statuses that mean an item will never need a replica again.
pub const TERMINAL_STATUSES: &[&str] = &["done", "failed"];

/// Turns a target's queue keys into a `BacklogSnapshot`.
#[derive(Debug, Clone, Default)]
pub struct BacklogSampler;

impl BacklogSampler {
    pub fn new() -> Self {
        Self
    }

    /// Sample the backlog for one target.
    ///
    /// An unreachable store fails the sample, whether it goes away before
    /// or during the scan. A command error on a single key only drops that
    /// key.
    pub async fn sample(
        &self,
        source: &dyn BacklogSource,
        target: &ScalingTarget,
    ) -> QueueResult<BacklogSnapshot> {
        let start = Instant::now();

        let mut keys = BTreeSet::new();
        for pattern in target.key_patterns() {
            keys.extend(source.keys_matching(&pattern).await?);
        }

        let mut snapshot = BacklogSnapshot::new();
        for key in &keys {
            if let Some(category) = self.classify_key(source, key).await? {
                snapshot.record(category);
            }
        }

        debug!(
            resource = %target.id(),
            scanned = keys.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "finished tallying queue keys"
        );
        debug!(
            resource = %target.id(),
            image = snapshot.count(WorkCategory::Image),
            archive = snapshot.count(WorkCategory::Archive),
            "tallied pending items"
        );

        Ok(snapshot)
    }

    /// Category of a pending key, or `None` if it is terminal, has no
    /// status, or could not be read. Transient errors are returned.
    async fn classify_key(
        &self,
        source: &dyn BacklogSource,
        key: &str,
    ) -> QueueResult<Option<WorkCategory>> {
        let Some(status) = read_field(source, key, STATUS_FIELD).await? else {
            return Ok(None);
        };
        if is_terminal(&status) {
            return Ok(None);
        }

        match source.field(key, FILE_NAME_FIELD).await {
            Ok(file_name) => Ok(Some(
                file_name
                    .as_deref()
                    .map(WorkCategory::classify)
                    .unwrap_or(WorkCategory::Image),
            )),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                debug!(%key, error = %e, "skipping unreadable key");
                Ok(None)
            }
        }
    }
}

/// Read one field, folding a non-transient error on the key into `None`.
async fn read_field(
    source: &dyn BacklogSource,
    key: &str,
    field: &str,
) -> QueueResult<Option<String>> {
    match source.field(key, field).await {
        Ok(value) => Ok(value),
        Err(e) if e.is_transient() => Err(e),
        Err(e) => {
            debug!(%key, error = %e, "skipping unreadable key");
            Ok(None)
        }
    }
}

/// Whether `status` is one of the terminal statuses.
pub fn is_terminal(status: &str) -> bool {
    let status = status.trim().to_ascii_lowercase();
    TERMINAL_STATUSES.contains(&status.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBacklog;
    use qscale_core::{MaxReplicas, ResourceKind, WorkMode};

    fn target(mode: WorkMode) -> ScalingTarget {
        ScalingTarget::new(
            0,
            MaxReplicas::Fixed(4),
            1,
            "ns",
            ResourceKind::Deployment,
            mode,
            "consumer",
        )
        .unwrap()
    }

    /// Mirrors a typical queue: new and in-progress items alongside
    /// finished ones, spread across both work modes.
    fn seeded() -> MemoryBacklog {
        let store = MemoryBacklog::new();
        store.push_item("predict_1", "new", "x.tiff");
        store.push_item("predict_2", "failed", "x.zip");
        store.push_item("train_3", "new", "x.TIFF");
        store.push_item("predict_4", "new", "x.ZIP");
        store.push_item("predict_5", "done", "x.tiff");
        store.push_item("train_6", "new", "x.zip");
        store.push_item("predict_7", "predicting", "y.png");
        store.hset("malformedKey", "status", "new");
        store
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal("done"));
        assert!(is_terminal("FAILED"));
        assert!(!is_terminal("new"));
        assert!(!is_terminal("post-processing"));
    }

    #[tokio::test]
    async fn counts_only_pending_predict_items() {
        let store = seeded();
        let snapshot = BacklogSampler::new()
            .sample(&store, &target(WorkMode::Predict))
            .await
            .unwrap();

        assert_eq!(snapshot.count(WorkCategory::Image), 2);
        assert_eq!(snapshot.count(WorkCategory::Archive), 1);
    }

    #[tokio::test]
    async fn counts_train_items() {
        let store = seeded();
        let snapshot = BacklogSampler::new()
            .sample(&store, &target(WorkMode::Train))
            .await
            .unwrap();

        assert_eq!(snapshot.count(WorkCategory::Image), 1);
        assert_eq!(snapshot.count(WorkCategory::Archive), 1);
    }

    #[tokio::test]
    async fn scans_every_configured_queue() {
        let store = seeded();
        store.push_item("track_8", "new", "movie.tiff");
        let target = target(WorkMode::Predict).with_queues(["predict", "track"]);

        let snapshot = BacklogSampler::new().sample(&store, &target).await.unwrap();
        assert_eq!(snapshot.count(WorkCategory::Image), 3);
    }

    #[tokio::test]
    async fn unreadable_keys_are_skipped() {
        let store = seeded();
        store.break_key("predict_1");
        store.hset("predict_9", "file_name", "no-status.tiff");

        let snapshot = BacklogSampler::new()
            .sample(&store, &target(WorkMode::Predict))
            .await
            .unwrap();
        assert_eq!(snapshot.count(WorkCategory::Image), 1);
        assert_eq!(snapshot.count(WorkCategory::Archive), 1);
    }

    #[tokio::test]
    async fn missing_file_name_counts_as_image() {
        let store = MemoryBacklog::new();
        store.hset("predict_1", "status", "new");

        let snapshot = BacklogSampler::new()
            .sample(&store, &target(WorkMode::Predict))
            .await
            .unwrap();
        assert_eq!(snapshot.count(WorkCategory::Image), 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_the_sample() {
        let store = seeded();
        store.set_unavailable(true);

        let err = BacklogSampler::new()
            .sample(&store, &target(WorkMode::Predict))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn outage_after_scan_fails_the_sample() {
        let store = seeded();
        store.set_fields_unavailable(true);

        let err = BacklogSampler::new()
            .sample(&store, &target(WorkMode::Predict))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
