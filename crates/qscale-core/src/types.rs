//! Domain types shared by the sampler, decision engine, and adapters.
//!
//! A `ScalingTarget` is built once at startup and never mutated. The
//! per-iteration values (`BacklogSnapshot`, replica readings) are cheap
//! and rebuilt from scratch on every loop pass.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// ── Enumerations ──────────────────────────────────────────────────

/// Kind of cluster resource being scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Scaled through `spec.replicas`.
    Deployment,
    /// Scaled through `spec.parallelism`.
    Job,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deployment" => Ok(Self::Deployment),
            "job" => Ok(Self::Job),
            _ => Err(ConfigError::UnknownResourceKind(s.to_string())),
        }
    }
}

/// Which family of queue keys a target drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    Predict,
    Train,
}

impl WorkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Predict => "predict",
            Self::Train => "train",
        }
    }

    /// Infer the work mode from a queue name (`train*` → train).
    pub fn infer_from_queue(queue: &str) -> Self {
        if queue.trim().to_ascii_lowercase().starts_with("train") {
            Self::Train
        } else {
            Self::Predict
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "predict" => Ok(Self::Predict),
            "train" => Ok(Self::Train),
            _ => Err(ConfigError::UnknownWorkMode(s.to_string())),
        }
    }
}

/// Category a pending work item falls into, decided by its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkCategory {
    Image,
    Archive,
}

/// File name suffixes treated as archives (matched case-insensitively).
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".tar", ".tar.gz", ".tgz"];

impl WorkCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Archive => "archive",
        }
    }

    /// Classify a work item by its file name.
    pub fn classify(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        if ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            Self::Archive
        } else {
            Self::Image
        }
    }
}

impl fmt::Display for WorkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "archive" | "zip" => Ok(Self::Archive),
            _ => Err(ConfigError::UnknownCategory(s.to_string())),
        }
    }
}

/// Upper replica bound for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxReplicas {
    Fixed(u32),
    /// No fixed ceiling: resolved per iteration as
    /// `required + current + 1`.
    Dynamic,
}

impl MaxReplicas {
    /// Resolve the ceiling for one iteration.
    pub fn resolve(self, required: u32, current: u32) -> u32 {
        match self {
            Self::Fixed(max) => max,
            Self::Dynamic => required.saturating_add(current).saturating_add(1),
        }
    }
}

impl fmt::Display for MaxReplicas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Dynamic => f.write_str("auto"),
        }
    }
}

impl FromStr for MaxReplicas {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "dynamic" | "-1" => Ok(Self::Dynamic),
            other => other
                .parse::<u32>()
                .map(Self::Fixed)
                .map_err(|_| ConfigError::InvalidNumber {
                    field: "max replicas",
                    value: s.to_string(),
                }),
        }
    }
}

/// Which successful scale events are logged at info level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Every successful scale.
    #[default]
    High,
    /// Scales landing on min, the midpoint, or max.
    Medium,
    /// Scales landing on min or max.
    Low,
}

impl FromStr for Verbosity {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ConfigError::UnknownVerbosity(s.to_string())),
        }
    }
}

// ── Scaling target ────────────────────────────────────────────────

/// One configured (resource, queue) pair balanced by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingTarget {
    pub min_replicas: u32,
    pub max_replicas: MaxReplicas,
    /// Pending items one replica is expected to absorb. Never zero.
    pub items_per_replica: u32,
    pub namespace: String,
    pub resource_kind: ResourceKind,
    pub work_mode: WorkMode,
    pub resource_name: String,
    /// Queue key prefixes scanned for this target.
    pub queues: Vec<String>,
    /// Category of work the resource consumes.
    pub consumes: WorkCategory,
}

impl ScalingTarget {
    /// Build a target, validating bounds and the replica ratio.
    ///
    /// `queues` defaults to the work mode's name and `consumes` is derived
    /// with [`ScalingTarget::derive_consumes`] when not given.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        min_replicas: u32,
        max_replicas: MaxReplicas,
        items_per_replica: u32,
        namespace: impl Into<String>,
        resource_kind: ResourceKind,
        work_mode: WorkMode,
        resource_name: impl Into<String>,
    ) -> ConfigResult<Self> {
        if items_per_replica == 0 {
            return Err(ConfigError::ZeroItemsPerReplica);
        }
        if let MaxReplicas::Fixed(max) = max_replicas
            && min_replicas > max
        {
            return Err(ConfigError::MinAboveMax {
                min: min_replicas,
                max,
            });
        }

        let resource_name = resource_name.into();
        if resource_name.is_empty() {
            return Err(ConfigError::Missing("resource name"));
        }

        Ok(Self {
            min_replicas,
            max_replicas,
            items_per_replica,
            namespace: namespace.into(),
            resource_kind,
            work_mode,
            consumes: Self::derive_consumes(work_mode, &resource_name, None),
            resource_name,
            queues: vec![work_mode.as_str().to_string()],
        })
    }

    /// Replace the scanned queue prefixes. Empty names are dropped.
    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queues: Vec<String> = queues
            .into_iter()
            .map(Into::into)
            .filter(|q| !q.is_empty())
            .collect();
        if !queues.is_empty() {
            self.queues = queues;
        }
        self
    }

    /// Override the consumed category (ignored for train targets).
    pub fn with_consumes(mut self, consumes: Option<WorkCategory>) -> Self {
        self.consumes = Self::derive_consumes(self.work_mode, &self.resource_name, consumes);
        self
    }

    /// Decide which category a resource consumes.
    ///
    /// Train targets always consume archives. Otherwise an explicit value
    /// wins, then a resource name mentioning `zip` or `archive`.
    pub fn derive_consumes(
        work_mode: WorkMode,
        resource_name: &str,
        explicit: Option<WorkCategory>,
    ) -> WorkCategory {
        if work_mode == WorkMode::Train {
            return WorkCategory::Archive;
        }
        if let Some(category) = explicit {
            return category;
        }
        let lower = resource_name.to_ascii_lowercase();
        if lower.contains("zip") || lower.contains("archive") {
            WorkCategory::Archive
        } else {
            WorkCategory::Image
        }
    }

    /// `{namespace}/{resource_name}`, used in log fields.
    pub fn id(&self) -> String {
        format!("{}/{}", self.namespace, self.resource_name)
    }

    /// SCAN patterns for this target's queue keys.
    pub fn key_patterns(&self) -> Vec<String> {
        self.queues.iter().map(|q| format!("{q}_*")).collect()
    }
}

// ── Per-iteration values ──────────────────────────────────────────

/// Pending (non-terminal) item counts by category for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacklogSnapshot {
    pub pending: BTreeMap<WorkCategory, u32>,
}

impl BacklogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from explicit image/archive counts.
    pub fn from_counts(image: u32, archive: u32) -> Self {
        let mut snapshot = Self::new();
        snapshot.pending.insert(WorkCategory::Image, image);
        snapshot.pending.insert(WorkCategory::Archive, archive);
        snapshot
    }

    pub fn record(&mut self, category: WorkCategory) {
        *self.pending.entry(category).or_insert(0) += 1;
    }

    pub fn count(&self, category: WorkCategory) -> u32 {
        self.pending.get(&category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.pending.values().sum()
    }
}

/// Outcome of reading a resource's current replica count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaReading {
    Observed(u32),
    /// Every attempt came back empty or failed. Never treated as zero.
    Unknown,
}

impl ReplicaReading {
    pub fn observed(self) -> Option<u32> {
        match self {
            Self::Observed(n) => Some(n),
            Self::Unknown => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predict_target(name: &str) -> ScalingTarget {
        ScalingTarget::new(
            0,
            MaxReplicas::Fixed(4),
            5,
            "deepcell",
            ResourceKind::Deployment,
            WorkMode::Predict,
            name,
        )
        .unwrap()
    }

    #[test]
    fn classify_archives_case_insensitively() {
        assert_eq!(WorkCategory::classify("x.zip"), WorkCategory::Archive);
        assert_eq!(WorkCategory::classify("x.ZIP"), WorkCategory::Archive);
        assert_eq!(WorkCategory::classify("batch.tar.gz"), WorkCategory::Archive);
        assert_eq!(WorkCategory::classify("x.tiff"), WorkCategory::Image);
        assert_eq!(WorkCategory::classify("zip.png"), WorkCategory::Image);
    }

    #[test]
    fn max_replicas_parses_auto_and_numbers() {
        assert_eq!("auto".parse::<MaxReplicas>().unwrap(), MaxReplicas::Dynamic);
        assert_eq!("-1".parse::<MaxReplicas>().unwrap(), MaxReplicas::Dynamic);
        assert_eq!("7".parse::<MaxReplicas>().unwrap(), MaxReplicas::Fixed(7));
        assert!("seven".parse::<MaxReplicas>().is_err());
    }

    #[test]
    fn dynamic_max_resolves_above_demand() {
        assert_eq!(MaxReplicas::Dynamic.resolve(3, 2), 6);
        assert_eq!(MaxReplicas::Fixed(4).resolve(30, 2), 4);
    }

    #[test]
    fn new_rejects_bad_bounds() {
        let err = ScalingTarget::new(
            5,
            MaxReplicas::Fixed(2),
            1,
            "ns",
            ResourceKind::Job,
            WorkMode::Train,
            "trainer",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MinAboveMax { min: 5, max: 2 }));

        let err = ScalingTarget::new(
            0,
            MaxReplicas::Fixed(2),
            0,
            "ns",
            ResourceKind::Job,
            WorkMode::Train,
            "trainer",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroItemsPerReplica));
    }

    #[test]
    fn consumes_is_derived_from_name() {
        assert_eq!(predict_target("redis-consumer").consumes, WorkCategory::Image);
        assert_eq!(predict_target("zip-consumer").consumes, WorkCategory::Archive);
        assert_eq!(
            predict_target("zip-consumer")
                .with_consumes(Some(WorkCategory::Image))
                .consumes,
            WorkCategory::Image
        );
    }

    #[test]
    fn train_targets_always_consume_archives() {
        let target = ScalingTarget::new(
            0,
            MaxReplicas::Dynamic,
            1,
            "ns",
            ResourceKind::Job,
            WorkMode::Train,
            "training-job",
        )
        .unwrap()
        .with_consumes(Some(WorkCategory::Image));
        assert_eq!(target.consumes, WorkCategory::Archive);
    }

    #[test]
    fn key_patterns_follow_queues() {
        let target = predict_target("redis-consumer");
        assert_eq!(target.key_patterns(), vec!["predict_*".to_string()]);

        let target = target.with_queues(["predict", "track", ""]);
        assert_eq!(
            target.key_patterns(),
            vec!["predict_*".to_string(), "track_*".to_string()]
        );
    }

    #[test]
    fn snapshot_counts() {
        let mut snapshot = BacklogSnapshot::new();
        snapshot.record(WorkCategory::Image);
        snapshot.record(WorkCategory::Image);
        snapshot.record(WorkCategory::Archive);
        assert_eq!(snapshot.count(WorkCategory::Image), 2);
        assert_eq!(snapshot.count(WorkCategory::Archive), 1);
        assert_eq!(snapshot.total(), 3);
        assert_eq!(BacklogSnapshot::new().count(WorkCategory::Archive), 0);
    }
}
