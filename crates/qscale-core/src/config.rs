//! Scaling configuration: the legacy `AUTOSCALING` string and `qscale.toml`.
//!
//! The legacy string holds one entry per target, entries separated by
//! `;` and fields by `|`:
//!
//! ```text
//! min|max|itemsPerReplica|namespace|resourceKind|workMode|resourceName
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::*;

pub const ENTRY_DELIMITER: char = ';';
pub const FIELD_DELIMITER: char = '|';

/// Parse a legacy multi-target scaling string.
///
/// All whitespace is stripped first. Empty entries (e.g. a trailing
/// delimiter) are skipped; any malformed entry fails the whole parse.
pub fn parse_scaling_config(
    raw: &str,
    entry_delim: char,
    field_delim: char,
) -> ConfigResult<Vec<ScalingTarget>> {
    if entry_delim == field_delim {
        return Err(ConfigError::SameDelimiter(entry_delim));
    }

    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let targets = stripped
        .split(entry_delim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| parse_entry(entry, field_delim))
        .collect::<ConfigResult<Vec<_>>>()?;

    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }
    Ok(targets)
}

fn parse_entry(entry: &str, field_delim: char) -> ConfigResult<ScalingTarget> {
    let fields: Vec<&str> = entry.split(field_delim).collect();
    let [min, max, per, namespace, kind, mode, name] = fields.as_slice() else {
        return Err(ConfigError::FieldCount {
            entry: entry.to_string(),
            found: fields.len(),
        });
    };

    ScalingTarget::new(
        parse_u32("min replicas", min)?,
        max.parse()?,
        parse_u32("items per replica", per)?,
        *namespace,
        kind.parse()?,
        mode.parse()?,
        *name,
    )
}

fn parse_u32(field: &'static str, value: &str) -> ConfigResult<u32> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

// ── Loop settings ─────────────────────────────────────────────────

/// Timing and logging settings for the control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Seconds between passes when no replicas are desired.
    pub interval_secs: u64,
    /// Seconds between passes while any target wants replicas.
    pub active_interval_secs: u64,
    /// Seconds to suspend scaling after a control-plane change.
    pub cooldown_secs: u64,
    pub verbosity: Verbosity,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            active_interval_secs: 60,
            cooldown_secs: 15 * 60,
            verbosity: Verbosity::High,
        }
    }
}

impl LoopSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_secs(self.active_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

// ── qscale.toml ───────────────────────────────────────────────────

/// Top-level `qscale.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct QscaleConfig {
    #[serde(default, rename = "loop")]
    pub loop_settings: LoopSettings,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
}

/// A `[[target]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub resource_name: String,
    #[serde(default = "default_kind")]
    pub resource_kind: ResourceKind,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub work_mode: Option<WorkMode>,
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default)]
    pub consumes: Option<WorkCategory>,
    #[serde(default)]
    pub min_replicas: u32,
    #[serde(default = "default_max")]
    pub max_replicas: MaxSetting,
    #[serde(default = "default_items_per_replica")]
    pub items_per_replica: u32,
}

/// `max_replicas` may be a number or the string `"auto"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaxSetting {
    Count(u32),
    Word(String),
}

fn default_kind() -> ResourceKind {
    ResourceKind::Deployment
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_max() -> MaxSetting {
    MaxSetting::Count(1)
}

fn default_items_per_replica() -> u32 {
    1
}

impl TargetConfig {
    pub fn into_target(self) -> ConfigResult<ScalingTarget> {
        let max = match &self.max_replicas {
            MaxSetting::Count(n) => MaxReplicas::Fixed(*n),
            MaxSetting::Word(w) => w.parse()?,
        };
        let work_mode = self.work_mode.unwrap_or_else(|| {
            self.queues
                .first()
                .map(|q| WorkMode::infer_from_queue(q))
                .unwrap_or(WorkMode::Predict)
        });

        Ok(ScalingTarget::new(
            self.min_replicas,
            max,
            self.items_per_replica,
            self.namespace,
            self.resource_kind,
            work_mode,
            self.resource_name,
        )?
        .with_queues(self.queues)
        .with_consumes(self.consumes))
    }
}

impl QscaleConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate every `[[target]]` table.
    pub fn scaling_targets(&self) -> ConfigResult<Vec<ScalingTarget>> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        self.targets
            .iter()
            .cloned()
            .map(TargetConfig::into_target)
            .collect()
    }
}
