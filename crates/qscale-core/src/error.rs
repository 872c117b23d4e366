//! Error types for target configuration parsing.

use thiserror::Error;

/// Result type alias for configuration parsing.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while turning configuration into scaling targets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entry delimiter and field delimiter must differ, both are {0:?}")]
    SameDelimiter(char),

    #[error("scaling entry {entry:?} has {found} fields, expected 7")]
    FieldCount { entry: String, found: usize },

    #[error("invalid {field}: {value:?} is not a non-negative integer")]
    InvalidNumber { field: &'static str, value: String },

    #[error("items per replica must be greater than zero")]
    ZeroItemsPerReplica,

    #[error("min replicas ({min}) exceeds max replicas ({max})")]
    MinAboveMax { min: u32, max: u32 },

    #[error("unknown resource kind {0:?}, expected `deployment` or `job`")]
    UnknownResourceKind(String),

    #[error("unknown work mode {0:?}, expected `predict` or `train`")]
    UnknownWorkMode(String),

    #[error("unknown work category {0:?}, expected `image` or `archive`")]
    UnknownCategory(String),

    #[error("unknown verbosity {0:?}, expected `high`, `medium` or `low`")]
    UnknownVerbosity(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("no scaling targets configured")]
    NoTargets,

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}
