//! qscale-core: shared types for the qscale backlog autoscaler.
//!
//! Defines the scaling target model, the legacy `AUTOSCALING` string
//! parser, the TOML config loader, and the bounded retry policy used by
//! the queue and cluster adapters.

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::{LoopSettings, QscaleConfig, parse_scaling_config};
pub use error::{ConfigError, ConfigResult};
pub use retry::RetryPolicy;
pub use types::*;
