//! Command line and environment for `qscaled`.
//!
//! Three ways to describe targets, in order of precedence:
//!
//! 1. `--config <path>`: a `qscale.toml` with `[loop]` and `[[target]]`
//! 2. `AUTOSCALING`: the legacy `min|max|per|ns|kind|mode|name;...` string
//! 3. the single-target variables (`RESOURCE_NAME`, `QUEUES`, ...)

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};

use qscale_core::config::{ENTRY_DELIMITER, FIELD_DELIMITER};
use qscale_core::{
    ConfigError, ConfigResult, LoopSettings, QscaleConfig, ScalingTarget, WorkMode,
    parse_scaling_config,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "qscaled",
    about = "Scale Kubernetes workloads on Redis queue backlog",
    version
)]
pub struct Cli {
    /// TOML file describing the loop and its targets.
    #[arg(long, env = "QSCALE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Legacy multi-target string; overrides the single-target options.
    #[arg(long, env = "AUTOSCALING")]
    pub autoscaling: Option<String>,

    #[arg(long, env = "RESOURCE_NAME")]
    pub resource_name: Option<String>,

    /// `deployment` or `job`.
    #[arg(long, env = "RESOURCE_TYPE", default_value = "deployment")]
    pub resource_type: String,

    #[arg(long, env = "RESOURCE_NAMESPACE", default_value = "default")]
    pub resource_namespace: String,

    /// Queue prefixes to scan, joined by `--queue-delimiter`.
    #[arg(long, env = "QUEUES", default_value = "predict")]
    pub queues: String,

    #[arg(long, env = "QUEUE_DELIMITER", default_value = ",")]
    pub queue_delimiter: char,

    /// `predict` or `train`; inferred from the first queue when unset.
    #[arg(long, env = "WORK_MODE")]
    pub work_mode: Option<String>,

    /// `image` or `archive`; inferred from the resource name when unset.
    #[arg(long, env = "CONSUMES")]
    pub consumes: Option<String>,

    #[arg(long, env = "MIN_PODS", default_value_t = 0)]
    pub min_pods: u32,

    /// A replica count, or `auto` for no upper bound.
    #[arg(long, env = "MAX_PODS", default_value = "1")]
    pub max_pods: String,

    #[arg(long, env = "KEYS_PER_POD", default_value_t = 1)]
    pub keys_per_pod: u32,

    /// Seconds between passes when nothing is wanted.
    #[arg(long, env = "INTERVAL", default_value_t = 5)]
    pub interval: u64,

    /// Seconds between passes while any target wants replicas.
    #[arg(long, env = "ACTIVE_INTERVAL", default_value_t = 60)]
    pub active_interval: u64,

    /// Seconds to pause scaling after a control-plane change.
    #[arg(long, env = "COOLDOWN", default_value_t = 900)]
    pub cooldown: u64,

    /// `high`, `medium`, or `low`.
    #[arg(long, env = "VERBOSITY", default_value = "high")]
    pub verbosity: String,

    #[arg(long, env = "REDIS_HOST")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Seconds between queue store retries.
    #[arg(long, env = "REDIS_INTERVAL", default_value_t = 1)]
    pub redis_interval: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Parse `args` with every `env` fallback switched off, so only the
    /// given arguments and the defaults apply.
    pub fn try_parse_args_only<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let command = Self::command();
        let ids: Vec<clap::Id> = command
            .get_arguments()
            .map(|arg| arg.get_id().clone())
            .collect();
        let command = ids.iter().fold(command, |command, id| {
            command.mut_arg(id, |arg| arg.env(None::<&'static str>))
        });
        let matches = command.try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Resolve targets and loop settings from whichever source applies.
    pub fn load(&self) -> ConfigResult<(Vec<ScalingTarget>, LoopSettings)> {
        if let Some(path) = &self.config {
            let config = QscaleConfig::from_file(path)?;
            let targets = config.scaling_targets()?;
            return Ok((targets, config.loop_settings));
        }
        Ok((self.scaling_targets()?, self.loop_settings()?))
    }

    /// Targets from `AUTOSCALING`, falling back to the single-target options.
    pub fn scaling_targets(&self) -> ConfigResult<Vec<ScalingTarget>> {
        match self.autoscaling.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                parse_scaling_config(raw, ENTRY_DELIMITER, FIELD_DELIMITER)
            }
            _ => Ok(vec![self.single_target()?]),
        }
    }

    pub fn loop_settings(&self) -> ConfigResult<LoopSettings> {
        Ok(LoopSettings {
            interval_secs: self.interval,
            active_interval_secs: self.active_interval,
            cooldown_secs: self.cooldown,
            verbosity: self.verbosity.parse()?,
        })
    }

    fn queue_list(&self) -> Vec<String> {
        self.queues
            .split(self.queue_delimiter)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from)
            .collect()
    }

    fn single_target(&self) -> ConfigResult<ScalingTarget> {
        let name = self
            .resource_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ConfigError::Missing("RESOURCE_NAME"))?;

        let queues = self.queue_list();
        let work_mode = match self.work_mode.as_deref() {
            Some(mode) => mode.trim().parse()?,
            None => queues
                .first()
                .map(|q| WorkMode::infer_from_queue(q))
                .unwrap_or(WorkMode::Predict),
        };
        let consumes = self
            .consumes
            .as_deref()
            .map(|c| c.trim().parse())
            .transpose()?;

        Ok(ScalingTarget::new(
            self.min_pods,
            self.max_pods.trim().parse()?,
            self.keys_per_pod,
            self.resource_namespace.trim(),
            self.resource_type.trim().parse()?,
            work_mode,
            name,
        )?
        .with_queues(queues)
        .with_consumes(consumes))
    }
}
