// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered CLI configuration.
//!
//! Precedence, lowest first: built-in defaults, a TOML file
//! (`bench-history.toml` in the working directory if present, or the file
//! given with `--config`), `BENCH_HISTORY_*` environment variables, then
//! command-line flags applied by the caller.
//!
//! Nested keys use `__` in environment variables, e.g.
//! `BENCH_HISTORY_RETRY__MAX_ATTEMPTS=10`.

use bench_history_collector::IngestOptions;
use bench_history_core::{Direction, RetryPolicy, ThresholdConfig};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bench-history.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BENCH_HISTORY";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Retry bounds as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total persist attempts.
    pub max_attempts: u32,
    /// First backoff delay in milliseconds.
    pub backoff_ms: u64,
    /// Overall bound in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_ms: policy.backoff_ms,
            timeout_ms: policy.timeout_ms,
        }
    }
}

/// One unit directionality entry.
///
/// Units are values rather than table keys because config sources
/// lowercase keys, and unit lookup is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDirection {
    /// Unit string as reported by the tool, e.g. `MB/s`.
    pub unit: String,
    /// Whether larger values are better.
    pub direction: Direction,
}

/// Effective CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Relative change that counts as a regression.
    pub alert_threshold: f64,
    /// Prior entries required before regressions are reported.
    pub min_samples: usize,
    /// Compare against a rolling mean.
    pub use_rolling_average: bool,
    /// Rolling mean window.
    pub rolling_window: usize,
    /// Optional noise gate in combined standard deviations.
    pub dispersion_sigmas: Option<f64>,
    /// Unit directionality additions, as `[[unit_directions]]` tables.
    pub unit_directions: Vec<UnitDirection>,
    /// Repository URL recorded in a new history.
    pub repo_url: Option<String>,
    /// Persist retry bounds.
    pub retry: RetrySettings,
    /// Default log filter.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        let thresholds = ThresholdConfig::default();
        Self {
            alert_threshold: thresholds.alert_threshold,
            min_samples: thresholds.min_samples,
            use_rolling_average: thresholds.use_rolling_average,
            rolling_window: thresholds.rolling_window,
            dispersion_sigmas: thresholds.dispersion_sigmas,
            unit_directions: Vec::new(),
            repo_url: None,
            retry: RetrySettings::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Settings {
    /// Load defaults, the config file and the process environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, None)
    }

    /// Like [`Settings::load`], reading environment variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        config_path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let builder = Config::builder();

        let builder = match config_path {
            Some(path) => {
                builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
            }
            None => {
                builder.add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false))
            }
        };

        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        builder.build()?.try_deserialize()
    }

    /// Detector and retry options for the ingestion pipeline.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            thresholds: ThresholdConfig {
                alert_threshold: self.alert_threshold,
                min_samples: self.min_samples,
                use_rolling_average: self.use_rolling_average,
                rolling_window: self.rolling_window,
                dispersion_sigmas: self.dispersion_sigmas,
                unit_directions: self
                    .unit_directions
                    .iter()
                    .map(|entry| (entry.unit.clone(), entry.direction))
                    .collect(),
            },
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                backoff_ms: self.retry.backoff_ms,
                timeout_ms: self.retry.timeout_ms,
            },
            repo_url: self.repo_url.clone(),
        }
    }

    /// Render as TOML, in the shape the config file accepts.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
