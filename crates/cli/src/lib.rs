// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI for benchmark history.
//!
//! Provides the `bench-history` binary: `ingest` records a normalized run
//! into a history file and reports regressions, `show` prints one
//! benchmark's series, `status` summarises a history file and `config`
//! prints the effective configuration.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commands;
pub mod settings;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::OutputFormat;
use settings::{LogFormat, Settings, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Exit code when `--fail-on-alert` is set and a regression was found.
pub const ALERT_EXIT_CODE: i32 = 2;

/// Benchmark history CLI.
#[derive(Parser, Debug)]
#[command(name = "bench-history")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (TOML). Defaults to ./bench-history.toml when present.
    #[arg(short, long, global = true, env = "BENCH_HISTORY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `bench_history_storage=debug`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a run into the history file and check it for regressions.
    Ingest {
        /// History file (`.js` files use the dashboard script form).
        #[arg(short, long)]
        data: PathBuf,

        /// Normalized run file (JSON with `commit`, `benches`, optional `tool` and `date`).
        #[arg(short, long)]
        input: PathBuf,

        /// Tool name, overriding the run file.
        #[arg(short, long)]
        tool: Option<String>,

        /// Repository URL for a new history file.
        #[arg(long)]
        repo_url: Option<String>,

        /// Alert threshold, overriding configuration.
        #[arg(long)]
        threshold: Option<f64>,

        /// Minimum prior samples, overriding configuration.
        #[arg(long)]
        min_samples: Option<usize>,

        /// Compare against a rolling mean over this many entries.
        #[arg(long)]
        rolling_window: Option<usize>,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Exit with a non-zero code when a regression is detected.
        #[arg(long)]
        fail_on_alert: bool,
    },

    /// Print the recorded series of one benchmark.
    Show {
        /// History file.
        #[arg(short, long)]
        data: PathBuf,

        /// Tool name.
        #[arg(short, long)]
        tool: String,

        /// Benchmark name.
        #[arg(short, long)]
        name: String,

        /// Benchmark unit. Defaults to the unit of the latest entry.
        #[arg(short, long)]
        unit: Option<String>,

        /// Only the last N points.
        #[arg(long)]
        tail: Option<usize>,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Summarise a history file.
    Status {
        /// History file.
        #[arg(short, long)]
        data: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    /// Load settings and apply this invocation's flags on top.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings =
            Settings::load(self.config.as_deref()).with_context(|| match &self.config {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => {
                    format!("Failed to load configuration ({DEFAULT_CONFIG_FILE} / environment)")
                }
            })?;

        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            settings.log_format = format;
        }
        if let Commands::Ingest {
            repo_url,
            threshold,
            min_samples,
            rolling_window,
            ..
        } = &self.command
        {
            if let Some(url) = repo_url {
                settings.repo_url = Some(url.clone());
            }
            if let Some(threshold) = threshold {
                settings.alert_threshold = *threshold;
            }
            if let Some(min_samples) = min_samples {
                settings.min_samples = *min_samples;
            }
            if let Some(window) = rolling_window {
                settings.use_rolling_average = true;
                settings.rolling_window = *window;
            }
        }
        Ok(settings)
    }
}

/// Install the global tracing subscriber. Logs go to stderr.
pub fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // A subscriber may already be installed when embedded; keep it.
    let _ = match settings.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    };
}

/// Run the CLI with the process arguments.
///
/// Returns the process exit code on success.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    init_logging(&settings);

    match cli.command {
        Commands::Ingest {
            data,
            input,
            tool,
            format,
            fail_on_alert,
            ..
        } => {
            let alerted = commands::ingest(&settings, &data, &input, tool.as_deref(), format)?;
            Ok(if alerted && fail_on_alert { ALERT_EXIT_CODE } else { 0 })
        }
        Commands::Show {
            data,
            tool,
            name,
            unit,
            tail,
            format,
        } => {
            commands::show(&data, &tool, &name, unit.as_deref(), tail, format)?;
            Ok(0)
        }
        Commands::Status { data, format } => {
            commands::status(&data, format)?;
            Ok(0)
        }
        Commands::Config => {
            print!("{}", settings.to_toml().context("Failed to render configuration")?);
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "bench-history",
            "ingest",
            "--data",
            "data.js",
            "--input",
            "run.json",
            "--format",
            "json",
            "--fail-on-alert",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest {
                data,
                format,
                fail_on_alert,
                ..
            } => {
                assert_eq!(data, PathBuf::from("data.js"));
                assert_eq!(format, OutputFormat::Json);
                assert!(fail_on_alert);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        std::fs::write(
            &path,
            "alert_threshold = 0.25\nmin_samples = 4\nlog_level = \"warn\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "bench-history",
            "--config",
            path.to_str().unwrap(),
            "--log-format",
            "json",
            "ingest",
            "--data",
            "data.json",
            "--input",
            "run.json",
            "--threshold",
            "0.05",
            "--rolling-window",
            "3",
        ])
        .unwrap();
        let settings = cli.settings().unwrap();

        assert_eq!(settings.alert_threshold, 0.05);
        assert_eq!(settings.min_samples, 4);
        assert!(settings.use_rolling_average);
        assert_eq!(settings.rolling_window, 3);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.log_format, LogFormat::Json);
    }
}
