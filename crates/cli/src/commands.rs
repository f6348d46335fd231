// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subcommand implementations.

use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use bench_history_collector::{IngestSummary, IngestionPipeline};
use bench_history_core::{CommitInfo, History, Measurement, MeasurementSet};
use bench_history_detector::{markdown, VerdictKind};
use bench_history_storage::{FileHistoryStore, HistoryStore};
use chrono::DateTime;
use colored::Colorize;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::Path;
use tracing::info;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Colored human-readable text.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
    /// Markdown, suitable for a pull request comment.
    Markdown,
}

/// Normalized run file accepted by `ingest`.
///
/// `tool` and `date` may be omitted; the tool then has to come from
/// `--tool` and the date defaults to now.
#[derive(Debug, Deserialize)]
struct RunInput {
    #[serde(default)]
    tool: Option<String>,
    commit: CommitInfo,
    #[serde(default)]
    date: Option<i64>,
    benches: Vec<Measurement>,
}

/// Parse a run file into a validated measurement set.
pub fn read_run(path: &Path, tool_override: Option<&str>) -> Result<MeasurementSet> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_run(&text, tool_override).with_context(|| format!("Invalid run file {}", path.display()))
}

fn parse_run(text: &str, tool_override: Option<&str>) -> Result<MeasurementSet> {
    let input: RunInput = serde_json::from_str(text)?;
    let tool = match (tool_override, input.tool) {
        (Some(tool), _) => tool.to_string(),
        (None, Some(tool)) => tool,
        (None, None) => bail!("no tool given; set \"tool\" in the run file or pass --tool"),
    };

    let mut builder = MeasurementSet::builder()
        .tool(tool)
        .commit(input.commit)
        .measurements(input.benches);
    if let Some(date) = input.date {
        builder = builder.date(date);
    }
    Ok(builder.build()?)
}

/// Ingest a run file. Returns whether an alert was raised.
pub fn ingest(
    settings: &Settings,
    data: &Path,
    input: &Path,
    tool: Option<&str>,
    format: OutputFormat,
) -> Result<bool> {
    let set = read_run(input, tool)?;
    let store = FileHistoryStore::new(data);
    let pipeline = IngestionPipeline::new(store, settings.ingest_options())
        .context("Invalid detector configuration")?;

    let summary = pipeline
        .ingest(set)
        .with_context(|| format!("Failed to ingest {}", input.display()))?;

    match format {
        OutputFormat::Text => print_summary_text(&summary),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?)
        }
        OutputFormat::Markdown => {
            if summary.has_alerts() {
                print!("{}", summary.alerts.render_markdown());
            } else {
                print!("{}", markdown::verdict_summary(&summary.tool, summary.verdicts()));
            }
        }
    }

    Ok(summary.has_alerts())
}

fn summary_json(summary: &IngestSummary) -> serde_json::Value {
    let rejected: Vec<String> = summary.report.rejected.iter().map(|e| e.to_string()).collect();
    json!({
        "tool": summary.tool,
        "commit": summary.commit_id,
        "persisted": summary.persisted,
        "attempts": summary.attempts,
        "version": summary.version.to_string(),
        "entries": summary.tool_entries,
        "verdicts": summary.verdicts(),
        "rejected": rejected,
        "alert": if summary.has_alerts() { json!(summary.alerts) } else { serde_json::Value::Null },
    })
}

fn print_summary_text(summary: &IngestSummary) {
    println!(
        "{} {} @ {} ({} entries, {} attempt{})",
        "Ingested".green().bold(),
        summary.tool.bold(),
        summary.commit_id,
        summary.tool_entries,
        summary.attempts,
        if summary.attempts == 1 { "" } else { "s" }
    );

    for verdict in summary.verdicts() {
        let label = match verdict.kind {
            VerdictKind::Ok => verdict.kind.as_str().green(),
            VerdictKind::Regression => verdict.kind.as_str().red().bold(),
            VerdictKind::Improvement => verdict.kind.as_str().cyan(),
            VerdictKind::InsufficientData => verdict.kind.as_str().yellow(),
        };
        let ratio = verdict
            .ratio
            .map(|r| format!("ratio {r:.3}"))
            .unwrap_or_else(|| format!("{} prior", verdict.prior_samples));
        println!(
            "  {:<18} {} {} {}",
            label,
            verdict.name,
            format!("{} {}", verdict.observed, verdict.unit).dimmed(),
            ratio
        );
    }

    for rejected in &summary.report.rejected {
        println!("  {:<18} {}", "rejected".magenta(), rejected);
    }

    if summary.has_alerts() {
        println!(
            "{} {} benchmark(s) regressed beyond {}",
            "Alert:".red().bold(),
            summary.alerts.len(),
            summary.alerts.threshold
        );
    }
}

fn load_history(data: &Path) -> Result<History> {
    let snapshot = FileHistoryStore::new(data)
        .load()
        .with_context(|| format!("Failed to load {}", data.display()))?;
    Ok(snapshot.history)
}

fn format_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// Print one benchmark's series.
pub fn show(
    data: &Path,
    tool: &str,
    name: &str,
    unit: Option<&str>,
    tail: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let history = load_history(data)?;

    // Without --unit, take the unit of the most recent matching entry.
    let unit = match unit {
        Some(unit) => unit.to_string(),
        None => history
            .entries(tool)
            .iter()
            .rev()
            .find_map(|entry| entry.get(name).map(|m| m.unit.clone()))
            .with_context(|| format!("No benchmark named '{name}' recorded for tool '{tool}'"))?,
    };

    let series = history.series(tool, name, &unit);
    let points = match tail {
        Some(n) => series.tail(n),
        None => series.points(),
    };
    info!(tool, name, unit = %unit, points = points.len(), "loaded series");

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = points
                .iter()
                .map(|p| {
                    json!({
                        "commit": p.commit.id,
                        "date": p.date,
                        "value": p.measurement.value,
                        "dispersion": p.measurement.dispersion,
                        "samples": p.measurement.samples,
                    })
                })
                .collect();
            let out = json!({ "tool": tool, "name": name, "unit": unit, "points": rows });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Markdown => {
            println!("| Commit | Date | Value |");
            println!("|--------|------|-------|");
            for p in points {
                println!(
                    "| `{}` | {} | {} {} |",
                    p.commit.short_id(),
                    format_date(p.date),
                    p.measurement.value,
                    unit
                );
            }
        }
        OutputFormat::Text => {
            println!("{} {} ({})", tool.bold(), name.bold(), unit);
            for p in points {
                let spread = p
                    .measurement
                    .dispersion
                    .map(|d| format!(" ± {d}"))
                    .unwrap_or_default();
                println!(
                    "  {}  {}  {}{} {}  {}",
                    p.commit.short_id().yellow(),
                    format_date(p.date).dimmed(),
                    p.measurement.value,
                    spread,
                    unit,
                    p.commit.summary()
                );
            }
        }
    }
    Ok(())
}

/// Print an overview of the history file.
pub fn status(data: &Path, format: OutputFormat) -> Result<()> {
    if !data.exists() {
        println!("{} {} does not exist yet", "Empty:".yellow(), data.display());
        return Ok(());
    }
    let history = load_history(data)?;

    let tools: Vec<_> = history
        .tools()
        .map(|tool| {
            let entries = history.entries(tool);
            let mut names: Vec<&str> = entries
                .iter()
                .flat_map(|e| e.measurements.iter().map(|m| m.name.as_str()))
                .collect();
            names.sort_unstable();
            names.dedup();
            (tool, entries.len(), names.len(), entries.last().map(|e| e.commit.short_id()))
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = tools
                .iter()
                .map(|(tool, entries, benchmarks, latest)| {
                    json!({
                        "tool": tool,
                        "entries": entries,
                        "benchmarks": benchmarks,
                        "latestCommit": latest,
                    })
                })
                .collect();
            let out = json!({
                "repoUrl": history.repo_url,
                "lastUpdate": history.last_update,
                "totalEntries": history.total_entries(),
                "tools": rows,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text | OutputFormat::Markdown => {
            println!("{}", "Benchmark History".bold());
            println!("File:        {}", data.display());
            println!("Repository:  {}", history.repo_url);
            println!("Last update: {}", format_date(history.last_update));
            println!("Entries:     {}", history.total_entries());
            for (tool, entries, benchmarks, latest) in &tools {
                println!(
                    "  {:<24} {:>5} entries  {:>4} benchmarks  latest {}",
                    tool.cyan(),
                    entries,
                    benchmarks,
                    latest.unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}
