// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Alert payloads built from regression verdicts.
//!
//! Formatting is a pure function of the verdicts and the commit: no I/O,
//! no clock, no randomness. An empty payload means "no alert", which is a
//! normal outcome.

use crate::verdict::Verdict;
use bench_history_core::CommitInfo;
use serde::{Deserialize, Serialize};

/// Commit information carried by an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCommit {
    /// Commit id.
    pub id: String,
    /// First line of the commit message.
    pub message: String,
    /// Author display name.
    pub author: String,
    /// Link to the commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&CommitInfo> for AlertCommit {
    fn from(commit: &CommitInfo) -> Self {
        Self {
            id: commit.id.clone(),
            message: commit.summary().to_string(),
            author: commit.author.display_name().to_string(),
            url: commit.url.clone(),
        }
    }
}

/// One regressed benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertItem {
    /// Benchmark name.
    pub name: String,
    /// Benchmark unit.
    pub unit: String,
    /// Baseline value.
    pub previous: f64,
    /// Newly observed value.
    pub current: f64,
    /// Normalised ratio (below 1 is worse).
    pub ratio: f64,
    /// Commit the baseline came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_commit: Option<String>,
}

/// Structured notification for one ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    /// Tool whose results regressed.
    pub tool: String,
    /// Threshold in effect.
    pub threshold: f64,
    /// Commit being reported on.
    pub commit: AlertCommit,
    /// Regressed benchmarks, in measurement order.
    pub regressions: Vec<AlertItem>,
}

impl AlertPayload {
    /// Whether there is nothing to alert on.
    pub fn is_empty(&self) -> bool {
        self.regressions.is_empty()
    }

    /// Number of regressed benchmarks.
    pub fn len(&self) -> usize {
        self.regressions.len()
    }

    /// Markdown rendering suitable for a pull request comment.
    pub fn render_markdown(&self) -> String {
        crate::markdown::alert(self)
    }
}

/// Builds [`AlertPayload`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertFormatter {
    threshold: f64,
}

impl AlertFormatter {
    /// Formatter reporting `threshold` in its payloads.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Collect the regression verdicts into a payload.
    ///
    /// Verdicts of any other kind are ignored; with no regressions the
    /// payload is empty.
    pub fn format(&self, tool: &str, commit: &CommitInfo, verdicts: &[Verdict]) -> AlertPayload {
        let regressions = verdicts
            .iter()
            .filter(|v| v.is_regression())
            .filter_map(|v| {
                Some(AlertItem {
                    name: v.name.clone(),
                    unit: v.unit.clone(),
                    previous: v.baseline?,
                    current: v.observed,
                    ratio: v.ratio?,
                    previous_commit: v.baseline_commit.clone(),
                })
            })
            .collect();

        AlertPayload {
            tool: tool.to_string(),
            threshold: self.threshold,
            commit: AlertCommit::from(commit),
            regressions,
        }
    }
}
