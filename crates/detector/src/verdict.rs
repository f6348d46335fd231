// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Detector output types.

use bench_history_core::{Direction, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing one measurement against its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictKind {
    /// Within threshold.
    Ok,
    /// Worse than the baseline by more than the threshold.
    Regression,
    /// Better than the baseline by more than the threshold. Informational.
    Improvement,
    /// No usable baseline, or too little history to trust a regression.
    InsufficientData,
}

impl VerdictKind {
    /// Label used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Regression => "regression",
            Self::Improvement => "improvement",
            Self::InsufficientData => "insufficient-data",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The detector's decision for one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Benchmark name.
    pub name: String,
    /// Benchmark unit.
    pub unit: String,
    /// Decision.
    pub kind: VerdictKind,
    /// Direction applied for the unit.
    pub direction: Direction,
    /// Newly observed value.
    pub observed: f64,
    /// Value compared against, if a baseline existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    /// Normalised ratio; below 1 means worse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    /// Prior entries in the series.
    pub prior_samples: usize,
    /// Commit of the most recent prior entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_commit: Option<String>,
}

impl Verdict {
    /// Whether this verdict should raise an alert.
    pub fn is_regression(&self) -> bool {
        self.kind == VerdictKind::Regression
    }
}

/// Verdicts for a whole measurement set, plus measurements that could not
/// be evaluated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    /// One verdict per valid measurement, in input order.
    pub verdicts: Vec<Verdict>,
    /// Measurements rejected during evaluation.
    pub rejected: Vec<ValidationError>,
}

impl EvaluationReport {
    /// Verdicts that are regressions.
    pub fn regressions(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.is_regression())
    }

    /// Count of verdicts of `kind`.
    pub fn count(&self, kind: VerdictKind) -> usize {
        self.verdicts.iter().filter(|v| v.kind == kind).count()
    }

    /// Verdict for a benchmark name.
    pub fn get(&self, name: &str) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.name == name)
    }
}
