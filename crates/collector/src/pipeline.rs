// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The ingestion pipeline.
//!
//! One call to [`IngestionPipeline::ingest`] runs validate → load →
//! evaluate → append → persist. A version conflict on persist restarts
//! from load, so the new entry is always appended to (and evaluated
//! against) the latest persisted history.

use crate::error::{IngestError, Result};
use bench_history_core::{History, MeasurementSet, RetryPolicy, ThresholdConfig, ValidationError};
use bench_history_detector::{
    AlertFormatter, AlertPayload, EvaluationReport, RegressionDetector, Verdict,
};
use bench_history_storage::{HistoryStore, Snapshot, StoreError, Version};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for one pipeline: detection thresholds plus the retry bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestOptions {
    /// Detector configuration.
    #[serde(flatten)]
    pub thresholds: ThresholdConfig,
    /// Optimistic-concurrency retry bounds.
    pub retry: RetryPolicy,
    /// Repository URL recorded in a history that does not have one yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
}

impl IngestOptions {
    /// Validate both halves of the options.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.thresholds.validate()?;
        self.retry.validate()
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    /// Tool the set was recorded under.
    pub tool: String,
    /// Commit the set was recorded for.
    pub commit_id: String,
    /// Whether the entry was written. A failed write is an [`IngestError`]
    /// instead, so this is true for every returned summary.
    pub persisted: bool,
    /// Persist attempts used, including the successful one.
    pub attempts: u32,
    /// Version of the history after the write.
    pub version: Version,
    /// Number of entries now recorded for the tool.
    pub tool_entries: usize,
    /// Detector output, evaluated against the history the entry was
    /// appended to.
    pub report: EvaluationReport,
    /// Alert for the regressions in `report`; empty if there were none.
    pub alerts: AlertPayload,
}

impl IngestSummary {
    /// One verdict per evaluated measurement.
    pub fn verdicts(&self) -> &[Verdict] {
        &self.report.verdicts
    }

    /// Whether any measurement regressed.
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

/// Validates, evaluates and persists measurement sets into a
/// [`HistoryStore`].
pub struct IngestionPipeline<S> {
    store: S,
    detector: RegressionDetector,
    formatter: AlertFormatter,
    retry: RetryPolicy,
    repo_url: Option<String>,
}

impl<S: HistoryStore> IngestionPipeline<S> {
    /// Build a pipeline over `store`. Fails if the options are invalid.
    pub fn new(store: S, options: IngestOptions) -> std::result::Result<Self, ValidationError> {
        options.validate()?;
        let formatter = AlertFormatter::new(options.thresholds.alert_threshold);
        let detector = RegressionDetector::new(options.thresholds)?;
        Ok(Self {
            store,
            detector,
            formatter,
            retry: options.retry,
            repo_url: options.repo_url,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The detector in use.
    pub fn detector(&self) -> &RegressionDetector {
        &self.detector
    }

    /// Ingest one measurement set.
    ///
    /// An invalid set is rejected before anything is read or written. On
    /// success the store holds the previous history with `set` appended to
    /// its tool's list. On failure the store holds whatever it held before.
    pub fn ingest(&self, set: MeasurementSet) -> Result<IngestSummary> {
        set.validate()?;

        let location = self.store.describe();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let snapshot = self.store.load().map_err(|source| IngestError::Load {
                location: location.clone(),
                source,
            })?;

            debug!(
                location = %location,
                attempt,
                version = %snapshot.version,
                "loaded history"
            );

            let (report, next) = self.apply(&snapshot, &set);

            match self.store.persist(&next, &snapshot.version) {
                Ok(version) => {
                    info!(
                        location = %location,
                        tool = %set.tool,
                        commit = %set.commit.short_id(),
                        attempts = attempt,
                        regressions = report.regressions().count(),
                        "ingested measurement set"
                    );
                    let alerts = self.formatter.format(&set.tool, &set.commit, &report.verdicts);
                    return Ok(IngestSummary {
                        tool: set.tool.clone(),
                        commit_id: set.commit.id.clone(),
                        persisted: true,
                        attempts: attempt,
                        version,
                        tool_entries: next.entries(&set.tool).len(),
                        report,
                        alerts,
                    });
                }
                Err(StoreError::Conflict { expected, found }) => {
                    warn!(
                        location = %location,
                        attempt,
                        expected = %expected,
                        found = %found,
                        "history changed since it was loaded"
                    );
                    if attempt >= self.retry.max_attempts {
                        return Err(IngestError::ConcurrentModification {
                            location,
                            attempts: attempt,
                        });
                    }
                    let delay = self.retry.backoff(attempt);
                    if started.elapsed() + delay > self.retry.timeout() {
                        return Err(IngestError::RetryTimeout {
                            location,
                            attempts: attempt,
                            timeout_ms: self.retry.timeout_ms,
                        });
                    }
                    thread::sleep(delay);
                }
                Err(source) => return Err(IngestError::Persist { location, source }),
            }
        }
    }

    /// Evaluate `set` against the snapshot and build the history to write.
    fn apply(&self, snapshot: &Snapshot, set: &MeasurementSet) -> (EvaluationReport, History) {
        let report = self.detector.evaluate(set, &snapshot.history);
        let mut next = self.store.append(&snapshot.history, &set.tool, set.clone());
        if next.repo_url.is_empty() {
            if let Some(url) = &self.repo_url {
                next.repo_url = url.clone();
            }
        }
        (report, next)
    }
}
