// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Measurement types.
//!
//! A [`MeasurementSet`] is the normalised output of one benchmark tool for
//! one commit. Tool-specific adapters produce it; the ingestion pipeline
//! owns it until it is appended to the history, after which it is never
//! mutated.

use crate::commit::CommitInfo;
use crate::error::{Result, ValidationError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One named numeric result.
///
/// `name` and `unit` together define comparability: a measurement is only
/// ever compared against prior measurements sharing both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Benchmark name, unique within its set.
    pub name: String,
    /// Measured value.
    #[serde(serialize_with = "crate::wire::serialize_number")]
    pub value: f64,
    /// Unit of `value`, e.g. `iter/sec` or `ms`.
    pub unit: String,
    /// Free-form dispersion text for display (e.g. `stddev: 0.0043`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Free-form extra text for display (e.g. `mean: 1.07 sec\nrounds: 5`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Standard deviation (or similar) in the same unit as `value`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::wire::serialize_opt_number"
    )]
    pub dispersion: Option<f64>,
    /// Number of samples (rounds) behind `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<u64>,
}

impl Measurement {
    /// Create a measurement with no dispersion information.
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            range: None,
            extra: None,
            dispersion: None,
            samples: None,
        }
    }

    /// Attach a numeric dispersion.
    pub fn with_dispersion(mut self, dispersion: f64) -> Self {
        self.dispersion = Some(dispersion);
        self
    }

    /// Attach a sample count.
    pub fn with_samples(mut self, samples: u64) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Attach display strings.
    pub fn with_display(mut self, range: Option<String>, extra: Option<String>) -> Self {
        self.range = range;
        self.extra = extra;
        self
    }

    /// Check that this measurement can take part in a comparison.
    pub fn validate(&self) -> Result<()> {
        if self.unit.trim().is_empty() {
            return Err(ValidationError::MissingUnit {
                name: self.name.clone(),
            });
        }
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(ValidationError::InvalidValue {
                name: self.name.clone(),
                field: "value",
                value: self.value,
            });
        }
        if let Some(dispersion) = self.dispersion {
            if !dispersion.is_finite() || dispersion < 0.0 {
                return Err(ValidationError::InvalidValue {
                    name: self.name.clone(),
                    field: "dispersion",
                    value: dispersion,
                });
            }
        }
        Ok(())
    }
}

/// One ingestion event: every result a tool produced for one commit.
///
/// Serialises as one entry of the persisted history:
/// `{ commit, date, tool, benches }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSet {
    /// Commit the run was measured against.
    pub commit: CommitInfo,
    /// Wall-clock ingestion time, epoch milliseconds.
    pub date: i64,
    /// Producing tool identifier.
    pub tool: String,
    /// Results, in the order the tool reported them.
    #[serde(rename = "benches")]
    pub measurements: Vec<Measurement>,
}

impl MeasurementSet {
    /// Create a new builder.
    pub fn builder() -> MeasurementSetBuilder {
        MeasurementSetBuilder::default()
    }

    /// Look up a measurement by name.
    pub fn get(&self, name: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.name == name)
    }

    /// Structural validation of the whole set.
    ///
    /// Checks:
    /// - tool identifier and commit id are present
    /// - at least one measurement
    /// - measurement names are non-empty and unique
    /// - values are finite, since non-finite numbers cannot be persisted
    ///
    /// Unit problems are left to per-measurement evaluation.
    pub fn validate(&self) -> Result<()> {
        if self.tool.trim().is_empty() {
            return Err(ValidationError::EmptyTool);
        }
        if self.commit.id.trim().is_empty() {
            return Err(ValidationError::MissingCommitId);
        }
        if self.measurements.is_empty() {
            return Err(ValidationError::EmptyMeasurementSet {
                commit: self.commit.id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for (index, m) in self.measurements.iter().enumerate() {
            if m.name.trim().is_empty() {
                return Err(ValidationError::EmptyName { index });
            }
            if !seen.insert(m.name.as_str()) {
                return Err(ValidationError::DuplicateName {
                    name: m.name.clone(),
                });
            }
            if !m.value.is_finite() {
                return Err(ValidationError::InvalidValue {
                    name: m.name.clone(),
                    field: "value",
                    value: m.value,
                });
            }
            if let Some(d) = m.dispersion.filter(|d| !d.is_finite()) {
                return Err(ValidationError::InvalidValue {
                    name: m.name.clone(),
                    field: "dispersion",
                    value: d,
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`MeasurementSet`] instances.
#[derive(Default)]
pub struct MeasurementSetBuilder {
    tool: Option<String>,
    commit: Option<CommitInfo>,
    date: Option<i64>,
    measurements: Vec<Measurement>,
}

impl MeasurementSetBuilder {
    /// Set the producing tool (required).
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    /// Set the commit (required).
    pub fn commit(mut self, commit: CommitInfo) -> Self {
        self.commit = Some(commit);
        self
    }

    /// Set the ingestion time in epoch milliseconds. Defaults to now.
    pub fn date(mut self, millis: i64) -> Self {
        self.date = Some(millis);
        self
    }

    /// Add a measurement.
    pub fn measurement(mut self, measurement: Measurement) -> Self {
        self.measurements.push(measurement);
        self
    }

    /// Add several measurements.
    pub fn measurements(mut self, measurements: impl IntoIterator<Item = Measurement>) -> Self {
        self.measurements.extend(measurements);
        self
    }

    /// Build and validate the [`MeasurementSet`].
    pub fn build(self) -> Result<MeasurementSet> {
        let tool = self.tool.ok_or(ValidationError::EmptyTool)?;
        let commit = self.commit.ok_or(ValidationError::MissingCommitId)?;
        let set = MeasurementSet {
            commit,
            date: self.date.unwrap_or_else(|| Utc::now().timestamp_millis()),
            tool,
            measurements: self.measurements,
        };
        set.validate()?;
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit() -> CommitInfo {
        CommitInfo::new("abc123", "Speed up merge")
    }

    #[test]
    fn test_builder_requires_tool() {
        let result = MeasurementSet::builder()
            .commit(commit())
            .measurement(Measurement::new("merge", 10.0, "iter/sec"))
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::EmptyTool);
    }

    #[test]
    fn test_builder_requires_commit_id() {
        let result = MeasurementSet::builder()
            .tool("pytest")
            .commit(CommitInfo::new("  ", "m"))
            .measurement(Measurement::new("merge", 10.0, "iter/sec"))
            .build();
        assert_eq!(result.unwrap_err(), ValidationError::MissingCommitId);
    }

    #[test]
    fn test_builder_rejects_empty_set() {
        let result = MeasurementSet::builder()
            .tool("pytest")
            .commit(commit())
            .build();
        assert!(matches!(
            result,
            Err(ValidationError::EmptyMeasurementSet { .. })
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = MeasurementSet::builder()
            .tool("pytest")
            .commit(commit())
            .measurement(Measurement::new("merge", 10.0, "iter/sec"))
            .measurement(Measurement::new("merge", 11.0, "iter/sec"))
            .build();
        assert_eq!(
            result.unwrap_err(),
            ValidationError::DuplicateName {
                name: "merge".to_string()
            }
        );
    }

    #[test]
    fn test_non_finite_value_rejected_for_whole_set() {
        let result = MeasurementSet::builder()
            .tool("pytest")
            .commit(commit())
            .measurement(Measurement::new("merge", f64::NAN, "iter/sec"))
            .build();
        assert!(matches!(
            result,
            Err(ValidationError::InvalidValue { field: "value", .. })
        ));
    }

    #[test]
    fn test_missing_unit_is_measurement_level() {
        let set = MeasurementSet::builder()
            .tool("pytest")
            .commit(commit())
            .measurement(Measurement::new("merge", 10.0, ""))
            .build()
            .unwrap();
        assert!(matches!(
            set.measurements[0].validate(),
            Err(ValidationError::MissingUnit { .. })
        ));
    }

    #[test]
    fn test_negative_dispersion_rejected() {
        let m = Measurement::new("merge", 10.0, "ms").with_dispersion(-1.0);
        assert!(matches!(
            m.validate(),
            Err(ValidationError::InvalidValue {
                field: "dispersion",
                ..
            })
        ));
    }

    #[test]
    fn test_wire_field_names() {
        let set = MeasurementSet::builder()
            .tool("pytest")
            .commit(commit())
            .date(1_700_000_000_000)
            .measurement(
                Measurement::new("merge", 10.0, "iter/sec")
                    .with_display(Some("stddev: 0.1".to_string()), None),
            )
            .build()
            .unwrap();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["date"], 1_700_000_000_000i64);
        assert_eq!(json["benches"][0]["range"], "stddev: 0.1");
        assert!(json["benches"][0].get("extra").is_none());
        assert!(json["benches"][0].get("dispersion").is_none());
    }
}
