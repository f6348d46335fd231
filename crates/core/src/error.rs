// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Validation errors shared by every stage of the ingestion flow.

use thiserror::Error;

/// Errors raised when an incoming measurement, measurement set or
/// threshold configuration is malformed.
///
/// Validation is local and recoverable: at measurement granularity the
/// detector records the error and moves on to the next sibling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The producing tool identifier is empty.
    #[error("Tool identifier must not be empty")]
    EmptyTool,

    /// The commit identifier is empty.
    #[error("Commit identifier must not be empty")]
    MissingCommitId,

    /// The measurement set carries no measurements.
    #[error("Measurement set for commit {commit} contains no measurements")]
    EmptyMeasurementSet {
        /// Commit the empty set was recorded against.
        commit: String,
    },

    /// A measurement has an empty name.
    #[error("Measurement at position {index} has an empty name")]
    EmptyName {
        /// Position of the measurement inside its set.
        index: usize,
    },

    /// Two measurements in one set share a name.
    #[error("Duplicate measurement name: {name}")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A measurement has an empty unit.
    #[error("Measurement {name} has no unit")]
    MissingUnit {
        /// Measurement name.
        name: String,
    },

    /// The unit has no registered directionality.
    #[error("Measurement {name} uses unit {unit:?} with unknown directionality")]
    UnknownUnit {
        /// Measurement name.
        name: String,
        /// The unrecognised unit.
        unit: String,
    },

    /// A numeric field is NaN, infinite or negative.
    #[error("Measurement {name} has invalid {field}: {value}")]
    InvalidValue {
        /// Measurement name.
        name: String,
        /// Which field was rejected (`value` or `dispersion`).
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A threshold configuration value is out of range.
    #[error("Invalid configuration {field}: {reason}")]
    InvalidConfig {
        /// Configuration field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Create a config error.
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the measurement this error concerns, if any.
    pub fn measurement_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateName { name }
            | Self::MissingUnit { name }
            | Self::UnknownUnit { name, .. }
            | Self::InvalidValue { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Result type for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;
