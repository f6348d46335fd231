// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ingestion errors.
//!
//! Every variant names the step that failed. None of them leave the
//! persisted history modified: either the write happened completely or
//! not at all.

use bench_history_core::ValidationError;
use bench_history_storage::StoreError;
use std::fmt;
use thiserror::Error;

/// Step of the ingestion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    /// Input validation.
    Validate,
    /// Reading the current history.
    Load,
    /// Writing the new history.
    Persist,
}

impl fmt::Display for IngestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate",
            Self::Load => "load",
            Self::Persist => "persist",
        })
    }
}

/// Errors that abort an ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The measurement set was rejected; nothing was persisted.
    #[error("Invalid measurement set: {0}")]
    Validation(#[from] ValidationError),

    /// The history could not be read.
    #[error("Failed to load history from {location}: {source}")]
    Load {
        /// Store location.
        location: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The history could not be written.
    #[error("Failed to persist history to {location}: {source}")]
    Persist {
        /// Store location.
        location: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// Every attempt lost the race to another writer.
    #[error("History at {location} was modified concurrently; gave up after {attempts} attempts")]
    ConcurrentModification {
        /// Store location.
        location: String,
        /// Attempts made.
        attempts: u32,
    },

    /// The retry loop ran out of time.
    #[error("Persisting to {location} did not succeed within {timeout_ms}ms ({attempts} attempts)")]
    RetryTimeout {
        /// Store location.
        location: String,
        /// Attempts made.
        attempts: u32,
        /// Configured bound.
        timeout_ms: u64,
    },
}

impl IngestError {
    /// The step that failed.
    pub fn step(&self) -> IngestStep {
        match self {
            Self::Validation(_) => IngestStep::Validate,
            Self::Load { .. } => IngestStep::Load,
            Self::Persist { .. }
            | Self::ConcurrentModification { .. }
            | Self::RetryTimeout { .. } => IngestStep::Persist,
        }
    }
}

/// Result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;
