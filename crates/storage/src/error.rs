// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Storage errors.

use crate::store::Version;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The persisted history exists but does not match the expected schema.
///
/// This is never repaired automatically: discarding unreadable history
/// would silently lose every earlier run.
#[derive(Debug, Error)]
#[error("Corrupt history in {location}: {message}")]
pub struct CorruptHistoryError {
    /// Where the history was read from.
    pub location: String,
    /// Parser diagnostic.
    pub message: String,
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Persisted state could not be parsed.
    #[error(transparent)]
    Corrupt(#[from] CorruptHistoryError),

    /// The persisted state changed since it was loaded.
    #[error("History was modified concurrently (expected {expected}, found {found})")]
    Conflict {
        /// Version the caller loaded.
        expected: Version,
        /// Version currently stored.
        found: Version,
    },

    /// The write lock could not be taken in time.
    #[error("Failed to acquire lock {path} after {timeout_ms}ms")]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// How long we waited.
        timeout_ms: u64,
    },

    /// Filesystem error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The history could not be encoded.
    #[error("Failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a version conflict that a reload-and-retry can fix.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
