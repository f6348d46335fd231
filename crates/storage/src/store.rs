// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The [`HistoryStore`] trait and its snapshot/version types.
//!
//! Stores do not offer transactions. Writers follow a
//! read → recompute → conditional write → retry-on-conflict discipline:
//! [`HistoryStore::load`] returns the history together with a [`Version`]
//! token, and [`HistoryStore::persist`] only replaces the stored state if
//! it still carries that token.

use crate::error::Result;
use bench_history_core::{History, MeasurementSet};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identity of one persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// Nothing has been persisted yet.
    Missing,
    /// Opaque token (content hash or counter) of the stored state.
    Token(String),
}

impl Version {
    /// Version token for a byte representation (SHA-256, hex encoded).
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::Token(hex::encode(Sha256::digest(bytes)))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("<none>"),
            Self::Token(token) => {
                let short = token.get(..12).unwrap_or(token);
                f.write_str(short)
            }
        }
    }
}

/// A loaded history and the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The history value.
    pub history: History,
    /// Version to pass back to [`HistoryStore::persist`].
    pub version: Version,
}

/// Durable, append-only storage for a [`History`].
pub trait HistoryStore: Send + Sync {
    /// Read the current history.
    ///
    /// Returns an empty history with [`Version::Missing`] when nothing has
    /// been persisted yet; fails with a corrupt-history error if the stored
    /// shape does not match the schema.
    fn load(&self) -> Result<Snapshot>;

    /// Atomically replace the stored history, provided it is still at
    /// `expected`. Returns the new version.
    ///
    /// Fails with [`crate::StoreError::Conflict`] if another writer got
    /// there first; the caller should reload and re-apply its append.
    fn persist(&self, history: &History, expected: &Version) -> Result<Version>;

    /// Return a new history with `entry` appended to `tool`'s list.
    ///
    /// The input is never mutated, so the same entry can be re-applied to a
    /// reloaded history after a conflict.
    fn append(&self, history: &History, tool: &str, entry: MeasurementSet) -> History {
        history.appended(tool, entry)
    }

    /// Human-readable location, for logs and error reports.
    fn describe(&self) -> String;
}

impl<S: HistoryStore + ?Sized> HistoryStore for Box<S> {
    fn load(&self) -> Result<Snapshot> {
        (**self).load()
    }

    fn persist(&self, history: &History, expected: &Version) -> Result<Version> {
        (**self).persist(history, expected)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: HistoryStore + ?Sized> HistoryStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Snapshot> {
        (**self).load()
    }

    fn persist(&self, history: &History, expected: &Version) -> Result<Version> {
        (**self).persist(history, expected)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
