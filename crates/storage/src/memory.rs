// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory history store with the same compare-and-swap semantics as the
//! file store. Used by embedders that keep the history elsewhere and by
//! tests.

use crate::error::{Result, StoreError};
use crate::store::{HistoryStore, Snapshot, Version};
use bench_history_core::History;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    history: Option<History>,
    generation: u64,
}

/// History kept behind a mutex; the version token is a write counter.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    state: Mutex<State>,
}

impl MemoryHistoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `history`.
    pub fn with_history(history: History) -> Self {
        Self {
            state: Mutex::new(State {
                history: Some(history),
                generation: 1,
            }),
        }
    }

    /// Number of successful persists, including the initial history.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a panic elsewhere; the state is still a
        // complete history value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn version_of(state: &State) -> Version {
        match state.history {
            Some(_) => Version::Token(state.generation.to_string()),
            None => Version::Missing,
        }
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Snapshot> {
        let state = self.lock();
        Ok(Snapshot {
            history: state.history.clone().unwrap_or_default(),
            version: Self::version_of(&state),
        })
    }

    fn persist(&self, history: &History, expected: &Version) -> Result<Version> {
        let mut state = self.lock();
        let found = Self::version_of(&state);
        if found != *expected {
            return Err(StoreError::Conflict {
                expected: expected.clone(),
                found,
            });
        }
        state.history = Some(history.clone());
        state.generation += 1;
        Ok(Self::version_of(&state))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_history_core::{CommitInfo, Measurement, MeasurementSet};

    fn entry(commit: &str) -> MeasurementSet {
        MeasurementSet::builder()
            .tool("pytest")
            .commit(CommitInfo::new(commit, "msg"))
            .date(1)
            .measurement(Measurement::new("merge", 10.0, "iter/sec"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_store_is_missing() {
        let store = MemoryHistoryStore::new();
        let snapshot = store.load().unwrap();
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.version, Version::Missing);
    }

    #[test]
    fn test_compare_and_swap() {
        let store = MemoryHistoryStore::new();
        let base = store.load().unwrap();

        let first = store.append(&base.history, "pytest", entry("a"));
        let v1 = store.persist(&first, &base.version).unwrap();
        assert_eq!(v1, Version::Token("1".to_string()));

        let second = store.append(&base.history, "pytest", entry("b"));
        assert!(store.persist(&second, &base.version).unwrap_err().is_conflict());
        assert_eq!(store.load().unwrap().history, first);
    }

    #[test]
    fn test_with_history_starts_at_generation_one() {
        let store = MemoryHistoryStore::with_history(History::new("https://r"));
        assert_eq!(store.generation(), 1);
        assert_eq!(store.load().unwrap().history.repo_url, "https://r");
    }
}
