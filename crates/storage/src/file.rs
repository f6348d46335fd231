// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! File-backed history store.
//!
//! The history lives in a single file (`data.js` or a `.json` file) that
//! dashboards read directly. Writes go to a temporary file in the same
//! directory which is then renamed over the target, so readers only ever
//! see a complete old or a complete new history. The SHA-256 of the file
//! content is the version token.

use crate::error::{CorruptHistoryError, Result, StoreError};
use crate::lock::{LockConfig, LockGuard};
use crate::store::{HistoryStore, Snapshot, Version};
use bench_history_core::wire::{self, WireForm};
use bench_history_core::History;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// History store backed by one file on disk.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
    form: WireForm,
    repo_url: String,
    lock: LockConfig,
}

impl FileHistoryStore {
    /// Store at `path`; the wire form follows the file extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            form: WireForm::for_path(&path),
            path,
            repo_url: String::new(),
            lock: LockConfig::default(),
        }
    }

    /// Override the wire form.
    pub fn with_form(mut self, form: WireForm) -> Self {
        self.form = form;
        self
    }

    /// Repository URL recorded when the history is created.
    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = repo_url.into();
        self
    }

    /// Override lock settings.
    pub fn with_lock_config(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    /// Path of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read raw bytes, `None` if the file does not exist yet.
    fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    fn current_version(&self) -> Result<Version> {
        Ok(self
            .read_bytes()?
            .map(|bytes| Version::of_bytes(&bytes))
            .unwrap_or(Version::Missing))
    }

    fn corrupt(&self, message: impl Into<String>) -> StoreError {
        CorruptHistoryError {
            location: self.path.display().to_string(),
            message: message.into(),
        }
        .into()
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn write_atomic(&self, contents: &[u8]) -> Result<()> {
        let dir = self.dir();
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        tmp.write_all(contents)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Result<Snapshot> {
        let Some(bytes) = self.read_bytes()? else {
            debug!(path = %self.path.display(), "no history yet, starting empty");
            return Ok(Snapshot {
                history: History::new(self.repo_url.clone()),
                version: Version::Missing,
            });
        };

        let version = Version::of_bytes(&bytes);
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| self.corrupt(format!("not valid UTF-8: {e}")))?;
        let (history, form) = wire::decode(text).map_err(|e| self.corrupt(e.to_string()))?;

        debug!(
            path = %self.path.display(),
            version = %version,
            ?form,
            entries = history.total_entries(),
            "loaded history"
        );
        Ok(Snapshot { history, version })
    }

    fn persist(&self, history: &History, expected: &Version) -> Result<Version> {
        let contents = wire::encode(history, self.form)?;
        let dir = self.dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let _guard = LockGuard::acquire(&self.path, &self.lock)?;
        let found = self.current_version()?;
        if found != *expected {
            return Err(StoreError::Conflict {
                expected: expected.clone(),
                found,
            });
        }

        self.write_atomic(contents.as_bytes())?;
        let version = Version::of_bytes(contents.as_bytes());
        info!(
            path = %self.path.display(),
            version = %version,
            entries = history.total_entries(),
            "persisted history"
        );
        Ok(version)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_history_core::{CommitInfo, Measurement, MeasurementSet};

    fn entry(commit: &str, value: f64) -> MeasurementSet {
        MeasurementSet::builder()
            .tool("pytest")
            .commit(CommitInfo::new(commit, "msg"))
            .date(1_700_000_000_000)
            .measurement(Measurement::new("merge", value, "iter/sec"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("data.js")).with_repo_url("https://r");
        let snapshot = store.load().unwrap();
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.history.repo_url, "https://r");
        assert_eq!(snapshot.version, Version::Missing);
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("bench").join("data.js"));

        let snapshot = store.load().unwrap();
        let next = store.append(&snapshot.history, "pytest", entry("a", 10.0));
        let version = store.persist(&next, &snapshot.version).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.history, next);
        assert_eq!(reloaded.version, version);

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with(wire::SCRIPT_PREFIX));
        assert!(!LockGuard::lock_path(store.path()).exists());
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("history.json"));
        let snapshot = store.load().unwrap();
        let next = store.append(&snapshot.history, "pytest", entry("a", 10.0));
        store.persist(&next, &snapshot.version).unwrap();

        assert_eq!(store.load().unwrap(), store.load().unwrap());
    }

    #[test]
    fn test_stale_version_conflicts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistoryStore::new(dir.path().join("history.json"));

        let base = store.load().unwrap();
        let first = store.append(&base.history, "pytest", entry("a", 10.0));
        store.persist(&first, &base.version).unwrap();
        let on_disk = fs::read(store.path()).unwrap();

        let second = store.append(&base.history, "pytest", entry("b", 11.0));
        let err = store.persist(&second, &base.version).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(fs::read(store.path()).unwrap(), on_disk);
    }

    #[test]
    fn test_corrupt_file_is_reported_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"lastUpdate": 1, "entries": {"t": [{"tool": 3}]}}"#).unwrap();

        let store = FileHistoryStore::new(&path);
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(err.to_string().contains("history.json"));
        assert!(fs::read_to_string(&path).unwrap().contains("\"tool\": 3"));
    }

    #[test]
    fn test_truncated_history_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"lastUpdate": 1700000000000}"#).unwrap();

        let err = FileHistoryStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"lastUpdate": 1700000000000}"#);
    }

    #[test]
    fn test_existing_dashboard_file_keeps_its_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.js");
        let original = concat!(
            "window.BENCHMARK_DATA = {\n",
            "  \"lastUpdate\": 5,\n",
            "  \"repoUrl\": \"https://r\",\n",
            "  \"entries\": {}\n",
            "}"
        );
        fs::write(&path, original).unwrap();

        let store = FileHistoryStore::new(&path);
        let snapshot = store.load().unwrap();
        store.persist(&snapshot.history, &snapshot.version).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }
}
