// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Short-lived lock file guarding the verify-and-rename window of a
//! file-backed persist.
//!
//! The lock is only held between re-reading the stored version and
//! renaming the new file into place, never across a whole ingestion.
//! Lock files older than the stale limit (a crashed writer) are moved
//! aside under a unique name before removal, so two writers reclaiming the
//! same abandoned lock cannot delete each other's fresh one.

use crate::error::{Result, StoreError};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Lock acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Maximum time to wait for the lock.
    pub timeout: Duration,
    /// How often to re-check an occupied lock.
    pub poll_interval: Duration,
    /// Age after which an existing lock is considered abandoned.
    pub stale_after: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
            stale_after: Duration::from_secs(60),
        }
    }
}

/// Held lock; the lock file is removed on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Lock file path used for `target`.
    pub fn lock_path(target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!("{name}.lock"))
    }

    /// Block until the lock for `target` is acquired or `config.timeout`
    /// elapses.
    pub fn acquire(target: &Path, config: &LockConfig) -> Result<Self> {
        let path = Self::lock_path(target);
        let start = Instant::now();

        loop {
            match Self::try_create(&path) {
                Ok(()) => {
                    debug!(lock = %path.display(), "acquired history lock");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if Self::is_stale(&path, config.stale_after) {
                        match Self::reclaim_stale(&path, config.stale_after) {
                            Ok(true) => {
                                warn!(lock = %path.display(), "removed stale history lock");
                                continue;
                            }
                            Ok(false) => {}
                            Err(e) => return Err(StoreError::io(&path, e)),
                        }
                    }
                    if start.elapsed() >= config.timeout {
                        return Err(StoreError::LockTimeout {
                            path,
                            timeout_ms: config.timeout.as_millis() as u64,
                        });
                    }
                    thread::sleep(config.poll_interval);
                }
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }
    }

    fn try_create(path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        write!(file, "pid:{}\ntimestamp:{}\n", std::process::id(), timestamp)?;
        Ok(())
    }

    /// Move the lock at `path` aside and delete it if it is still stale.
    ///
    /// Another writer may have replaced the stale lock with its own between
    /// the staleness check and this call. The rename claims whichever file
    /// is there; a fresh one is linked back into place untouched. Returns
    /// whether a stale lock was removed.
    fn reclaim_stale(path: &Path, stale_after: Duration) -> io::Result<bool> {
        let claimed = Self::claim_path(path);
        match fs::rename(path, &claimed) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        }

        if Self::is_stale(&claimed, stale_after) {
            fs::remove_file(&claimed)?;
            return Ok(true);
        }

        let restored = fs::hard_link(&claimed, path);
        fs::remove_file(&claimed)?;
        match restored {
            Ok(()) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(lock = %path.display(), "history lock replaced while being restored");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Unique sibling name used while reclaiming a lock.
    fn claim_path(path: &Path) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(
            "{name}.reclaim-{}-{nanos}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ))
    }

    fn is_stale(path: &Path, stale_after: Duration) -> bool {
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|age| age > stale_after)
            .unwrap_or(false)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release history lock");
        }
    }
}
