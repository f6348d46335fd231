// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Commit identification for recorded benchmark runs.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Author or committer of a commit.
///
/// Git hosting payloads are inconsistent about which of these fields are
/// present (pull request heads only carry `username`), so all are optional
/// and absent fields are not written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// E-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hosting account name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Person {
    /// Create a person with a display name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Best available human-readable label.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("unknown")
    }
}

/// Commit timestamp in whichever form it was recorded.
///
/// Hosting APIs emit RFC 3339 strings while hand-built inputs tend to use
/// epoch seconds; the value is written back in its original form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommitTimestamp {
    /// Seconds since the Unix epoch.
    Epoch(i64),
    /// RFC 3339 date-time string.
    Rfc3339(String),
}

impl CommitTimestamp {
    /// Seconds since the Unix epoch, if the stored value is parseable.
    pub fn epoch_seconds(&self) -> Option<i64> {
        match self {
            Self::Epoch(secs) => Some(*secs),
            Self::Rfc3339(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.timestamp()),
        }
    }
}

/// The code state a run was measured against. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Commit author.
    #[serde(default)]
    pub author: Person,
    /// Commit committer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<Person>,
    /// Whether the commit is distinct from earlier pushes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    /// Content hash identifying the commit.
    pub id: String,
    /// Commit message (or pull request title).
    #[serde(default)]
    pub message: String,
    /// Commit timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<CommitTimestamp>,
    /// Tree hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    /// Link back to the commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Any further keys present in the stored payload.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl CommitInfo {
    /// Create a commit record with the given id and message.
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            author: Person::default(),
            committer: None,
            distinct: None,
            id: id.into(),
            message: message.into(),
            timestamp: None,
            tree_id: None,
            url: None,
            other: serde_json::Map::new(),
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: Person) -> Self {
        self.author = author;
        self
    }

    /// Set the committer.
    pub fn with_committer(mut self, committer: Person) -> Self {
        self.committer = Some(committer);
        self
    }

    /// Set the timestamp as epoch seconds.
    pub fn with_epoch_timestamp(mut self, secs: i64) -> Self {
        self.timestamp = Some(CommitTimestamp::Epoch(secs));
        self
    }

    /// Set the commit URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Abbreviated commit id for display.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(7) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// All traceability links recorded for this commit.
    pub fn urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.url.as_deref().into_iter().collect();
        if let Some(serde_json::Value::Array(extra)) = self.other.get("urls") {
            urls.extend(extra.iter().filter_map(|v| v.as_str()));
        }
        urls
    }
}
