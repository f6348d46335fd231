// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! The persisted benchmark history and per-benchmark series views.
//!
//! # Invariants
//!
//! - Each tool's entry list is append-only: [`History::appended`] returns a
//!   new value whose list has the old list as a prefix.
//! - Tool order and entry order are preserved exactly across
//!   (de)serialisation.

use crate::commit::CommitInfo;
use crate::measurement::{Measurement, MeasurementSet};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Full persisted state: every measurement set ever recorded, per tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Epoch milliseconds of the last append.
    pub last_update: i64,
    /// Repository the history belongs to.
    pub repo_url: String,
    /// Tool identifier to ordered entries.
    entries: ToolEntries,
}

impl History {
    /// Empty history for a repository (first run).
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            last_update: 0,
            repo_url: repo_url.into(),
            entries: ToolEntries::default(),
        }
    }

    /// Tool identifiers in first-seen order.
    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.entries.0.iter().map(|(tool, _)| tool.as_str())
    }

    /// Entries recorded for `tool`, oldest first. Empty if unknown.
    pub fn entries(&self, tool: &str) -> &[MeasurementSet] {
        self.entries
            .0
            .iter()
            .find(|(t, _)| t == tool)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of entries across all tools.
    pub fn total_entries(&self) -> usize {
        self.entries.0.iter().map(|(_, list)| list.len()).sum()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.total_entries() == 0
    }

    /// Return a new history with `entry` appended to `tool`'s list.
    ///
    /// `self` is left untouched so a caller can re-apply the same append to
    /// a freshly reloaded history after a write conflict.
    pub fn appended(&self, tool: &str, entry: MeasurementSet) -> History {
        let mut next = self.clone();
        next.last_update = next.last_update.max(entry.date);
        match next.entries.0.iter_mut().find(|(t, _)| t == tool) {
            Some((_, list)) => list.push(entry),
            None => next.entries.0.push((tool.to_string(), vec![entry])),
        }
        next
    }

    /// Time series of one benchmark, matched on tool, name and unit.
    pub fn series<'a>(&'a self, tool: &str, name: &str, unit: &str) -> BenchmarkSeries<'a> {
        let points = self
            .entries(tool)
            .iter()
            .filter_map(|set| {
                set.measurements
                    .iter()
                    .find(|m| m.name == name && m.unit == unit)
                    .map(|measurement| SeriesPoint {
                        commit: &set.commit,
                        date: set.date,
                        measurement,
                    })
            })
            .collect();

        BenchmarkSeries {
            tool: tool.to_string(),
            name: name.to_string(),
            unit: unit.to_string(),
            points,
        }
    }
}

/// One point of a [`BenchmarkSeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint<'a> {
    /// Commit the point was measured at.
    pub commit: &'a CommitInfo,
    /// Ingestion time of the owning set, epoch milliseconds.
    pub date: i64,
    /// The measurement.
    pub measurement: &'a Measurement,
}

/// Ordered history of one (tool, name, unit) benchmark, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkSeries<'a> {
    /// Tool identifier.
    pub tool: String,
    /// Benchmark name.
    pub name: String,
    /// Benchmark unit.
    pub unit: String,
    points: Vec<SeriesPoint<'a>>,
}

impl<'a> BenchmarkSeries<'a> {
    /// All points, oldest first.
    pub fn points(&self) -> &[SeriesPoint<'a>] {
        &self.points
    }

    /// The last `n` points (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[SeriesPoint<'a>] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }

    /// Most recent point.
    pub fn latest(&self) -> Option<&SeriesPoint<'a>> {
        self.points.last()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the benchmark has never been recorded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Insertion-ordered tool map. Serialises as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
struct ToolEntries(Vec<(String, Vec<MeasurementSet>)>);

impl Serialize for ToolEntries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (tool, list) in &self.0 {
            map.serialize_entry(tool, list)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ToolEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ToolEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from tool name to a list of entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, Vec<MeasurementSet>)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((tool, list)) = access.next_entry::<String, Vec<MeasurementSet>>()? {
                    if entries.iter().any(|(t, _)| *t == tool) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate tool key: {tool}"
                        )));
                    }
                    entries.push((tool, list));
                }
                Ok(ToolEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(commit: &str, date: i64, measurements: Vec<Measurement>) -> MeasurementSet {
        MeasurementSet::builder()
            .tool("pytest")
            .commit(CommitInfo::new(commit, "msg"))
            .date(date)
            .measurements(measurements)
            .build()
            .unwrap()
    }

    #[test]
    fn test_appended_keeps_prefix_and_input() {
        let history = History::new("https://github.com/o/r")
            .appended("pytest", set("a", 1, vec![Measurement::new("merge", 10.0, "iter/sec")]));
        let next = history.appended(
            "pytest",
            set("b", 2, vec![Measurement::new("merge", 9.0, "iter/sec")]),
        );

        assert_eq!(history.entries("pytest").len(), 1);
        assert_eq!(next.entries("pytest").len(), 2);
        assert_eq!(&next.entries("pytest")[..1], history.entries("pytest"));
        assert_eq!(next.last_update, 2);
    }

    #[test]
    fn test_last_update_never_moves_backwards() {
        let history = History::default()
            .appended("pytest", set("a", 50, vec![Measurement::new("m", 1.0, "ms")]))
            .appended("pytest", set("b", 40, vec![Measurement::new("m", 1.0, "ms")]));
        assert_eq!(history.last_update, 50);
    }

    #[test]
    fn test_tools_keep_first_seen_order() {
        let history = History::default()
            .appended("zeta", set("a", 1, vec![Measurement::new("m", 1.0, "ms")]))
            .appended("alpha", set("b", 2, vec![Measurement::new("m", 1.0, "ms")]));
        assert_eq!(history.tools().collect::<Vec<_>>(), vec!["zeta", "alpha"]);

        let json = serde_json::to_string(&history).unwrap();
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tools().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_series_matches_name_and_unit() {
        let history = History::default()
            .appended("pytest", set("a", 1, vec![Measurement::new("parse", 100.0, "ms")]))
            .appended("pytest", set("b", 2, vec![Measurement::new("parse", 0.1, "sec")]))
            .appended("pytest", set("c", 3, vec![Measurement::new("parse", 110.0, "ms")]));

        let series = history.series("pytest", "parse", "ms");
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().unwrap().commit.id, "c");
        assert_eq!(series.tail(1)[0].measurement.value, 110.0);
        assert_eq!(series.tail(10).len(), 2);
        assert!(history.series("other", "parse", "ms").is_empty());
    }

    #[test]
    fn test_duplicate_tool_key_rejected() {
        let json = r#"{"lastUpdate":1,"repoUrl":"","entries":{"a":[],"a":[]}}"#;
        assert!(serde_json::from_str::<History>(json).is_err());
    }
}
