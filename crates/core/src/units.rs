// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Unit directionality.
//!
//! Whether a bigger number is good or bad depends entirely on the unit.
//! Throughput-like units (`iter/sec`, `ops/sec`) regress when they drop;
//! duration-like units (`ms`, `ns/iter`) regress when they grow. Getting
//! this table backwards inverts every alert, so it is explicit and can be
//! extended through configuration rather than inferred from unit text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which way is "better" for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Throughput-like: larger values are better.
    HigherIsBetter,
    /// Latency/duration/size-like: smaller values are better.
    LowerIsBetter,
}

impl Direction {
    /// Normalised ratio of `observed` against `baseline`.
    ///
    /// The result is below 1 when the observed value is worse than the
    /// baseline, regardless of direction.
    pub fn ratio(self, observed: f64, baseline: f64) -> f64 {
        match self {
            Self::HigherIsBetter => observed / baseline,
            Self::LowerIsBetter => baseline / observed,
        }
    }
}

const HIGHER_IS_BETTER: &[&str] = &[
    "iter/sec",
    "iter/s",
    "ops/sec",
    "ops/s",
    "op/s",
    "req/s",
    "requests/sec",
    "B/s",
    "KB/s",
    "MB/s",
    "GB/s",
    "bytes/sec",
    "elements/s",
    "items/s",
];

const LOWER_IS_BETTER: &[&str] = &[
    "ns",
    "us",
    "µs",
    "ms",
    "s",
    "sec",
    "secs",
    "seconds",
    "ns/iter",
    "ns/op",
    "us/op",
    "ms/op",
    "B/op",
    "allocs/op",
    "B",
    "KB",
    "MB",
    "bytes",
];

/// Lookup table from unit string to [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTable {
    entries: HashMap<String, Direction>,
}

impl Default for UnitTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        for unit in HIGHER_IS_BETTER {
            entries.insert((*unit).to_string(), Direction::HigherIsBetter);
        }
        for unit in LOWER_IS_BETTER {
            entries.insert((*unit).to_string(), Direction::LowerIsBetter);
        }
        Self { entries }
    }
}

impl UnitTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register or override a unit.
    pub fn insert(&mut self, unit: impl Into<String>, direction: Direction) {
        self.entries.insert(unit.into(), direction);
    }

    /// Built-in table extended with `overrides`.
    pub fn with_overrides(overrides: &HashMap<String, Direction>) -> Self {
        let mut table = Self::default();
        for (unit, direction) in overrides {
            table.insert(unit.clone(), *direction);
        }
        table
    }

    /// Direction for `unit`. Lookup is exact first, then whitespace-trimmed.
    pub fn direction(&self, unit: &str) -> Option<Direction> {
        self.entries
            .get(unit)
            .or_else(|| self.entries.get(unit.trim()))
            .copied()
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_directions() {
        let table = UnitTable::default();
        assert_eq!(table.direction("iter/sec"), Some(Direction::HigherIsBetter));
        assert_eq!(table.direction("ops/sec"), Some(Direction::HigherIsBetter));
        assert_eq!(table.direction("ms"), Some(Direction::LowerIsBetter));
        assert_eq!(table.direction("ns/iter"), Some(Direction::LowerIsBetter));
        assert_eq!(table.direction("sec"), Some(Direction::LowerIsBetter));
        assert_eq!(table.direction("furlongs"), None);
    }

    #[test]
    fn test_ratio_below_one_means_worse() {
        assert_eq!(Direction::HigherIsBetter.ratio(4.0, 10.0), 0.4);
        assert_eq!(Direction::LowerIsBetter.ratio(250.0, 100.0), 0.4);
        assert!(Direction::HigherIsBetter.ratio(12.0, 10.0) > 1.0);
        assert!(Direction::LowerIsBetter.ratio(80.0, 100.0) > 1.0);
    }

    #[test]
    fn test_overrides_extend_and_replace() {
        let mut overrides = HashMap::new();
        overrides.insert("frames".to_string(), Direction::HigherIsBetter);
        overrides.insert("B".to_string(), Direction::HigherIsBetter);

        let table = UnitTable::with_overrides(&overrides);
        assert_eq!(table.direction("frames"), Some(Direction::HigherIsBetter));
        assert_eq!(table.direction("B"), Some(Direction::HigherIsBetter));
        assert_eq!(table.direction("ms"), Some(Direction::LowerIsBetter));
    }

    #[test]
    fn test_trimmed_lookup() {
        let table = UnitTable::default();
        assert_eq!(table.direction(" ms "), Some(Direction::LowerIsBetter));
        assert!(UnitTable::empty().is_empty());
    }
}
