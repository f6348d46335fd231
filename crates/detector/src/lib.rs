// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Regression detection for benchmark history.
//!
//! # Quick Start
//!
//! ```no_run
//! use bench_history_core::{History, MeasurementSet, ThresholdConfig};
//! use bench_history_detector::{AlertFormatter, RegressionDetector};
//!
//! # fn demo(set: MeasurementSet, history: History) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ThresholdConfig::default();
//! let detector = RegressionDetector::new(config.clone())?;
//! let report = detector.evaluate(&set, &history);
//! let formatter = AlertFormatter::new(config.alert_threshold);
//! let alert = formatter.format(&set.tool, &set.commit, &report.verdicts);
//! if !alert.is_empty() {
//!     println!("{}", alert.render_markdown());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`detector`] - [`RegressionDetector`]
//! - [`verdict`] - [`Verdict`], [`VerdictKind`], [`EvaluationReport`]
//! - [`alert`] - [`AlertFormatter`] and [`AlertPayload`]
//! - [`markdown`] - Markdown rendering

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod alert;
pub mod detector;
pub mod markdown;
pub mod verdict;

pub use alert::{AlertCommit, AlertFormatter, AlertItem, AlertPayload};
pub use detector::RegressionDetector;
pub use verdict::{EvaluationReport, Verdict, VerdictKind};
