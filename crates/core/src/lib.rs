// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for benchmark history tracking.
//!
//! This crate holds the data model shared by the store, the regression
//! detector and the ingestion pipeline:
//!
//! - [`commit`] - Commit identification ([`CommitInfo`])
//! - [`measurement`] - Normalised tool output ([`Measurement`], [`MeasurementSet`])
//! - [`history`] - The persisted state ([`History`]) and [`BenchmarkSeries`] views
//! - [`wire`] - JSON / `window.BENCHMARK_DATA` encoding
//! - [`units`] - Unit directionality
//! - [`config`] - Detector thresholds and retry policy
//! - [`error`] - [`ValidationError`]

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commit;
pub mod config;
pub mod error;
pub mod history;
pub mod measurement;
pub mod units;
pub mod wire;

pub use commit::{CommitInfo, CommitTimestamp, Person};
pub use config::{RetryPolicy, ThresholdConfig};
pub use error::ValidationError;
pub use history::{BenchmarkSeries, History, SeriesPoint};
pub use measurement::{Measurement, MeasurementSet, MeasurementSetBuilder};
pub use units::{Direction, UnitTable};
pub use wire::WireForm;
