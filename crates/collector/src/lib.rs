// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ingestion of benchmark runs into a persisted history.
//!
//! [`IngestionPipeline`] ties the pieces together: it validates a
//! [`MeasurementSet`](bench_history_core::MeasurementSet), evaluates it
//! against the current history, appends it and persists the result under
//! optimistic concurrency, retrying on conflict within a
//! [`RetryPolicy`](bench_history_core::RetryPolicy).
//!
//! ```no_run
//! use bench_history_collector::{IngestOptions, IngestionPipeline};
//! use bench_history_storage::FileHistoryStore;
//!
//! # fn demo(set: bench_history_core::MeasurementSet) -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileHistoryStore::new("data.js");
//! let pipeline = IngestionPipeline::new(store, IngestOptions::default())?;
//! let summary = pipeline.ingest(set)?;
//! if summary.has_alerts() {
//!     println!("{}", summary.alerts.render_markdown());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod pipeline;

pub use error::{IngestError, IngestStep, Result};
pub use pipeline::{IngestOptions, IngestSummary, IngestionPipeline};
