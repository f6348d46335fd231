// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Durable, append-only storage for benchmark history.
//!
//! # Modules
//!
//! - [`store`] - The [`HistoryStore`] trait, [`Snapshot`] and [`Version`]
//! - [`file`] - [`FileHistoryStore`], the dashboard-compatible file store
//! - [`memory`] - [`MemoryHistoryStore`]
//! - [`lock`] - Lock file guarding the file store's verify-and-rename step
//! - [`error`] - [`StoreError`] and [`CorruptHistoryError`]

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod file;
pub mod lock;
pub mod memory;
pub mod store;

pub use error::{CorruptHistoryError, Result, StoreError};
pub use file::FileHistoryStore;
pub use lock::LockConfig;
pub use memory::MemoryHistoryStore;
pub use store::{HistoryStore, Snapshot, Version};
