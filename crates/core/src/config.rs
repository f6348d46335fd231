// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Detector thresholds and persistence retry policy.
//!
//! Both deserialise from camelCase keys so they can be supplied as the
//! structured options object automation passes in, or layered from a
//! config file and environment by the CLI.

use crate::error::{Result, ValidationError};
use crate::units::{Direction, UnitTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Regression detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdConfig {
    /// Relative change that triggers a regression (below `1 - t`) or an
    /// improvement (above `1 + t`).
    pub alert_threshold: f64,
    /// Prior entries required before a regression is reported.
    pub min_samples: usize,
    /// Compare against the mean of the last `rolling_window` entries
    /// instead of the latest one.
    pub use_rolling_average: bool,
    /// Window size for the rolling average.
    pub rolling_window: usize,
    /// When set, a change must also exceed this many combined standard
    /// deviations to count, if both sides carry a dispersion.
    pub dispersion_sigmas: Option<f64>,
    /// Extra unit directionality entries, overriding the built-in table.
    pub unit_directions: HashMap<String, Direction>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            alert_threshold: 0.1,
            min_samples: 3,
            use_rolling_average: false,
            rolling_window: 5,
            dispersion_sigmas: None,
            unit_directions: HashMap::new(),
        }
    }
}

impl ThresholdConfig {
    /// Set the alert threshold.
    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = threshold;
        self
    }

    /// Set the minimum number of prior entries.
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Enable the rolling average baseline over `window` entries.
    pub fn with_rolling_average(mut self, window: usize) -> Self {
        self.use_rolling_average = true;
        self.rolling_window = window;
        self
    }

    /// Require changes to exceed `sigmas` combined standard deviations.
    pub fn with_dispersion_sigmas(mut self, sigmas: f64) -> Self {
        self.dispersion_sigmas = Some(sigmas);
        self
    }

    /// Register a unit direction.
    pub fn with_unit(mut self, unit: impl Into<String>, direction: Direction) -> Self {
        self.unit_directions.insert(unit.into(), direction);
        self
    }

    /// Built-in unit table extended with this config's overrides.
    pub fn unit_table(&self) -> UnitTable {
        UnitTable::with_overrides(&self.unit_directions)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !(self.alert_threshold > 0.0 && self.alert_threshold < 1.0) {
            return Err(ValidationError::config(
                "alertThreshold",
                format!("must be in (0, 1), got {}", self.alert_threshold),
            ));
        }
        if self.rolling_window == 0 {
            return Err(ValidationError::config("rollingWindow", "must be at least 1"));
        }
        if let Some(sigmas) = self.dispersion_sigmas {
            if !sigmas.is_finite() || sigmas < 0.0 {
                return Err(ValidationError::config(
                    "dispersionSigmas",
                    format!("must be a non-negative number, got {sigmas}"),
                ));
            }
        }
        Ok(())
    }
}

/// Bounds on the optimistic-concurrency retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total persist attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled after every conflict.
    pub backoff_ms: u64,
    /// Wall-clock bound on the whole loop.
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 50,
            timeout_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(10);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }

    /// Overall timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject a policy that could never attempt a write.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ValidationError::config("maxAttempts", "must be at least 1"));
        }
        Ok(())
    }
}
