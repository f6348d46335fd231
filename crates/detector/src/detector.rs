// Copyright 2025 Bench History Contributors
// SPDX-License-Identifier: Apache-2.0

//! Regression detection against a benchmark's own history.
//!
//! For every measurement in a new set the detector:
//!
//! 1. finds the series with the same tool, name and unit;
//! 2. takes the latest prior value, or the mean of the last
//!    `rolling_window` values, as the baseline;
//! 3. computes a ratio that is below 1 when the result got worse, using the
//!    unit's [`Direction`];
//! 4. flags a regression below `1 - alert_threshold` and an improvement
//!    above `1 + alert_threshold`;
//! 5. downgrades a regression to insufficient data while the series holds
//!    fewer than `min_samples` prior entries.
//!
//! A measurement that cannot be evaluated is rejected on its own; siblings
//! are still evaluated.

use crate::verdict::{EvaluationReport, Verdict, VerdictKind};
use bench_history_core::{
    BenchmarkSeries, Direction, History, Measurement, MeasurementSet, ThresholdConfig, UnitTable,
    ValidationError,
};
use tracing::{debug, warn};

/// Baseline derived from a series.
#[derive(Debug, Clone, PartialEq)]
struct Baseline {
    value: f64,
    dispersion: Option<f64>,
    commit: String,
}

/// Compares new measurements against their history.
#[derive(Debug, Clone)]
pub struct RegressionDetector {
    config: ThresholdConfig,
    units: UnitTable,
}

impl RegressionDetector {
    /// Create a detector, validating the configuration.
    pub fn new(config: ThresholdConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let units = config.unit_table();
        Ok(Self { config, units })
    }

    /// Active configuration.
    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Evaluate every measurement of `set` against `history`.
    ///
    /// `history` must not yet contain `set` itself.
    pub fn evaluate(&self, set: &MeasurementSet, history: &History) -> EvaluationReport {
        let mut report = EvaluationReport::default();

        for measurement in &set.measurements {
            let series = history.series(&set.tool, &measurement.name, &measurement.unit);
            match self.evaluate_measurement(measurement, &series) {
                Ok(verdict) => {
                    debug!(
                        tool = %set.tool,
                        bench = %verdict.name,
                        verdict = %verdict.kind,
                        observed = verdict.observed,
                        baseline = ?verdict.baseline,
                        ratio = ?verdict.ratio,
                        "evaluated benchmark"
                    );
                    if verdict.is_regression() {
                        warn!(
                            tool = %set.tool,
                            bench = %verdict.name,
                            ratio = ?verdict.ratio,
                            "regression detected"
                        );
                    }
                    report.verdicts.push(verdict);
                }
                Err(e) => {
                    warn!(
                        tool = %set.tool,
                        bench = %measurement.name,
                        error = %e,
                        "measurement rejected"
                    );
                    report.rejected.push(e);
                }
            }
        }

        report
    }

    /// Evaluate one measurement against the series it belongs to.
    pub fn evaluate_measurement(
        &self,
        measurement: &Measurement,
        series: &BenchmarkSeries<'_>,
    ) -> Result<Verdict, ValidationError> {
        measurement.validate()?;
        let direction =
            self.units
                .direction(&measurement.unit)
                .ok_or_else(|| ValidationError::UnknownUnit {
                    name: measurement.name.clone(),
                    unit: measurement.unit.clone(),
                })?;

        let mut verdict = Verdict {
            name: measurement.name.clone(),
            unit: measurement.unit.clone(),
            kind: VerdictKind::InsufficientData,
            direction,
            observed: measurement.value,
            baseline: None,
            ratio: None,
            prior_samples: series.len(),
            baseline_commit: None,
        };

        let Some(baseline) = self.baseline(series) else {
            return Ok(verdict);
        };
        verdict.baseline = Some(baseline.value);
        verdict.baseline_commit = Some(baseline.commit.clone());

        // A zero baseline gives no meaningful ratio.
        if baseline.value <= 0.0 {
            return Ok(verdict);
        }

        let ratio = direction.ratio(measurement.value, baseline.value);
        verdict.ratio = Some(ratio);
        verdict.kind = self.classify(ratio);

        if verdict.kind != VerdictKind::Ok && self.within_noise(measurement, &baseline) {
            verdict.kind = VerdictKind::Ok;
        }
        if verdict.kind == VerdictKind::Regression && series.len() < self.config.min_samples {
            verdict.kind = VerdictKind::InsufficientData;
        }

        Ok(verdict)
    }

    fn classify(&self, ratio: f64) -> VerdictKind {
        let threshold = self.config.alert_threshold;
        if ratio < 1.0 - threshold {
            VerdictKind::Regression
        } else if ratio > 1.0 + threshold {
            VerdictKind::Improvement
        } else {
            VerdictKind::Ok
        }
    }

    fn baseline(&self, series: &BenchmarkSeries<'_>) -> Option<Baseline> {
        let latest = series.latest()?;
        let commit = latest.commit.id.clone();

        if !self.config.use_rolling_average {
            return Some(Baseline {
                value: latest.measurement.value,
                dispersion: latest.measurement.dispersion,
                commit,
            });
        }

        let window = series.tail(self.config.rolling_window);
        let n = window.len() as f64;
        let value = window.iter().map(|p| p.measurement.value).sum::<f64>() / n;
        // Pooled standard deviation, only when every point carries one.
        let dispersion = window
            .iter()
            .map(|p| p.measurement.dispersion.map(|d| d * d))
            .sum::<Option<f64>>()
            .map(|variance_sum| (variance_sum / n).sqrt());

        Some(Baseline {
            value,
            dispersion,
            commit,
        })
    }

    /// Whether the change is inside `dispersion_sigmas` combined standard
    /// deviations. Always false when the gate is off or dispersion is missing.
    fn within_noise(&self, measurement: &Measurement, baseline: &Baseline) -> bool {
        let (Some(sigmas), Some(observed_sd), Some(baseline_sd)) = (
            self.config.dispersion_sigmas,
            measurement.dispersion,
            baseline.dispersion,
        ) else {
            return false;
        };
        let combined = (observed_sd * observed_sd + baseline_sd * baseline_sd).sqrt();
        (measurement.value - baseline.value).abs() <= sigmas * combined
    }

    /// Direction for a unit, if known.
    pub fn direction(&self, unit: &str) -> Option<Direction> {
        self.units.direction(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_history_core::CommitInfo;

    fn set(commit: &str, date: i64, measurements: Vec<Measurement>) -> MeasurementSet {
        MeasurementSet::builder()
            .tool("pytest")
            .commit(CommitInfo::new(commit, "msg"))
            .date(date)
            .measurements(measurements)
            .build()
            .unwrap()
    }

    fn history_of(values: &[(&str, f64, &str)]) -> History {
        values
            .iter()
            .enumerate()
            .fold(History::default(), |h, (i, (name, value, unit))| {
                h.appended(
                    "pytest",
                    set(&format!("c{i}"), i as i64, vec![Measurement::new(*name, *value, *unit)]),
                )
            })
    }

    fn detector(config: ThresholdConfig) -> RegressionDetector {
        RegressionDetector::new(config).unwrap()
    }

    fn eager() -> ThresholdConfig {
        ThresholdConfig::default().with_min_samples(1)
    }

    #[test]
    fn test_first_measurement_is_insufficient_data() {
        let d = detector(eager());
        let report = d.evaluate(
            &set("new", 9, vec![Measurement::new("merge", 10.0, "iter/sec")]),
            &History::default(),
        );
        let verdict = report.get("merge").unwrap();
        assert_eq!(verdict.kind, VerdictKind::InsufficientData);
        assert_eq!(verdict.baseline, None);
        assert_eq!(verdict.prior_samples, 0);
    }

    #[test]
    fn test_throughput_drop_is_regression() {
        let d = detector(eager());
        let history = history_of(&[("merge", 10.0, "iter/sec")]);
        let report = d.evaluate(
            &set("new", 9, vec![Measurement::new("merge", 4.0, "iter/sec")]),
            &history,
        );
        let verdict = report.get("merge").unwrap();
        assert_eq!(verdict.kind, VerdictKind::Regression);
        assert_eq!(verdict.ratio, Some(0.4));
        assert_eq!(verdict.baseline, Some(10.0));
        assert_eq!(verdict.baseline_commit.as_deref(), Some("c0"));
    }

    #[test]
    fn test_halved_throughput_and_doubled_latency_both_regress() {
        let d = detector(eager());
        let history = history_of(&[("ops", 100.0, "ops/sec"), ("lat", 100.0, "ms")]);

        let throughput = d.evaluate(
            &set("n", 9, vec![Measurement::new("ops", 50.0, "ops/sec")]),
            &history,
        );
        let latency = d.evaluate(
            &set("n", 9, vec![Measurement::new("lat", 200.0, "ms")]),
            &history,
        );
        assert_eq!(throughput.get("ops").unwrap().kind, VerdictKind::Regression);
        assert_eq!(latency.get("lat").unwrap().kind, VerdictKind::Regression);
        assert_eq!(latency.get("lat").unwrap().ratio, Some(0.5));
    }

    #[test]
    fn test_latency_increase_is_regression() {
        let d = detector(eager());
        let history = history_of(&[("parse", 100.0, "ms")]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("parse", 250.0, "ms")]),
            &history,
        );
        let verdict = report.get("parse").unwrap();
        assert_eq!(verdict.kind, VerdictKind::Regression);
        assert_eq!(verdict.ratio, Some(0.4));
    }

    #[test]
    fn test_small_change_is_ok() {
        let d = detector(eager());
        let history = history_of(&[("merge", 10.0, "iter/sec")]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("merge", 10.3, "iter/sec")]),
            &history,
        );
        assert_eq!(report.get("merge").unwrap().kind, VerdictKind::Ok);
    }

    #[test]
    fn test_improvement_is_informational() {
        let d = detector(eager());
        let history = history_of(&[("parse", 100.0, "ms")]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("parse", 50.0, "ms")]),
            &history,
        );
        assert_eq!(report.get("parse").unwrap().kind, VerdictKind::Improvement);
        assert_eq!(report.regressions().count(), 0);
    }

    #[test]
    fn test_min_samples_downgrades_regression() {
        let d = detector(ThresholdConfig::default().with_min_samples(3));
        let history = history_of(&[("merge", 10.0, "iter/sec"), ("merge", 10.0, "iter/sec")]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("merge", 4.0, "iter/sec")]),
            &history,
        );
        let verdict = report.get("merge").unwrap();
        assert_eq!(verdict.kind, VerdictKind::InsufficientData);
        assert_eq!(verdict.ratio, Some(0.4));
        assert_eq!(verdict.prior_samples, 2);
    }

    #[test]
    fn test_unit_change_starts_new_series() {
        let d = detector(eager());
        let history = history_of(&[("parse", 0.1, "sec")]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("parse", 250.0, "ms")]),
            &history,
        );
        assert_eq!(report.get("parse").unwrap().kind, VerdictKind::InsufficientData);
    }

    #[test]
    fn test_rolling_average_baseline() {
        let d = detector(eager().with_rolling_average(3));
        let history = history_of(&[
            ("merge", 100.0, "iter/sec"),
            ("merge", 8.0, "iter/sec"),
            ("merge", 10.0, "iter/sec"),
            ("merge", 12.0, "iter/sec"),
        ]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("merge", 10.5, "iter/sec")]),
            &history,
        );
        let verdict = report.get("merge").unwrap();
        assert_eq!(verdict.baseline, Some(10.0));
        assert_eq!(verdict.kind, VerdictKind::Ok);
    }

    #[test]
    fn test_dispersion_gate_suppresses_noisy_change() {
        let noisy = |value: f64| Measurement::new("merge", value, "iter/sec").with_dispersion(2.0);
        let history = History::default().appended("pytest", set("c0", 0, vec![noisy(10.0)]));
        let new = set("n", 9, vec![noisy(7.5)]);

        let flat = detector(eager()).evaluate(&new, &history);
        assert_eq!(flat.get("merge").unwrap().kind, VerdictKind::Regression);

        let gated = detector(eager().with_dispersion_sigmas(1.0)).evaluate(&new, &history);
        assert_eq!(gated.get("merge").unwrap().kind, VerdictKind::Ok);
    }

    #[test]
    fn test_dispersion_gate_needs_both_sides() {
        let history = history_of(&[("merge", 10.0, "iter/sec")]);
        let new = set(
            "n",
            9,
            vec![Measurement::new("merge", 7.5, "iter/sec").with_dispersion(2.0)],
        );
        let gated = detector(eager().with_dispersion_sigmas(1.0)).evaluate(&new, &history);
        assert_eq!(gated.get("merge").unwrap().kind, VerdictKind::Regression);
    }

    #[test]
    fn test_bad_measurement_does_not_abort_siblings() {
        let d = detector(eager());
        let history = history_of(&[("merge", 10.0, "iter/sec")]);
        let report = d.evaluate(
            &set(
                "n",
                9,
                vec![
                    Measurement::new("odd", 1.0, "furlongs"),
                    Measurement::new("blank", 1.0, ""),
                    Measurement::new("merge", 4.0, "iter/sec"),
                ],
            ),
            &history,
        );
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(report.rejected[0], ValidationError::UnknownUnit { .. }));
        assert!(matches!(report.rejected[1], ValidationError::MissingUnit { .. }));
        assert_eq!(report.verdicts.len(), 1);
        assert_eq!(report.count(VerdictKind::Regression), 1);
    }

    #[test]
    fn test_zero_baseline_is_insufficient() {
        let d = detector(eager());
        let history = history_of(&[("allocs", 0.0, "allocs/op")]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("allocs", 3.0, "allocs/op")]),
            &history,
        );
        let verdict = report.get("allocs").unwrap();
        assert_eq!(verdict.kind, VerdictKind::InsufficientData);
        assert_eq!(verdict.ratio, None);
    }

    #[test]
    fn test_custom_unit_direction() {
        let d = detector(eager().with_unit("frames", Direction::HigherIsBetter));
        let history = history_of(&[("render", 60.0, "frames")]);
        let report = d.evaluate(
            &set("n", 9, vec![Measurement::new("render", 30.0, "frames")]),
            &history,
        );
        assert_eq!(report.get("render").unwrap().kind, VerdictKind::Regression);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ThresholdConfig::default().with_alert_threshold(1.5);
        assert!(RegressionDetector::new(config).is_err());
    }
}
