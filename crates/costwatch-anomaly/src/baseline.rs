//! Rolling-baseline anomaly detection.
//!
//! Flags points that fall outside a mean ± k·σ envelope computed over the
//! trailing window of prior points. The window excludes the point under
//! test, so a spike cannot inflate its own baseline.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Detection, DetectionResult};
use crate::report::{ReportHook, TracingHook};
use crate::series::TimeSeries;
use crate::severity::{Sensitivity, Severity};
use crate::stats::{mean, sample_std};

/// Default trailing window length, in points.
pub const DEFAULT_BASELINE_WINDOW: usize = 14;
/// Default minimum points required before any detection.
pub const DEFAULT_MIN_DATA_POINTS: usize = 7;
/// Trailing values consulted by the forecast utility.
const FORECAST_TAIL: usize = 7;

// ── Records ─────────────────────────────────────────────────────────────

/// A single baseline anomaly, immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyAlert {
    pub timestamp: NaiveDate,
    pub metric_name: String,
    pub actual_value: f64,
    /// Rolling baseline mean at this point.
    pub expected_value: f64,
    /// (actual − expected) / expected × 100; 0 when expected ≤ 0.
    pub deviation_percent: f64,
    pub severity: Severity,
    /// Distance beyond the breached bound, normalized to [0, 1].
    pub confidence: f64,
    /// Dimension tags copied from the source record.
    pub dimensions: BTreeMap<String, String>,
    pub message: String,
}

/// One step of the linear trend extrapolation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDate,
    pub forecast: f64,
}

// ── Configuration ───────────────────────────────────────────────────────

/// Configuration for [`BaselineDetector`].
#[derive(Clone, Copy, Debug)]
pub struct BaselineConfig {
    /// Trailing window length, in points.
    pub baseline_window: usize,
    /// Minimum points required before any detection, and minimum history
    /// within the window before a point can be scored.
    pub min_data_points: usize,
    /// Envelope width as a named sensitivity level.
    pub sensitivity: Sensitivity,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            baseline_window: DEFAULT_BASELINE_WINDOW,
            min_data_points: DEFAULT_MIN_DATA_POINTS,
            sensitivity: Sensitivity::Medium,
        }
    }
}

// ── Detector ────────────────────────────────────────────────────────────

/// Statistical baseline detector over a rolling mean/σ envelope.
///
/// Stateless across calls: every detection is a pure function of the input
/// series and the configuration.
pub struct BaselineDetector {
    config: BaselineConfig,
    hook: Arc<dyn ReportHook>,
}

impl BaselineDetector {
    pub fn new(config: BaselineConfig) -> Self {
        Self::with_hook(config, Arc::new(TracingHook))
    }

    pub fn with_defaults() -> Self {
        Self::new(BaselineConfig::default())
    }

    /// Create a detector with a caller-supplied reporting hook.
    pub fn with_hook(config: BaselineConfig, hook: Arc<dyn ReportHook>) -> Self {
        Self { config, hook }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    /// Detect anomalies in the named metric of a series.
    ///
    /// Points with fewer than `min_data_points` of trailing history are
    /// skipped; a series shorter than the minimum yields
    /// `Detection::insufficient()`.
    pub fn detect(
        &self,
        series: &TimeSeries,
        metric: &str,
    ) -> DetectionResult<Detection<AnomalyAlert>> {
        if series.len() < self.config.min_data_points {
            self.hook
                .insufficient_data(metric, series.len(), self.config.min_data_points);
            return Ok(Detection::insufficient());
        }

        let series = series.sorted();
        let values = series.values(metric)?;
        let multiplier = self.config.sensitivity.std_multiplier();

        let mut alerts = Vec::new();
        for (i, point) in series.points.iter().enumerate() {
            let start = i.saturating_sub(self.config.baseline_window);
            let window = &values[start..i];
            if window.len() < self.config.min_data_points {
                continue; // not enough history yet
            }

            let actual = values[i];
            let expected = mean(window);
            let std_dev = sample_std(window);
            if !actual.is_finite() || !expected.is_finite() || !std_dev.is_finite() {
                continue; // non-finite input cannot be scored
            }

            let upper = expected + multiplier * std_dev;
            let lower = expected - multiplier * std_dev;
            if actual <= upper && actual >= lower {
                continue;
            }

            let deviation = if expected > 0.0 {
                (actual - expected) / expected * 100.0
            } else {
                0.0
            };
            let confidence = if actual > upper {
                clamp_confidence(actual - upper, upper - expected)
            } else {
                clamp_confidence(lower - actual, expected - lower)
            };
            let direction = if actual > upper { "spike" } else { "drop" };

            let alert = AnomalyAlert {
                timestamp: point.timestamp,
                metric_name: metric.to_string(),
                actual_value: actual,
                expected_value: expected,
                deviation_percent: deviation,
                severity: Severity::from_magnitude(deviation),
                confidence,
                dimensions: point.dimensions.clone(),
                message: format!(
                    "{} {}: {:.2} vs expected {:.2} ({:+.1}%)",
                    metric, direction, actual, expected, deviation
                ),
            };
            self.hook.anomaly(&alert);
            alerts.push(alert);
        }

        Ok(Detection::found(alerts))
    }

    /// Run detection independently per distinct value of a dimension key.
    ///
    /// Partitions below the minimum are omitted from the result, not
    /// reported as errors; partitions that ran are present even when they
    /// produced no alerts.
    pub fn detect_by_dimension(
        &self,
        series: &TimeSeries,
        dimension_key: &str,
        metric: &str,
    ) -> DetectionResult<BTreeMap<String, Vec<AnomalyAlert>>> {
        let mut results = BTreeMap::new();
        for (value, partition) in series.partition_by(dimension_key)? {
            if partition.len() < self.config.min_data_points {
                self.hook
                    .insufficient_data(metric, partition.len(), self.config.min_data_points);
                continue;
            }
            let detection = self.detect(&partition, metric)?;
            results.insert(value, detection.findings);
        }
        Ok(results)
    }

    /// Linear trend extrapolation from the trailing week of values.
    ///
    /// Convenience utility only; detection never consults it.
    pub fn forecast(
        &self,
        series: &TimeSeries,
        horizon: usize,
        metric: &str,
    ) -> DetectionResult<Detection<ForecastPoint>> {
        if series.len() < self.config.min_data_points {
            self.hook
                .insufficient_data(metric, series.len(), self.config.min_data_points);
            return Ok(Detection::insufficient());
        }

        let series = series.sorted();
        let values = series.values(metric)?;
        let (Some(last_point), Some(&last_value)) = (series.points.last(), values.last()) else {
            return Ok(Detection::insufficient());
        };

        let tail = &values[values.len().saturating_sub(FORECAST_TAIL)..];
        let deltas: Vec<f64> = tail.windows(2).map(|w| w[1] - w[0]).collect();
        let daily_change = mean(&deltas);

        let mut points = Vec::with_capacity(horizon);
        for step in 1..=horizon as u64 {
            let Some(timestamp) = last_point.timestamp.checked_add_days(Days::new(step)) else {
                break;
            };
            points.push(ForecastPoint {
                timestamp,
                forecast: last_value + step as f64 * daily_change,
            });
        }
        Ok(Detection::found(points))
    }
}

impl Default for BaselineDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Overshoot past a bound, normalized by the bound-to-mean span.
///
/// Defined as 1.0 when the span collapses to zero (the open question in
/// the source formula, resolved as a clamp).
fn clamp_confidence(overshoot: f64, span: f64) -> f64 {
    if span <= 0.0 {
        1.0
    } else {
        (overshoot / span).clamp(0.0, 1.0)
    }
}
