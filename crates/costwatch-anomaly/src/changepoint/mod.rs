//! Structural change-point detection.
//!
//! Finds the points where a cost series shifts to a new regime, as opposed
//! to the single-point outliers the baseline detector flags. An exact
//! penalized segmentation does the work; when it cannot accept the signal
//! the detector degrades to a dual moving-average scan and keeps going.

pub mod segmenter;

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Detection, DetectionResult};
use crate::report::{ReportHook, TracingHook};
use crate::series::TimeSeries;
use crate::severity::Severity;
use crate::stats::{mean, median, population_std};
use segmenter::{DualWindowSegmenter, ExactSegmenter, Segmenter};

/// Default minimum points per segment.
pub const DEFAULT_MIN_SEGMENT_LENGTH: usize = 3;
/// Default segmentation penalty per break.
pub const DEFAULT_PENALTY: f64 = 10.0;
/// Points consulted on each side of a break when sizing the shift.
const SIDE_WINDOW: usize = 7;

// ── Records ─────────────────────────────────────────────────────────────

/// Direction of a regime shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increase,
    Decrease,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        };
        write!(f, "{}", name)
    }
}

/// A detected regime shift, anchored at the first point of the new regime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangePointEvent {
    pub timestamp: NaiveDate,
    /// Index of the break within the sorted series.
    pub index: usize,
    pub metric_name: String,
    pub change_type: ChangeType,
    /// Mean over up to seven points before the break.
    pub before_mean: f64,
    /// Mean over up to seven points from the break onward.
    pub after_mean: f64,
    /// (after − before) / before × 100; 0 when before ≤ 0.
    pub change_percent: f64,
    pub severity: Severity,
    pub message: String,
}

/// Descriptive statistics for one segment between consecutive breaks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Timestamp of the first point in the segment.
    pub start: NaiveDate,
    /// Timestamp of the last point in the segment.
    pub end: NaiveDate,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation within the segment.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: usize,
}

// ── Configuration ───────────────────────────────────────────────────────

/// Configuration for [`ChangepointDetector`].
#[derive(Clone, Copy, Debug)]
pub struct ChangepointConfig {
    /// Minimum points per segment, also the spacing floor of the fallback.
    pub min_segment_length: usize,
    /// Penalty added per break; higher means fewer, larger shifts.
    pub penalty: f64,
}

impl Default for ChangepointConfig {
    fn default() -> Self {
        Self {
            min_segment_length: DEFAULT_MIN_SEGMENT_LENGTH,
            penalty: DEFAULT_PENALTY,
        }
    }
}

// ── Detector ────────────────────────────────────────────────────────────

/// Regime-shift detector over penalized optimal segmentation.
pub struct ChangepointDetector {
    config: ChangepointConfig,
    hook: Arc<dyn ReportHook>,
}

impl ChangepointDetector {
    pub fn new(config: ChangepointConfig) -> Self {
        Self::with_hook(config, Arc::new(TracingHook))
    }

    pub fn with_defaults() -> Self {
        Self::new(ChangepointConfig::default())
    }

    /// Create a detector with a caller-supplied reporting hook.
    pub fn with_hook(config: ChangepointConfig, hook: Arc<dyn ReportHook>) -> Self {
        Self { config, hook }
    }

    pub fn config(&self) -> &ChangepointConfig {
        &self.config
    }

    /// Detect regime shifts in the named metric of a series.
    ///
    /// A series too short to hold two segments yields
    /// `Detection::insufficient()`. Break indices at either boundary of the
    /// series are discarded; every surviving break becomes one event.
    pub fn detect(
        &self,
        series: &TimeSeries,
        metric: &str,
    ) -> DetectionResult<Detection<ChangePointEvent>> {
        let minimum = self.config.min_segment_length * 2;
        if series.len() < minimum {
            self.hook.insufficient_data(metric, series.len(), minimum);
            return Ok(Detection::insufficient());
        }

        let series = series.sorted();
        let values = series.values(metric)?;
        let breaks = self.segment(&values);

        let mut events = Vec::new();
        for idx in breaks {
            if idx == 0 || idx >= values.len() {
                continue; // boundary marker, not a shift
            }
            let Some(event) = self.build_event(&series, &values, idx, metric) else {
                continue;
            };
            self.hook.change_point(&event);
            events.push(event);
        }
        Ok(Detection::found(events))
    }

    /// Descriptive statistics for the slices between consecutive indices.
    ///
    /// `indices` is expected to include the virtual boundaries 0 and
    /// series length, in ascending order (break indices from [`detect`]
    /// events, bracketed by the caller). Degenerate or out-of-range pairs
    /// are skipped.
    ///
    /// [`detect`]: ChangepointDetector::detect
    pub fn analyze_segments(
        &self,
        series: &TimeSeries,
        indices: &[usize],
        metric: &str,
    ) -> DetectionResult<Vec<Segment>> {
        let series = series.sorted();
        let values = series.values(metric)?;

        let segments = indices
            .windows(2)
            .filter(|pair| pair[0] < pair[1] && pair[1] <= values.len())
            .map(|pair| describe_segment(&series, &values, pair[0], pair[1]))
            .collect();
        Ok(segments)
    }

    /// Run the exact segmentation, degrading to the dual-window scan when
    /// the signal is rejected.
    fn segment(&self, values: &[f64]) -> Vec<usize> {
        let exact = ExactSegmenter::new(self.config.min_segment_length, self.config.penalty);
        match exact.segment(values) {
            Ok(breaks) => breaks,
            Err(reason) => {
                let fallback = DualWindowSegmenter::new(self.config.min_segment_length);
                debug!(
                    %reason,
                    from = exact.name(),
                    to = fallback.name(),
                    "segmentation degraded to fallback strategy"
                );
                fallback.segment(values).unwrap_or_default()
            }
        }
    }

    fn build_event(
        &self,
        series: &TimeSeries,
        values: &[f64],
        idx: usize,
        metric: &str,
    ) -> Option<ChangePointEvent> {
        let before = &values[idx.saturating_sub(SIDE_WINDOW)..idx];
        let after = &values[idx..(idx + SIDE_WINDOW).min(values.len())];
        let before_mean = mean(before);
        let after_mean = mean(after);
        if !before_mean.is_finite() || !after_mean.is_finite() {
            return None;
        }

        let change_percent = if before_mean > 0.0 {
            (after_mean - before_mean) / before_mean * 100.0
        } else {
            0.0
        };
        let change_type = if after_mean >= before_mean {
            ChangeType::Increase
        } else {
            ChangeType::Decrease
        };

        Some(ChangePointEvent {
            timestamp: series.points[idx].timestamp,
            index: idx,
            metric_name: metric.to_string(),
            change_type,
            before_mean,
            after_mean,
            change_percent,
            severity: Severity::from_magnitude(change_percent),
            message: format!(
                "cost pattern shift: {:+.1}% ({:.2} -> {:.2})",
                change_percent, before_mean, after_mean
            ),
        })
    }
}

impl Default for ChangepointDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn describe_segment(series: &TimeSeries, values: &[f64], start: usize, end: usize) -> Segment {
    let slice = &values[start..end];
    Segment {
        start: series.points[start].timestamp,
        end: series.points[end - 1].timestamp,
        mean: mean(slice),
        median: median(slice),
        std_dev: population_std(slice),
        min: slice.iter().copied().fold(f64::INFINITY, f64::min),
        max: slice.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        sum: slice.iter().sum(),
        count: slice.len(),
    }
}
