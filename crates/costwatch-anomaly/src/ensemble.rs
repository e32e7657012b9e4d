//! Ensemble detection: temporal correlation of both methods.
//!
//! Runs the baseline and change-point detectors over the same series and
//! pairs findings that agree in time. An alert that lands within a few
//! days of a regime shift is corroborated by two independent methods and
//! is promoted to a high-confidence event.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::baseline::{AnomalyAlert, BaselineConfig, BaselineDetector};
use crate::changepoint::{ChangePointEvent, ChangepointConfig, ChangepointDetector};
use crate::error::DetectionResult;
use crate::report::{ReportHook, TracingHook};
use crate::series::TimeSeries;
use crate::severity::Sensitivity;

/// Days (inclusive, absolute) within which the two methods corroborate.
pub const CORRELATION_WINDOW_DAYS: i64 = 3;
/// Minimum points per partition in grouped detection.
pub const MIN_GROUP_POINTS: usize = 7;

// ── Records ─────────────────────────────────────────────────────────────

/// An anomaly corroborated by a temporally nearby regime shift.
///
/// Only ever built from its two sources via [`HighConfidenceEvent::pair`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighConfidenceEvent {
    /// Timestamp of the baseline alert.
    pub timestamp: NaiveDate,
    pub alert: AnomalyAlert,
    pub change_point: ChangePointEvent,
    pub message: String,
}

impl HighConfidenceEvent {
    /// Pair a baseline alert with the change point that corroborates it.
    pub fn pair(alert: AnomalyAlert, change_point: ChangePointEvent) -> Self {
        let message = format!(
            "corroborated anomaly on {}: baseline {:+.1}% with pattern shift {:+.1}% on {}",
            alert.timestamp,
            alert.deviation_percent,
            change_point.change_percent,
            change_point.timestamp
        );
        Self {
            timestamp: alert.timestamp,
            alert,
            change_point,
            message,
        }
    }
}

/// Combined outcome of one ensemble run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnsembleReport {
    pub baseline_alerts: Vec<AnomalyAlert>,
    pub change_points: Vec<ChangePointEvent>,
    pub high_confidence: Vec<HighConfidenceEvent>,
    pub total_alerts: usize,
    pub total_change_points: usize,
    pub high_confidence_count: usize,
    /// True when either underlying detector saw too little data.
    pub insufficient_data: bool,
}

impl EnsembleReport {
    /// Human-readable multi-line summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "cost anomaly detection summary".to_string(),
            format!("  baseline alerts:      {}", self.total_alerts),
            format!("  change points:        {}", self.total_change_points),
            format!("  high confidence:      {}", self.high_confidence_count),
        ];
        if self.insufficient_data {
            lines.push("  (insufficient data for at least one method)".to_string());
        }
        for event in &self.high_confidence {
            lines.push(format!("  - {}", event.message));
        }
        lines.join("\n")
    }
}

// ── Configuration ───────────────────────────────────────────────────────

/// Configuration for [`EnsembleDetector`].
#[derive(Clone, Copy, Debug)]
pub struct EnsembleConfig {
    /// Envelope width passed to the baseline detector.
    pub sensitivity: Sensitivity,
    /// Penalty passed to the change-point detector.
    pub changepoint_penalty: f64,
    /// Reserved: methods that must agree before promotion. Correlation is
    /// currently the fixed two-method rule.
    pub min_agreement: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            sensitivity: Sensitivity::Medium,
            changepoint_penalty: crate::changepoint::DEFAULT_PENALTY,
            min_agreement: 1,
        }
    }
}

// ── Detector ────────────────────────────────────────────────────────────

/// Two-method ensemble with temporal correlation.
pub struct EnsembleDetector {
    baseline: BaselineDetector,
    changepoint: ChangepointDetector,
}

impl EnsembleDetector {
    pub fn new(config: EnsembleConfig) -> Self {
        Self::with_hook(config, Arc::new(TracingHook))
    }

    pub fn with_defaults() -> Self {
        Self::new(EnsembleConfig::default())
    }

    /// Create an ensemble whose sub-detectors share one reporting hook.
    pub fn with_hook(config: EnsembleConfig, hook: Arc<dyn ReportHook>) -> Self {
        let baseline_config = BaselineConfig {
            sensitivity: config.sensitivity,
            ..BaselineConfig::default()
        };
        let changepoint_config = ChangepointConfig {
            penalty: config.changepoint_penalty,
            ..ChangepointConfig::default()
        };
        Self {
            baseline: BaselineDetector::with_hook(baseline_config, hook.clone()),
            changepoint: ChangepointDetector::with_hook(changepoint_config, hook),
        }
    }

    /// Run both detectors and correlate their findings.
    pub fn detect(&self, series: &TimeSeries, metric: &str) -> DetectionResult<EnsembleReport> {
        let alerts = self.baseline.detect(series, metric)?;
        let change_points = self.changepoint.detect(series, metric)?;

        let high_confidence = correlate(&alerts.findings, &change_points.findings);
        Ok(EnsembleReport {
            total_alerts: alerts.len(),
            total_change_points: change_points.len(),
            high_confidence_count: high_confidence.len(),
            insufficient_data: alerts.insufficient_data || change_points.insufficient_data,
            baseline_alerts: alerts.findings,
            change_points: change_points.findings,
            high_confidence,
        })
    }

    /// Run the ensemble independently per distinct value of a dimension
    /// key. Partitions with fewer than [`MIN_GROUP_POINTS`] points are
    /// omitted.
    pub fn detect_by_group(
        &self,
        series: &TimeSeries,
        dimension_key: &str,
        metric: &str,
    ) -> DetectionResult<BTreeMap<String, EnsembleReport>> {
        let mut reports = BTreeMap::new();
        for (value, partition) in series.partition_by(dimension_key)? {
            if partition.len() < MIN_GROUP_POINTS {
                continue;
            }
            reports.insert(value, self.detect(&partition, metric)?);
        }
        Ok(reports)
    }
}

impl Default for EnsembleDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Greedy nearest-within-window pairing: for each alert, the first change
/// point within the correlation window wins; an alert pairs at most once.
fn correlate(
    alerts: &[AnomalyAlert],
    change_points: &[ChangePointEvent],
) -> Vec<HighConfidenceEvent> {
    let mut events = Vec::new();
    for alert in alerts {
        let matched = change_points.iter().find(|cp| {
            (alert.timestamp - cp.timestamp).num_days().abs() <= CORRELATION_WINDOW_DAYS
        });
        if let Some(change_point) = matched {
            events.push(HighConfidenceEvent::pair(
                alert.clone(),
                change_point.clone(),
            ));
        }
    }
    events
}
