//! # costwatch-anomaly
//!
//! Cost anomaly detection core: statistical baselines, structural
//! change-point segmentation, and a correlating ensemble over recurring
//! cost series.
//!
//! ## Architecture
//!
//! ```text
//!                       ┌────────────────┐
//!                       │   TimeSeries   │  dated points + dimension tags
//!                       └───────┬────────┘
//!               ┌───────────────┴───────────────┐
//!               ▼                               ▼
//!     ┌──────────────────┐            ┌──────────────────┐
//!     │ BaselineDetector │            │ Changepoint-     │
//!     │  mean ± k·σ      │            │ Detector         │
//!     │  envelope        │            │  exact DP, dual- │
//!     │                  │            │  window fallback │
//!     └────────┬─────────┘            └─────────┬────────┘
//!              │ AnomalyAlert                   │ ChangePointEvent
//!              └───────────────┬───────────────┘
//!                              ▼
//!                    ┌──────────────────┐
//!                    │ EnsembleDetector │  3-day temporal correlation
//!                    └────────┬─────────┘
//!                             │
//!                             ▼
//!                     EnsembleReport (HighConfidenceEvents)
//! ```
//!
//! Detection is synchronous and stateless: every run is a pure function of
//! the input series and the configuration. Side effects (logging, alert
//! routing) go through an injectable [`ReportHook`].
//!
//! ## Quick Start
//!
//! ```rust
//! use costwatch_anomaly::{EnsembleDetector, TimePoint, TimeSeries};
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let points = (0..30)
//!     .map(|i| {
//!         let cost = if i < 20 { 100.0 } else { 300.0 };
//!         TimePoint::new(start + chrono::Days::new(i), "cost", cost)
//!     })
//!     .collect();
//!
//! let report = EnsembleDetector::with_defaults()
//!     .detect(&TimeSeries::new(points), "cost")
//!     .unwrap();
//! println!("{}", report.summary());
//! ```

#![deny(unsafe_code)]

pub mod baseline;
pub mod changepoint;
pub mod ensemble;
pub mod error;
pub mod report;
pub mod series;
pub mod severity;

mod stats;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use baseline::{
    AnomalyAlert, BaselineConfig, BaselineDetector, ForecastPoint, DEFAULT_BASELINE_WINDOW,
    DEFAULT_MIN_DATA_POINTS,
};
pub use changepoint::{
    ChangePointEvent, ChangeType, ChangepointConfig, ChangepointDetector, Segment,
    DEFAULT_MIN_SEGMENT_LENGTH, DEFAULT_PENALTY,
};
pub use ensemble::{
    EnsembleConfig, EnsembleDetector, EnsembleReport, HighConfidenceEvent,
    CORRELATION_WINDOW_DAYS, MIN_GROUP_POINTS,
};
pub use error::{Detection, DetectionError, DetectionResult};
pub use report::{ReportHook, SilentHook, TracingHook};
pub use series::{TimePoint, TimeSeries, RECOGNIZED_DIMENSIONS};
pub use severity::{Sensitivity, Severity};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(offset)
    }

    fn daily_series(values: &[f64]) -> TimeSeries {
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| TimePoint::new(day(i as u64), "cost", v))
                .collect(),
        )
    }

    #[test]
    fn integration_baseline_spike_pipeline() {
        // 20 days at 100, a 500 spike, then back to 100.
        let mut values = vec![100.0; 20];
        values.push(500.0);
        values.extend_from_slice(&[100.0; 5]);

        let detection = BaselineDetector::with_defaults()
            .detect(&daily_series(&values), "cost")
            .unwrap();
        assert_eq!(detection.len(), 1);

        let alert = &detection.findings[0];
        assert_eq!(alert.timestamp, day(20));
        assert!((alert.deviation_percent - 400.0).abs() < 1e-9);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.confidence, 1.0);
    }

    #[test]
    fn integration_sustained_shift_pipeline() {
        let mut values = vec![50.0; 20];
        values.extend_from_slice(&[150.0; 20]);

        let detection = ChangepointDetector::with_defaults()
            .detect(&daily_series(&values), "cost")
            .unwrap();
        assert_eq!(detection.len(), 1);

        let event = &detection.findings[0];
        assert_eq!(event.index, 20);
        assert_eq!(event.change_type, ChangeType::Increase);
        assert!((event.change_percent - 200.0).abs() < 1e-9);
        assert_eq!(event.severity, Severity::Critical);
    }

    #[test]
    fn integration_noise_produces_no_change_points() {
        // 40 points at 100 with noise amplitude below 1%.
        let mut rng = StdRng::seed_from_u64(7);
        let values: Vec<f64> = (0..40).map(|_| 100.0 + rng.gen_range(-0.5..0.5)).collect();

        let detection = ChangepointDetector::with_defaults()
            .detect(&daily_series(&values), "cost")
            .unwrap();
        assert!(detection.is_empty());
        assert!(!detection.insufficient_data);
    }

    #[test]
    fn integration_ensemble_correlates_spike_and_shift() {
        // A spike that settles into a new sustained level: both methods
        // fire within the correlation window.
        let mut values = vec![100.0; 20];
        values.push(500.0);
        values.extend_from_slice(&[300.0; 19]);

        let report = EnsembleDetector::with_defaults()
            .detect(&daily_series(&values), "cost")
            .unwrap();
        assert!(report.high_confidence_count >= 1);

        let event = &report.high_confidence[0];
        assert!(
            (event.alert.timestamp - event.change_point.timestamp)
                .num_days()
                .abs()
                <= CORRELATION_WINDOW_DAYS
        );
    }

    #[test]
    fn integration_short_series_is_never_an_error() {
        let series = daily_series(&[1.0, 2.0, 3.0]);

        let alerts = BaselineDetector::with_defaults()
            .detect(&series, "cost")
            .unwrap();
        assert!(alerts.is_empty());
        assert!(alerts.insufficient_data);

        let events = ChangepointDetector::with_defaults()
            .detect(&series, "cost")
            .unwrap();
        assert!(events.is_empty());
        assert!(events.insufficient_data);
    }

    #[test]
    fn integration_output_contract_field_names() {
        let mut values = vec![100.0; 20];
        values.push(500.0);
        values.extend_from_slice(&[300.0; 19]);

        let report = EnsembleDetector::with_defaults()
            .detect(&daily_series(&values), "cost")
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        let alert = &json["baseline_alerts"][0];
        for field in [
            "timestamp",
            "metric_name",
            "actual_value",
            "expected_value",
            "deviation_percent",
            "severity",
            "confidence",
            "dimensions",
            "message",
        ] {
            assert!(!alert[field].is_null(), "alert is missing `{}`", field);
        }
        assert_eq!(alert["severity"], "critical");

        let event = &json["change_points"][0];
        for field in [
            "timestamp",
            "index",
            "change_type",
            "before_mean",
            "after_mean",
            "change_percent",
            "severity",
        ] {
            assert!(!event[field].is_null(), "event is missing `{}`", field);
        }
    }

    #[test]
    fn integration_grouped_detection_is_deterministic() {
        let mut points = Vec::new();
        for i in 0..25u64 {
            let spike = if i == 20 { 500.0 } else { 100.0 };
            points.push(TimePoint::new(day(i), "cost", spike).with_dimension("service", "ec2"));
            points.push(TimePoint::new(day(i), "cost", 40.0).with_dimension("service", "s3"));
        }
        let series = TimeSeries::new(points);

        let detector = EnsembleDetector::with_defaults();
        let first = detector.detect_by_group(&series, "service", "cost").unwrap();
        let second = detector.detect_by_group(&series, "service", "cost").unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first["ec2"].total_alerts, 1);
        assert_eq!(first["s3"].total_alerts, 0);
    }

    proptest! {
        #[test]
        fn confidence_is_always_normalized(
            values in proptest::collection::vec(0.0f64..10_000.0, 8..60),
        ) {
            let detection = BaselineDetector::with_defaults()
                .detect(&daily_series(&values), "cost")
                .unwrap();
            for alert in &detection.findings {
                prop_assert!((0.0..=1.0).contains(&alert.confidence));
            }
        }

        #[test]
        fn severity_is_monotone_in_magnitude(a in 0.0f64..500.0, b in 0.0f64..500.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Severity::from_magnitude(lo) <= Severity::from_magnitude(hi));
        }

        #[test]
        fn high_confidence_never_exceeds_alerts(
            values in proptest::collection::vec(0.0f64..1_000.0, 8..50),
        ) {
            let report = EnsembleDetector::with_defaults()
                .detect(&daily_series(&values), "cost")
                .unwrap();
            prop_assert!(report.high_confidence_count <= report.total_alerts);
            prop_assert_eq!(report.high_confidence_count, report.high_confidence.len());
        }

        #[test]
        fn detection_is_deterministic(
            values in proptest::collection::vec(0.0f64..1_000.0, 8..50),
        ) {
            let series = daily_series(&values);
            let detector = EnsembleDetector::with_defaults();
            let first = detector.detect(&series, "cost").unwrap();
            let second = detector.detect(&series, "cost").unwrap();
            prop_assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }
}
