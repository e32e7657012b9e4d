//! Ordered time-series records with dimension tags.
//!
//! Replaces the tabular frame of the ingestion collaborator with a typed
//! record sequence: each point carries a date-granularity timestamp, one or
//! more named metric values, and a map of recognized dimension tags.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DetectionError, DetectionResult};

/// Dimension fields recognized at the ingestion boundary.
///
/// A fixed enumerated list, not reflection over arbitrary columns: unknown
/// fields are dropped when a point is built from raw records.
pub const RECOGNIZED_DIMENSIONS: [&str; 5] =
    ["service", "team", "environment", "project", "region"];

// ── Point ───────────────────────────────────────────────────────────────

/// One record of a recurring cost series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    /// Date-granularity timestamp.
    pub timestamp: NaiveDate,
    /// Named metric values carried by this record.
    pub values: BTreeMap<String, f64>,
    /// Dimension tags (service, team, ...), copied verbatim into alert
    /// output.
    pub dimensions: BTreeMap<String, String>,
}

impl TimePoint {
    /// A point carrying a single metric value and no dimensions.
    pub fn new(timestamp: NaiveDate, metric: &str, value: f64) -> Self {
        let mut values = BTreeMap::new();
        values.insert(metric.to_string(), value);
        Self {
            timestamp,
            values,
            dimensions: BTreeMap::new(),
        }
    }

    /// Attach a dimension tag.
    pub fn with_dimension(mut self, key: &str, value: &str) -> Self {
        self.dimensions.insert(key.to_string(), value.to_string());
        self
    }

    /// Build a point from raw string fields, keeping only recognized
    /// dimension keys.
    pub fn from_record(
        timestamp: NaiveDate,
        metric: &str,
        value: f64,
        fields: &BTreeMap<String, String>,
    ) -> Self {
        let dimensions = fields
            .iter()
            .filter(|(key, _)| RECOGNIZED_DIMENSIONS.contains(&key.as_str()))
            .map(|(key, val)| (key.clone(), val.clone()))
            .collect();
        let mut values = BTreeMap::new();
        values.insert(metric.to_string(), value);
        Self {
            timestamp,
            values,
            dimensions,
        }
    }

    /// The value of a named metric, if present.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

// ── Series ──────────────────────────────────────────────────────────────

/// An ordered sequence of records for one metric stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub points: Vec<TimePoint>,
}

impl TimeSeries {
    pub fn new(points: Vec<TimePoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A copy with points stably sorted by ascending timestamp.
    ///
    /// Duplicate timestamps keep their input order; deduplication is the
    /// caller's responsibility.
    pub fn sorted(&self) -> Self {
        let mut points = self.points.clone();
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    /// Extract the named metric as a dense value vector, in point order.
    pub fn values(&self, metric: &str) -> DetectionResult<Vec<f64>> {
        self.points
            .iter()
            .map(|p| {
                p.value(metric)
                    .ok_or_else(|| DetectionError::MissingValueField(metric.to_string()))
            })
            .collect()
    }

    /// Partition by the distinct values of a dimension key.
    ///
    /// Records without the key are skipped; the key must be present on at
    /// least one record.
    pub fn partition_by(&self, key: &str) -> DetectionResult<BTreeMap<String, TimeSeries>> {
        let mut groups: BTreeMap<String, TimeSeries> = BTreeMap::new();
        for point in &self.points {
            if let Some(value) = point.dimensions.get(key) {
                groups
                    .entry(value.clone())
                    .or_default()
                    .points
                    .push(point.clone());
            }
        }
        if groups.is_empty() {
            return Err(DetectionError::MissingDimension(key.to_string()));
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(offset)
    }

    #[test]
    fn sorted_orders_by_timestamp() {
        let series = TimeSeries::new(vec![
            TimePoint::new(day(2), "cost", 3.0),
            TimePoint::new(day(0), "cost", 1.0),
            TimePoint::new(day(1), "cost", 2.0),
        ]);
        let sorted = series.sorted();
        let values = sorted.values("cost").unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn sorted_preserves_duplicate_order() {
        let series = TimeSeries::new(vec![
            TimePoint::new(day(1), "cost", 10.0),
            TimePoint::new(day(0), "cost", 1.0),
            TimePoint::new(day(1), "cost", 20.0),
        ]);
        let sorted = series.sorted();
        // Stable sort: both day-1 records stay in input order.
        assert_eq!(sorted.values("cost").unwrap(), vec![1.0, 10.0, 20.0]);
    }

    #[test]
    fn values_reports_missing_field() {
        let series = TimeSeries::new(vec![TimePoint::new(day(0), "cost", 1.0)]);
        let err = series.values("usage_hours").unwrap_err();
        assert!(err.to_string().contains("usage_hours"));
    }

    #[test]
    fn partition_groups_by_dimension_value() {
        let series = TimeSeries::new(vec![
            TimePoint::new(day(0), "cost", 1.0).with_dimension("service", "ec2"),
            TimePoint::new(day(0), "cost", 2.0).with_dimension("service", "s3"),
            TimePoint::new(day(1), "cost", 3.0).with_dimension("service", "ec2"),
        ]);
        let groups = series.partition_by("service").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["ec2"].len(), 2);
        assert_eq!(groups["s3"].len(), 1);
    }

    #[test]
    fn partition_skips_untagged_records() {
        let series = TimeSeries::new(vec![
            TimePoint::new(day(0), "cost", 1.0).with_dimension("service", "ec2"),
            TimePoint::new(day(1), "cost", 2.0),
        ]);
        let groups = series.partition_by("service").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["ec2"].len(), 1);
    }

    #[test]
    fn partition_errors_when_key_absent_everywhere() {
        let series = TimeSeries::new(vec![TimePoint::new(day(0), "cost", 1.0)]);
        let err = series.partition_by("team").unwrap_err();
        assert!(matches!(err, DetectionError::MissingDimension(_)));
    }

    #[test]
    fn from_record_keeps_only_recognized_dimensions() {
        let mut fields = BTreeMap::new();
        fields.insert("service".to_string(), "rds".to_string());
        fields.insert("team".to_string(), "data".to_string());
        fields.insert("invoice_id".to_string(), "INV-7".to_string());

        let point = TimePoint::from_record(day(0), "cost", 12.5, &fields);
        assert_eq!(point.dimensions.len(), 2);
        assert_eq!(point.dimensions["service"], "rds");
        assert_eq!(point.dimensions["team"], "data");
        assert!(!point.dimensions.contains_key("invoice_id"));
        assert_eq!(point.value("cost"), Some(12.5));
    }

    #[test]
    fn series_serializes_deterministically() {
        let series = TimeSeries::new(vec![
            TimePoint::new(day(0), "cost", 1.0).with_dimension("service", "ec2"),
        ]);
        let a = serde_json::to_string(&series).unwrap();
        let b = serde_json::to_string(&series.clone()).unwrap();
        assert_eq!(a, b);
    }
}
