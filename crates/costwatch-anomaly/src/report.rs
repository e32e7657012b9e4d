//! Injectable reporting hooks for detection side effects.
//!
//! Logging a finding is observability, not part of the detection contract:
//! detectors call a [`ReportHook`] and the caller chooses the sink.

use tracing::{info, warn};

use crate::baseline::AnomalyAlert;
use crate::changepoint::ChangePointEvent;

/// Sink for detection side effects.
pub trait ReportHook: Send + Sync {
    /// A baseline alert was produced.
    fn anomaly(&self, alert: &AnomalyAlert);
    /// A change-point event was produced.
    fn change_point(&self, event: &ChangePointEvent);
    /// A series (or partition) was below the configured minimum.
    fn insufficient_data(&self, metric: &str, have: usize, need: usize);
}

/// Default hook: structured `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHook;

impl ReportHook for TracingHook {
    fn anomaly(&self, alert: &AnomalyAlert) {
        info!(
            timestamp = %alert.timestamp,
            severity = %alert.severity,
            confidence = alert.confidence,
            "{}",
            alert.message
        );
    }

    fn change_point(&self, event: &ChangePointEvent) {
        info!(
            timestamp = %event.timestamp,
            index = event.index,
            severity = %event.severity,
            "{}",
            event.message
        );
    }

    fn insufficient_data(&self, metric: &str, have: usize, need: usize) {
        warn!(metric, have, need, "insufficient data points for detection");
    }
}

/// No-op hook for callers that only want the returned records.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentHook;

impl ReportHook for SilentHook {
    fn anomaly(&self, _alert: &AnomalyAlert) {}
    fn change_point(&self, _event: &ChangePointEvent) {}
    fn insufficient_data(&self, _metric: &str, _have: usize, _need: usize) {}
}
