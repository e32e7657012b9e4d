use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures that surface to the caller immediately.
///
/// Everything else — insufficient data, an unavailable segmentation
/// backend, degenerate denominators — is handled inside the detectors and
/// reflected in the returned records, never raised.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The requested value field is absent from at least one record.
    #[error("value field `{0}` missing from series")]
    MissingValueField(String),

    /// The requested dimension or group key is absent from every record.
    #[error("dimension key `{0}` not present in any record")]
    MissingDimension(String),
}

/// Convenience alias for detection results.
pub type DetectionResult<T> = Result<T, DetectionError>;

/// Detection outcome carrying an explicit insufficiency signal.
///
/// Lets callers distinguish "no findings" from "not enough data to look".
/// A detector that skipped its work entirely returns
/// `Detection::insufficient()`; a completed run returns
/// `Detection::found(..)` even when the findings are empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection<T> {
    /// Findings in series order.
    pub findings: Vec<T>,
    /// True when the series was below the configured minimum and no
    /// detection ran.
    pub insufficient_data: bool,
}

impl<T> Detection<T> {
    /// Empty outcome for a series below the minimum length.
    pub fn insufficient() -> Self {
        Self {
            findings: Vec::new(),
            insufficient_data: true,
        }
    }

    /// Completed detection with the given findings.
    pub fn found(findings: Vec<T>) -> Self {
        Self {
            findings,
            insufficient_data: false,
        }
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Whether the detection produced no findings.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}
