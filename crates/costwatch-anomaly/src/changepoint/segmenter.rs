//! Segmentation strategies for change-point detection.
//!
//! Two interchangeable implementations behind one trait: an exact
//! penalized optimal partitioning, and an approximate dual moving-average
//! scan used when the exact solver cannot accept the signal.

use thiserror::Error;

// ── Fallback tuning ─────────────────────────────────────────────────────

/// Short trailing window for the fallback scan.
pub const SHORT_WINDOW: usize = 7;
/// Fewest points before the short average is defined.
pub const SHORT_MIN_PERIODS: usize = 4;
/// Long trailing window for the fallback scan.
pub const LONG_WINDOW: usize = 30;
/// Fewest points before the long average is defined.
pub const LONG_MIN_PERIODS: usize = 14;
/// Fractional short/long divergence that flags a change.
pub const DEVIATION_THRESHOLD: f64 = 0.30;
/// Fewest points the fallback needs before it can flag anything.
pub const MIN_FALLBACK_POINTS: usize = 14;

// ── Trait ───────────────────────────────────────────────────────────────

/// Why a segmentation strategy could not run.
#[derive(Debug, Error)]
pub enum SegmenterError {
    #[error("signal contains non-finite values")]
    NonFiniteInput,
}

/// A change-point segmentation strategy.
///
/// Returns candidate break indices in ascending order. The exact strategy
/// follows the classic convention of terminating its list with `len`; the
/// detector discards boundary markers either way.
pub trait Segmenter {
    /// Strategy name, for log provenance.
    fn name(&self) -> &'static str;

    /// Segment the signal into break indices.
    fn segment(&self, values: &[f64]) -> Result<Vec<usize>, SegmenterError>;
}

// ── Exact penalized segmentation ────────────────────────────────────────

/// Exact penalized optimal partitioning.
///
/// Minimizes the sum of within-segment squared error plus
/// `penalty × breaks` over all partitions whose segments have at least
/// `min_segment_length` points, by dynamic programming over prefix sums.
/// Quadratic in series length; rejects non-finite signals, which poison
/// the cost comparisons.
pub struct ExactSegmenter {
    pub min_segment_length: usize,
    pub penalty: f64,
}

impl ExactSegmenter {
    pub fn new(min_segment_length: usize, penalty: f64) -> Self {
        Self {
            min_segment_length,
            penalty,
        }
    }

    /// Squared-error cost of the half-open segment `[i, j)`.
    fn cost(prefix: &[f64], prefix_sq: &[f64], i: usize, j: usize) -> f64 {
        let n = (j - i) as f64;
        let sum = prefix[j] - prefix[i];
        let sq = prefix_sq[j] - prefix_sq[i];
        (sq - sum * sum / n).max(0.0)
    }
}

impl Segmenter for ExactSegmenter {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn segment(&self, values: &[f64]) -> Result<Vec<usize>, SegmenterError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SegmenterError::NonFiniteInput);
        }

        let n = values.len();
        let min_len = self.min_segment_length.max(1);
        if n < min_len * 2 {
            return Ok(vec![n]);
        }

        let mut prefix = vec![0.0; n + 1];
        let mut prefix_sq = vec![0.0; n + 1];
        for (i, &v) in values.iter().enumerate() {
            prefix[i + 1] = prefix[i] + v;
            prefix_sq[i + 1] = prefix_sq[i] + v * v;
        }

        // best[t]: minimal penalized cost of values[..t]; parent[t]: the
        // split that achieves it. best[0] = -penalty so the first segment
        // carries no penalty.
        let mut best = vec![f64::INFINITY; n + 1];
        let mut parent = vec![0usize; n + 1];
        best[0] = -self.penalty;
        for t in min_len..=n {
            for s in 0..=(t - min_len) {
                if best[s].is_infinite() {
                    continue; // s is not a reachable segment end
                }
                let candidate = best[s] + Self::cost(&prefix, &prefix_sq, s, t) + self.penalty;
                if candidate < best[t] {
                    best[t] = candidate;
                    parent[t] = s;
                }
            }
        }

        let mut breaks = vec![n];
        let mut t = parent[n];
        while t > 0 {
            breaks.push(t);
            t = parent[t];
        }
        breaks.reverse();
        Ok(breaks)
    }
}

// ── Dual moving-average fallback ────────────────────────────────────────

/// Approximate dual moving-average fallback.
///
/// Flags an index when the 7-point trailing average diverges from the
/// 30-point trailing average by more than 30%, keeping at least
/// `min_spacing` indices between consecutive flags. Needs 14 points to
/// say anything at all.
pub struct DualWindowSegmenter {
    pub min_spacing: usize,
}

impl DualWindowSegmenter {
    pub fn new(min_spacing: usize) -> Self {
        Self { min_spacing }
    }
}

impl Segmenter for DualWindowSegmenter {
    fn name(&self) -> &'static str {
        "dual-window"
    }

    fn segment(&self, values: &[f64]) -> Result<Vec<usize>, SegmenterError> {
        let n = values.len();
        if n < MIN_FALLBACK_POINTS {
            return Ok(Vec::new());
        }

        let mut breaks: Vec<usize> = Vec::new();
        for idx in 0..n {
            let Some(short) = trailing_mean(values, idx, SHORT_WINDOW, SHORT_MIN_PERIODS) else {
                continue;
            };
            let Some(long) = trailing_mean(values, idx, LONG_WINDOW, LONG_MIN_PERIODS) else {
                continue;
            };
            if !long.is_finite() || !short.is_finite() || long <= 0.0 {
                continue; // degenerate denominator
            }
            let deviation = (short - long).abs() / long;
            if !(deviation > DEVIATION_THRESHOLD) {
                continue;
            }
            if let Some(&last) = breaks.last() {
                if idx - last <= self.min_spacing {
                    continue;
                }
            }
            breaks.push(idx);
        }
        Ok(breaks)
    }
}

/// Mean of the up-to-`window` values ending at `idx` (inclusive), or
/// `None` below `min_periods`.
fn trailing_mean(values: &[f64], idx: usize, window: usize, min_periods: usize) -> Option<f64> {
    let start = (idx + 1).saturating_sub(window);
    let slice = &values[start..=idx];
    if slice.len() < min_periods {
        return None;
    }
    Some(slice.iter().sum::<f64>() / slice.len() as f64)
}
