//! Shared severity and sensitivity tables.
//!
//! Single source for the percent → severity ladder and the sensitivity →
//! standard-deviation multiplier map. Every detector references these so
//! the tiers cannot drift apart.

use serde::{Deserialize, Serialize};

// ── Severity ────────────────────────────────────────────────────────────

/// Percent magnitude at which a finding becomes critical.
pub const CRITICAL_PERCENT: f64 = 100.0;
/// Percent magnitude at which a finding becomes high.
pub const HIGH_PERCENT: f64 = 50.0;
/// Percent magnitude at which a finding becomes medium.
pub const MEDIUM_PERCENT: f64 = 25.0;

/// Four-tier severity scale shared by all detectors.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Map an absolute percent magnitude onto the shared table.
    pub fn from_magnitude(percent: f64) -> Self {
        let magnitude = percent.abs();
        if magnitude >= CRITICAL_PERCENT {
            Self::Critical
        } else if magnitude >= HIGH_PERCENT {
            Self::High
        } else if magnitude >= MEDIUM_PERCENT {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

// ── Sensitivity ─────────────────────────────────────────────────────────

/// Named envelope width for baseline detection.
///
/// Maps to the number of standard deviations a value must stray from the
/// rolling mean before it is anomalous.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl Sensitivity {
    /// Standard-deviation multiplier for the baseline envelope.
    pub fn std_multiplier(self) -> f64 {
        match self {
            Self::Low => 4.0,
            Self::Medium => 3.0,
            Self::High => 2.0,
            Self::VeryHigh => 1.5,
        }
    }
}
