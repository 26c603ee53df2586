//! Composite burnout index.
//!
//! Each window metric is scored against an ideal value with a tolerance, then
//! the weighted sum is scaled to \[0, 100\]. The index measures how healthy the
//! window looks: 100 means every metric sits at its ideal.
//!
//! | metric            | ideal | tolerance | one-sided | weight |
//! |-------------------|-------|-----------|-----------|--------|
//! | idle_ratio        | 0.15  | 0.20      | yes       | 0.25   |
//! | distraction_ratio | 0.10  | 0.15      | yes       | 0.25   |
//! | switch_rate       | 0.10  | 0.10      | yes       | 0.20   |
//! | mean_score        | 0.80  | 0.25      | no        | 0.30   |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::summary::WindowSummary;
use crate::types::StatusBand;

/// Scoring parameters for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricParams {
    pub ideal: f64,
    pub tolerance: f64,
    /// Set when a higher raw value is worse: values at or below the ideal
    /// score 1.0 and only the excess is penalized.
    pub reverse: bool,
    pub weight: f64,
}

impl MetricParams {
    const fn new(ideal: f64, tolerance: f64, reverse: bool, weight: f64) -> Self {
        Self {
            ideal,
            tolerance,
            reverse,
            weight,
        }
    }
}

/// Parameter table and band cut-offs for [`compute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnoutConfig {
    pub idle_ratio: MetricParams,
    pub distraction_ratio: MetricParams,
    pub switch_rate: MetricParams,
    pub mean_score: MetricParams,
    /// Index at or above which the band is `Low`.
    pub low_band_min: f64,
    /// Index at or above which the band is `Medium`.
    pub medium_band_min: f64,
    /// How far back the on-demand assessment looks.
    pub lookback_hours: i64,
}

impl Default for BurnoutConfig {
    fn default() -> Self {
        Self {
            idle_ratio: MetricParams::new(0.15, 0.20, true, 0.25),
            distraction_ratio: MetricParams::new(0.10, 0.15, true, 0.25),
            switch_rate: MetricParams::new(0.10, 0.10, true, 0.20),
            mean_score: MetricParams::new(0.80, 0.25, false, 0.30),
            low_band_min: 75.0,
            medium_band_min: 50.0,
            lookback_hours: 6,
        }
    }
}

/// Outcome of one burnout computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurnoutAssessment {
    /// Index in \[0, 100\], rounded to one decimal.
    pub index: f64,
    pub band: StatusBand,
}

/// One persisted burnout assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnoutSample {
    pub timestamp: DateTime<Utc>,
    pub idle_ratio: f64,
    pub distraction_ratio: f64,
    pub switch_rate: f64,
    pub mean_score: f64,
    pub burnout_index: f64,
    pub status_band: StatusBand,
}

impl BurnoutSample {
    /// Pairs an assessment with the metrics it was computed from.
    pub fn new(
        timestamp: DateTime<Utc>,
        summary: &WindowSummary,
        assessment: BurnoutAssessment,
    ) -> Self {
        Self {
            timestamp,
            idle_ratio: summary.idle_ratio,
            distraction_ratio: summary.distraction_ratio,
            switch_rate: summary.switch_rate,
            mean_score: summary.mean_score,
            burnout_index: assessment.index,
            status_band: assessment.band,
        }
    }
}

/// Scores `value` in \[0, 1\] by its distance from `ideal`.
///
/// A zero or negative tolerance means only the exact ideal scores 1.0.
pub fn normalize(value: f64, ideal: f64, tolerance: f64, reverse: bool) -> f64 {
    let deviation = if reverse {
        (value - ideal).max(0.0)
    } else {
        (value - ideal).abs()
    };
    if tolerance <= 0.0 {
        return if deviation == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - deviation / tolerance).clamp(0.0, 1.0)
}

fn weighted(value: f64, params: &MetricParams) -> f64 {
    normalize(value, params.ideal, params.tolerance, params.reverse) * params.weight
}

/// Computes the burnout index and band for one window.
pub fn compute(summary: &WindowSummary, config: &BurnoutConfig) -> BurnoutAssessment {
    let total = weighted(summary.idle_ratio, &config.idle_ratio)
        + weighted(summary.distraction_ratio, &config.distraction_ratio)
        + weighted(summary.switch_rate, &config.switch_rate)
        + weighted(summary.mean_score, &config.mean_score);
    let index = ((100.0 * total) * 10.0).round() / 10.0;
    let index = index.clamp(0.0, 100.0);
    BurnoutAssessment {
        index,
        band: band_for(index, config),
    }
}

/// Maps an index to its risk band.
pub fn band_for(index: f64, config: &BurnoutConfig) -> StatusBand {
    if index >= config.low_band_min {
        StatusBand::Low
    } else if index >= config.medium_band_min {
        StatusBand::Medium
    } else {
        StatusBand::High
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn summary(idle: f64, distraction: f64, switch: f64, score: f64) -> WindowSummary {
        WindowSummary {
            window_start: Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap(),
            window_end: Utc.with_ymd_and_hms(2025, 1, 6, 6, 0, 0).unwrap(),
            sample_count: 100,
            idle_ratio: idle,
            distraction_ratio: distraction,
            switch_rate: switch,
            mean_score: score,
        }
    }

    #[test]
    fn ideal_metrics_score_full_index() {
        let assessment = compute(&summary(0.15, 0.10, 0.10, 0.80), &BurnoutConfig::default());
        assert!((assessment.index - 100.0).abs() < 1e-9);
        assert_eq!(assessment.band, StatusBand::Low);
    }

    #[test]
    fn worst_metrics_score_zero() {
        let assessment = compute(&summary(1.0, 1.0, 1.0, 0.0), &BurnoutConfig::default());
        assert!(assessment.index.abs() < 1e-9);
        assert_eq!(assessment.band, StatusBand::High);
    }

    #[test]
    fn medium_band_between_cutoffs() {
        // idle 0.25 -> 0.5, distraction 0.175 -> 0.5, switch ideal, score ideal
        let assessment = compute(&summary(0.25, 0.175, 0.10, 0.80), &BurnoutConfig::default());
        assert!((assessment.index - 75.0).abs() < 0.11);
        let assessment = compute(&summary(0.30, 0.175, 0.15, 0.80), &BurnoutConfig::default());
        assert_eq!(assessment.band, StatusBand::Medium);
    }

    #[test]
    fn normalize_two_sided_penalizes_both_directions() {
        assert!((normalize(0.80, 0.80, 0.25, false) - 1.0).abs() < 1e-12);
        assert!((normalize(0.55, 0.80, 0.25, false)).abs() < 1e-12);
        assert!((normalize(1.05, 0.80, 0.25, false)).abs() < 1e-12);
        assert!((normalize(0.675, 0.80, 0.25, false) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn normalize_reverse_only_penalizes_excess() {
        assert!((normalize(0.0, 0.15, 0.20, true) - 1.0).abs() < 1e-12);
        assert!((normalize(0.15, 0.15, 0.20, true) - 1.0).abs() < 1e-12);
        assert!((normalize(0.25, 0.15, 0.20, true) - 0.5).abs() < 1e-12);
        assert!(normalize(0.50, 0.15, 0.20, true).abs() < 1e-12);
    }

    #[test]
    fn normalize_zero_tolerance_is_exact_match() {
        assert!((normalize(0.5, 0.5, 0.0, false) - 1.0).abs() < 1e-12);
        assert!(normalize(0.6, 0.5, 0.0, false).abs() < 1e-12);
    }

    #[test]
    fn band_cutoffs_are_inclusive() {
        let config = BurnoutConfig::default();
        assert_eq!(band_for(75.0, &config), StatusBand::Low);
        assert_eq!(band_for(74.9, &config), StatusBand::Medium);
        assert_eq!(band_for(50.0, &config), StatusBand::Medium);
        assert_eq!(band_for(49.9, &config), StatusBand::High);
    }

    #[test]
    fn sample_copies_metrics() {
        let s = summary(0.2, 0.1, 0.05, 0.7);
        let assessment = compute(&s, &BurnoutConfig::default());
        let sample = BurnoutSample::new(s.window_end, &s, assessment);
        assert!((sample.idle_ratio - 0.2).abs() < f64::EPSILON);
        assert!((sample.burnout_index - assessment.index).abs() < f64::EPSILON);
        assert_eq!(sample.status_band, assessment.band);
    }
}
