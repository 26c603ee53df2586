//! Short-horizon burnout forecast from recent daily summaries.

use serde::{Deserialize, Serialize};

use crate::summary::WindowSummary;

/// Weights and limits for [`forecast`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub idle_weight: f64,
    pub distraction_weight: f64,
    pub switch_weight: f64,
    /// Applied to `1 - mean_score`; negative because a high score lowers risk.
    pub score_weight: f64,
    /// Days until burnout at zero risk.
    pub horizon_days: f64,
    /// Number of most recent summaries averaged.
    pub window: usize,
    /// Summaries required in the whole history before forecasting.
    pub min_history: usize,
    /// Estimates at or below this many days are `Immediate`.
    pub immediate_days: i64,
    /// Estimates at or below this many days are `Warning`.
    pub warning_days: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            idle_weight: 0.3,
            distraction_weight: 0.3,
            switch_weight: 0.2,
            score_weight: -0.4,
            horizon_days: 14.0,
            window: 7,
            min_history: 5,
            immediate_days: 3,
            warning_days: 7,
        }
    }
}

/// Urgency of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Immediate,
    Warning,
    Stable,
}

/// Result of [`forecast`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Forecast {
    InsufficientData {
        available: usize,
        required: usize,
    },
    Estimate {
        /// Risk in \[0, 1\].
        risk: f64,
        days_estimate: i64,
        severity: Severity,
    },
}

/// Extrapolates the most recent summaries into a days-to-burnout estimate.
///
/// `history` must be chronological; only the last `config.window` entries
/// contribute to the averages.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn forecast(history: &[WindowSummary], config: &ForecastConfig) -> Forecast {
    let required = config.min_history.max(1);
    if history.len() < required {
        return Forecast::InsufficientData {
            available: history.len(),
            required,
        };
    }
    let recent = &history[history.len().saturating_sub(config.window.max(1))..];
    let n = recent.len() as f64;
    let mean = |metric: fn(&WindowSummary) -> f64| recent.iter().map(metric).sum::<f64>() / n;

    let raw = config.idle_weight * mean(|s| s.idle_ratio)
        + config.distraction_weight * mean(|s| s.distraction_ratio)
        + config.switch_weight * mean(|s| s.switch_rate)
        + config.score_weight * (1.0 - mean(|s| s.mean_score));
    let risk = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };

    let days_estimate = ((1.0 - risk) * config.horizon_days).round() as i64;
    let severity = if days_estimate <= config.immediate_days {
        Severity::Immediate
    } else if days_estimate <= config.warning_days {
        Severity::Warning
    } else {
        Severity::Stable
    };

    Forecast::Estimate {
        risk,
        days_estimate,
        severity,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn days(metrics: &[(f64, f64, f64, f64)]) -> Vec<WindowSummary> {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        metrics
            .iter()
            .enumerate()
            .map(|(i, &(idle, distraction, switch, score))| {
                let start = base + Duration::days(i64::try_from(i).unwrap());
                WindowSummary {
                    window_start: start,
                    window_end: start + Duration::days(1),
                    sample_count: 500,
                    idle_ratio: idle,
                    distraction_ratio: distraction,
                    switch_rate: switch,
                    mean_score: score,
                }
            })
            .collect()
    }

    #[test]
    fn fewer_than_min_history_is_insufficient() {
        let history = days(&[(0.1, 0.1, 0.1, 0.8); 4]);
        assert_eq!(
            forecast(&history, &ForecastConfig::default()),
            Forecast::InsufficientData {
                available: 4,
                required: 5
            }
        );
    }

    #[test]
    fn healthy_history_is_stable() {
        let history = days(&[(0.1, 0.1, 0.1, 0.8); 5]);
        // 0.03 + 0.03 + 0.02 - 0.08 = 0.0
        let Forecast::Estimate {
            risk,
            days_estimate,
            severity,
        } = forecast(&history, &ForecastConfig::default())
        else {
            panic!("expected estimate");
        };
        assert!(risk.abs() < 1e-9);
        assert_eq!(days_estimate, 14);
        assert_eq!(severity, Severity::Stable);
    }

    #[test]
    fn poor_history_raises_severity() {
        let history = days(&[(1.0, 1.0, 1.0, 0.5); 6]);
        // 0.3 + 0.3 + 0.2 - 0.2 = 0.6 -> round(5.6) = 6 days
        let Forecast::Estimate {
            risk,
            days_estimate,
            severity,
        } = forecast(&history, &ForecastConfig::default())
        else {
            panic!("expected estimate");
        };
        assert!((risk - 0.6).abs() < 1e-9);
        assert_eq!(days_estimate, 6);
        assert_eq!(severity, Severity::Warning);

        let history = days(&[(1.0, 1.0, 1.0, 1.0); 5]);
        let Forecast::Estimate {
            days_estimate,
            severity,
            ..
        } = forecast(&history, &ForecastConfig::default())
        else {
            panic!("expected estimate");
        };
        assert_eq!(days_estimate, 3);
        assert_eq!(severity, Severity::Immediate);
    }

    #[test]
    fn only_recent_window_is_averaged() {
        let mut metrics = vec![(1.0, 1.0, 1.0, 0.0); 10];
        metrics.extend([(0.1, 0.1, 0.1, 0.8); 7]);
        let history = days(&metrics);
        let Forecast::Estimate { risk, .. } = forecast(&history, &ForecastConfig::default())
        else {
            panic!("expected estimate");
        };
        assert!(risk.abs() < 1e-9);
    }
}
