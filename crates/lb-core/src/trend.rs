//! Trend detection over a metric series.
//!
//! Fits an ordinary least-squares line against index positions and classifies
//! the slope per step.

use serde::{Deserialize, Serialize};

/// Direction of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Fewer points than the detector needs.
    InsufficientData,
    Stable,
    Upward,
    Downward,
    /// Slope too large to be stable but too small to be a clear direction.
    Volatile,
}

impl Trend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient data",
            Self::Stable => "stable",
            Self::Upward => "upward",
            Self::Downward => "downward",
            Self::Volatile => "volatile",
        }
    }
}

/// Slope thresholds and window size for [`detect_trend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Only the most recent `window` points are fitted.
    pub window: usize,
    /// Minimum number of points for a fit.
    pub min_points: usize,
    /// `|slope|` below this is stable.
    pub stable_slope: f64,
    /// `|slope|` above this is a clear direction.
    pub directional_slope: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 7,
            min_points: 3,
            stable_slope: 0.001,
            directional_slope: 0.005,
        }
    }
}

/// Classifies the direction of the most recent `config.window` points.
pub fn detect_trend(series: &[f64], config: &TrendConfig) -> Trend {
    let start = series.len().saturating_sub(config.window.max(1));
    let recent = &series[start..];
    if recent.len() < config.min_points.max(2) {
        return Trend::InsufficientData;
    }
    let Some(slope) = ols_slope(recent) else {
        return Trend::InsufficientData;
    };

    if slope.abs() < config.stable_slope {
        Trend::Stable
    } else if slope > config.directional_slope {
        Trend::Upward
    } else if slope < -config.directional_slope {
        Trend::Downward
    } else {
        Trend::Volatile
    }
}

/// Least-squares slope of `values` against `0..n`.
///
/// Returns `None` for fewer than two points or non-finite input.
#[allow(clippy::cast_precision_loss)]
pub fn ols_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });
    Some(num / den)
}
