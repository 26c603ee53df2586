//! Z-score outlier detection for score series.

use serde::{Deserialize, Serialize};

/// Default `|z|` above which a point is anomalous.
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;

/// One scored point of the input series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScore {
    /// Position in the input series.
    pub index: usize,
    pub value: f64,
    pub z: f64,
    pub is_anomaly: bool,
}

/// Result of [`detect_anomalies`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AnomalyReport {
    /// The standard deviation is zero or undefined; no point can be flagged.
    NoVariation { count: usize },
    Scored {
        mean: f64,
        std_dev: f64,
        points: Vec<ZScore>,
    },
}

impl AnomalyReport {
    /// Iterates over the flagged points only.
    pub fn anomalies(&self) -> impl Iterator<Item = &ZScore> {
        let points: &[ZScore] = match self {
            Self::NoVariation { .. } => &[],
            Self::Scored { points, .. } => points,
        };
        points.iter().filter(|p| p.is_anomaly)
    }
}

/// Scores every point of `series` against the series mean.
///
/// Uses the sample standard deviation (n - 1), so a single point has no
/// defined spread. Non-finite values make the spread undefined as well.
#[allow(clippy::cast_precision_loss)]
pub fn detect_anomalies(series: &[f64], threshold: f64) -> AnomalyReport {
    let n = series.len();
    if n < 2 || series.iter().any(|v| !v.is_finite()) {
        return AnomalyReport::NoVariation { count: n };
    }
    let n_f = n as f64;
    let mean = series.iter().sum::<f64>() / n_f;
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n_f - 1.0);
    let std_dev = variance.sqrt();
    if !std_dev.is_normal() {
        return AnomalyReport::NoVariation { count: n };
    }

    let points = series
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let z = (value - mean) / std_dev;
            ZScore {
                index,
                value,
                z,
                is_anomaly: z.abs() > threshold,
            }
        })
        .collect();

    AnomalyReport::Scored {
        mean,
        std_dev,
        points,
    }
}
