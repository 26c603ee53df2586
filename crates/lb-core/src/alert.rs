//! Alert decisions: cooldown rule and the findings worth surfacing.
//!
//! Delivery and persistence live outside this crate; this module only decides
//! whether an alert may fire and what it should say.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::summary::WindowSummary;
use crate::trend::Trend;

/// Logical alert channels. Each channel has its own cooldown.
pub mod channel {
    pub const THRESHOLD: &str = "threshold";
    pub const TREND: &str = "trend";
    pub const BURNOUT: &str = "burnout";
    pub const FORECAST: &str = "forecast";
    pub const ANOMALY: &str = "anomaly";
    pub const SUGGESTION: &str = "suggestion";
}

/// A fired alert as stored in the alert log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Cooldown channel, e.g. `"threshold"`.
    pub channel: String,
    /// Component that raised the alert.
    pub source: String,
}

/// Whether an alert was delivered or held back by the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertOutcome {
    Fired,
    Suppressed,
}

/// Returns `true` when a new alert may fire on a channel whose last alert
/// fired at `last`.
///
/// An alert exactly `cooldown` after the previous one may fire. A `last` in
/// the future (clock moved backwards) suppresses until it is `cooldown` in the
/// past.
pub fn cooldown_elapsed(last: Option<DateTime<Utc>>, now: DateTime<Utc>, cooldown: Duration) -> bool {
    last.is_none_or(|last| now - last >= cooldown)
}

/// Limits beyond which a window's metrics are worth an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Alert when idle ratio exceeds this.
    pub max_idle_ratio: f64,
    /// Alert when distraction ratio exceeds this.
    pub max_distraction_ratio: f64,
    /// Alert when switch rate exceeds this.
    pub max_switch_rate: f64,
    /// Alert when mean score falls below this.
    pub min_mean_score: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            max_idle_ratio: 0.40,
            max_distraction_ratio: 0.35,
            max_switch_rate: 0.20,
            min_mean_score: 0.50,
        }
    }
}

/// Lists the threshold breaches of one window, most severe metric first.
pub fn threshold_findings(summary: &WindowSummary, config: &ThresholdConfig) -> Vec<&'static str> {
    let mut findings = Vec::new();
    if summary.idle_ratio > config.max_idle_ratio {
        findings.push("High idle time detected.");
    }
    if summary.distraction_ratio > config.max_distraction_ratio {
        findings.push("You're spending too much time on distractions.");
    }
    if summary.switch_rate > config.max_switch_rate {
        findings.push("Frequent app switching noted.");
    }
    if summary.mean_score < config.min_mean_score {
        findings.push("Your productivity score is low.");
    }
    findings
}

/// Trend direction of each window metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTrends {
    pub idle_ratio: Trend,
    pub distraction_ratio: Trend,
    pub switch_rate: Trend,
    pub mean_score: Trend,
}

/// Message sent when no trend is worth mentioning.
pub const STABLE_TRENDS_MESSAGE: &str = "All behavioral trends are stable.";

/// Turns metric trends into alert lines.
///
/// Returns an empty list when there was not enough data to fit the score
/// trend; otherwise returns at least [`STABLE_TRENDS_MESSAGE`].
pub fn trend_findings(trends: &MetricTrends) -> Vec<&'static str> {
    if trends.mean_score == Trend::InsufficientData {
        return Vec::new();
    }
    let mut findings = Vec::new();
    if trends.mean_score == Trend::Downward {
        findings.push("Productivity is falling. Risk of burnout.");
    }
    if trends.idle_ratio == Trend::Upward {
        findings.push("Idle time is rising. Possible disengagement.");
    }
    if trends.distraction_ratio == Trend::Upward {
        findings.push("Distractions are increasing.");
    }
    if trends.mean_score == Trend::Upward {
        findings.push("Productivity is improving.");
    }
    if trends.mean_score == Trend::Volatile {
        findings.push("Focus patterns are irregular.");
    }
    if findings.is_empty() {
        findings.push(STABLE_TRENDS_MESSAGE);
    }
    findings
}
