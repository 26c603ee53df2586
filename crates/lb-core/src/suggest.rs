//! Break and focus suggestions based on past burnout assessments.

use serde::{Deserialize, Serialize};

use crate::burnout::BurnoutSample;
use crate::types::StatusBand;

/// A suggestion with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// What the user should do.
    pub message: String,
    /// Human-readable explanation for why this was suggested.
    pub reason: String,
}

/// Limits used by [`suggest_from_history`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// How many days of assessments are considered.
    pub lookback_days: i64,
    /// Suggest deep-work blocks when the mean index falls below this.
    pub min_mean_index: f64,
    /// Suggest a break after this many high-risk assessments.
    pub max_high_band: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            lookback_days: 5,
            min_mean_index: 60.0,
            max_high_band: 3,
        }
    }
}

/// Suggest actions from recent burnout samples, most critical first.
///
/// Returns an empty list when there are no samples.
#[allow(clippy::cast_precision_loss)]
pub fn suggest_from_history(samples: &[BurnoutSample], config: &SuggestionConfig) -> Vec<Suggestion> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    let mean_index =
        samples.iter().map(|s| s.burnout_index).sum::<f64>() / samples.len() as f64;
    let high_count = samples
        .iter()
        .filter(|s| s.status_band == StatusBand::High)
        .count();

    if mean_index < config.min_mean_index {
        suggestions.push(Suggestion {
            message: "Consider blocking time for focused deep work.".to_string(),
            reason: format!(
                "Mean burnout index {mean_index:.1} over {} assessments",
                samples.len()
            ),
        });
    }
    if high_count >= config.max_high_band {
        suggestions.push(Suggestion {
            message: "You've had several high-burnout assessments. Schedule a break."
                .to_string(),
            reason: format!("{high_count} high-risk assessments"),
        });
    }
    suggestions
}
