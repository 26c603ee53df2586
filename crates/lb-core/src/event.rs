//! Activity samples captured by the sampler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::score::score;
use crate::types::{ActivityStatus, Category, ValidationError, unit_interval};

/// A single foreground-activity sample.
///
/// The score is computed once at capture time and stored alongside the raw
/// fields, so later changes to the scoring rules never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// When the sample was taken (second resolution).
    pub timestamp: DateTime<Utc>,
    /// Foreground window title, `"Unknown"` when capture failed.
    pub window_title: String,
    /// Active or idle, derived from `load_pct`.
    pub status: ActivityStatus,
    /// System load percentage in \[0, 100\].
    pub load_pct: f64,
    /// Productivity score in \[0, 1\].
    pub score: f64,
}

/// Title recorded when the foreground window could not be captured.
pub const UNKNOWN_TITLE: &str = "Unknown";

impl EventRecord {
    /// Builds a record from raw probe readings.
    ///
    /// Derives the status from `idle_threshold`, classifies the title and
    /// scores the result. The load is clamped into \[0, 100\].
    pub fn from_reading(
        timestamp: DateTime<Utc>,
        window_title: impl Into<String>,
        load_pct: f64,
        idle_threshold: f64,
        classifier: &Classifier,
    ) -> Self {
        let window_title = window_title.into();
        let load_pct = if load_pct.is_nan() {
            0.0
        } else {
            load_pct.clamp(0.0, 100.0)
        };
        let status = ActivityStatus::from_load(load_pct, idle_threshold);
        let category = classifier.classify(&window_title);
        Self {
            timestamp,
            window_title,
            status,
            load_pct,
            score: score(category, status, load_pct),
        }
    }

    /// Checks the numeric invariants of a record read from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.load_pct.is_nan() || !(0.0..=100.0).contains(&self.load_pct) {
            return Err(ValidationError::LoadOutOfRange {
                value: self.load_pct,
            });
        }
        unit_interval("score", self.score)?;
        Ok(())
    }

    /// Classifies this record's window title.
    pub fn category(&self, classifier: &Classifier) -> Category {
        classifier.classify(&self.window_title)
    }
}
