//! Productivity scoring for a single sample.
//!
//! | status | category    | score                                         |
//! |--------|-------------|-----------------------------------------------|
//! | Idle   | Work        | 0.3                                           |
//! | Idle   | other       | 0.1                                           |
//! | Active | Work        | 0.6..0.8 up to 15% load, 0.8..0.95 below 50%, 1.0 from 50% |
//! | Active | Distraction | 0.3 + min(load, 50)/100 * 0.1                 |
//! | Active | Neutral     | 0.5 + min(load, 50)/100 * 0.2                 |
//!
//! Results are rounded to two decimals, the precision stored in the event log.

use crate::types::{ActivityStatus, Category};

/// Score returned when the inputs violate the scoring invariants.
pub const FALLBACK_SCORE: f64 = 0.4;

const WORK_LOW_LOAD: f64 = 15.0;
const WORK_HIGH_LOAD: f64 = 50.0;
const LOAD_CAP: f64 = 50.0;

/// Scores a sample. Pure and deterministic; the result is always in \[0, 1\].
///
/// A non-finite `load_pct` can only come from a broken probe. It yields
/// [`FALLBACK_SCORE`] and a warning instead of propagating NaN into the log.
pub fn score(category: Category, status: ActivityStatus, load_pct: f64) -> f64 {
    if !load_pct.is_finite() {
        tracing::warn!(
            %category,
            %status,
            load_pct,
            "non-finite load reached the scorer, using fallback score"
        );
        return FALLBACK_SCORE;
    }
    let load = load_pct.clamp(0.0, 100.0);

    let raw = match (status, category) {
        (ActivityStatus::Idle, Category::Work) => 0.3,
        (ActivityStatus::Idle, Category::Distraction | Category::Neutral) => 0.1,
        (ActivityStatus::Active, Category::Work) => active_work(load),
        (ActivityStatus::Active, Category::Distraction) => 0.3 + load.min(LOAD_CAP) / 100.0 * 0.1,
        (ActivityStatus::Active, Category::Neutral) => 0.5 + load.min(LOAD_CAP) / 100.0 * 0.2,
    };
    round2(raw)
}

fn active_work(load: f64) -> f64 {
    if load <= WORK_LOW_LOAD {
        0.6 + (load / WORK_LOW_LOAD) * 0.2
    } else if load < WORK_HIGH_LOAD {
        0.8 + (0.95 - 0.8) * ((load - WORK_LOW_LOAD) / (WORK_HIGH_LOAD - WORK_LOW_LOAD))
    } else {
        1.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
