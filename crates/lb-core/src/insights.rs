//! Descriptive views over raw samples and daily summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::event::EventRecord;
use crate::summary::WindowSummary;
use crate::types::{ActivityStatus, Category};

/// Activity totals for a recent span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub sample_count: usize,
    /// Mean score scaled to \[0, 100\], one decimal.
    pub productivity_score: f64,
    /// Active samples times the sample interval.
    pub active_secs: i64,
    /// Idle samples times the sample interval.
    pub idle_secs: i64,
    /// Most frequent category; ties resolve to Work, then Distraction.
    pub top_category: Category,
}

/// Summarizes `records` assuming one sample every `sample_interval_secs`.
///
/// Returns `None` when there are no records.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn activity_summary(
    records: &[EventRecord],
    classifier: &Classifier,
    sample_interval_secs: u64,
) -> Option<ActivitySummary> {
    if records.is_empty() {
        return None;
    }
    let interval = i64::try_from(sample_interval_secs).unwrap_or(i64::MAX);
    let active = records
        .iter()
        .filter(|r| r.status == ActivityStatus::Active)
        .count() as i64;
    let idle = records.len() as i64 - active;
    let mean = records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64;

    let counts = category_counts(records, classifier);
    let top_category = [Category::Work, Category::Distraction, Category::Neutral]
        .into_iter()
        .max_by(|a, b| {
            let ca = counts.get(a).copied().unwrap_or(0);
            let cb = counts.get(b).copied().unwrap_or(0);
            // Reverse on ties so the earlier category wins.
            ca.cmp(&cb).then(std::cmp::Ordering::Greater)
        })
        .unwrap_or(Category::Neutral);

    Some(ActivitySummary {
        sample_count: records.len(),
        productivity_score: (mean * 1000.0).round() / 10.0,
        active_secs: active.saturating_mul(interval),
        idle_secs: idle.saturating_mul(interval),
        top_category,
    })
}

fn category_counts(records: &[EventRecord], classifier: &Classifier) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        *counts.entry(record.category(classifier)).or_insert(0) += 1;
    }
    counts
}

/// Mean score of one day and its change from the previous day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyScore {
    pub day_start: DateTime<Utc>,
    pub mean_score: f64,
    /// `None` for the first day.
    pub delta: Option<f64>,
}

/// Day-over-day changes in mean score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyComparison {
    pub days: Vec<DailyScore>,
    pub largest_increase: Option<DailyScore>,
    pub largest_drop: Option<DailyScore>,
}

/// Compares consecutive daily summaries.
pub fn compare_days(daily: &[WindowSummary]) -> DailyComparison {
    let days: Vec<DailyScore> = daily
        .iter()
        .enumerate()
        .map(|(i, day)| DailyScore {
            day_start: day.window_start,
            mean_score: day.mean_score,
            delta: i
                .checked_sub(1)
                .map(|prev| day.mean_score - daily[prev].mean_score),
        })
        .collect();

    let with_delta = || days.iter().filter_map(|d| d.delta.map(|delta| (d, delta)));
    let largest_increase = with_delta()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(d, _)| d.clone());
    let largest_drop = with_delta()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(d, _)| d.clone());

    DailyComparison {
        days,
        largest_increase,
        largest_drop,
    }
}

/// When and on what the user spends their time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePatterns {
    /// Local hour of day with the most samples.
    pub most_active_hour: Option<u32>,
    /// Share of samples per category, in percent.
    pub category_share: Vec<(Category, f64)>,
}

/// Computes usage patterns in the given time zone.
#[allow(clippy::cast_precision_loss)]
pub fn usage_patterns<Tz: TimeZone>(
    records: &[EventRecord],
    classifier: &Classifier,
    tz: &Tz,
) -> UsagePatterns {
    let mut hours = [0usize; 24];
    for record in records {
        let hour = record.timestamp.with_timezone(tz).hour() as usize;
        hours[hour % 24] += 1;
    }
    let most_active_hour = hours
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .max_by(|(ha, a), (hb, b)| a.cmp(b).then(hb.cmp(ha)))
        .and_then(|(hour, _)| u32::try_from(hour).ok());

    let total = records.len() as f64;
    let category_share = category_counts(records, classifier)
        .into_iter()
        .map(|(category, count)| (category, count as f64 / total * 100.0))
        .collect();

    UsagePatterns {
        most_active_hour,
        category_share,
    }
}
