//! Windowed aggregation of activity samples.
//!
//! Samples are bucketed into fixed hour or day windows in a caller-supplied
//! time zone. Empty windows are never emitted: a zero-valued placeholder would
//! drag trend fits towards zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::event::EventRecord;
use crate::types::{ActivityStatus, Category};

/// Aggregation window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
}

/// Behavioral metrics for one time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    /// Inclusive start of the window.
    pub window_start: DateTime<Utc>,
    /// Exclusive end of the window.
    pub window_end: DateTime<Utc>,
    /// Number of samples in the window (always > 0).
    pub sample_count: usize,
    /// Fraction of samples with status `Idle`.
    pub idle_ratio: f64,
    /// Fraction of samples classified as distraction.
    pub distraction_ratio: f64,
    /// Title changes between adjacent samples, divided by sample count.
    pub switch_rate: f64,
    /// Mean productivity score.
    pub mean_score: f64,
}

/// Groups `records` into windows and summarizes each non-empty one.
///
/// Windows are returned in chronological order. Records are bucketed by their
/// own timestamp, so input order only matters for the switch count.
pub fn summarize<Tz: TimeZone>(
    records: &[EventRecord],
    classifier: &Classifier,
    granularity: Granularity,
    tz: &Tz,
) -> Vec<WindowSummary> {
    let mut buckets: BTreeMap<DateTime<Utc>, (DateTime<Utc>, Vec<&EventRecord>)> =
        BTreeMap::new();
    for record in records {
        let (start, end) = window_bounds(record.timestamp, granularity, tz);
        buckets
            .entry(start)
            .or_insert_with(|| (end, Vec::new()))
            .1
            .push(record);
    }

    buckets
        .into_iter()
        .filter_map(|(start, (end, members))| summarize_window(start, end, &members, classifier))
        .collect()
}

/// Summarizes all `records` as a single window spanning `[start, end)`.
///
/// Returns `None` when there are no records.
pub fn summarize_span(
    records: &[EventRecord],
    classifier: &Classifier,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<WindowSummary> {
    let members: Vec<&EventRecord> = records.iter().collect();
    summarize_window(start, end, &members, classifier)
}

#[allow(clippy::cast_precision_loss)]
fn summarize_window(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    records: &[&EventRecord],
    classifier: &Classifier,
) -> Option<WindowSummary> {
    if records.is_empty() {
        return None;
    }
    let total = records.len() as f64;

    let idle = records
        .iter()
        .filter(|r| r.status == ActivityStatus::Idle)
        .count();
    let distraction = records
        .iter()
        .filter(|r| r.category(classifier) == Category::Distraction)
        .count();
    let switches = records
        .windows(2)
        .filter(|pair| pair[0].window_title != pair[1].window_title)
        .count();
    let score_sum: f64 = records.iter().map(|r| r.score).sum();

    Some(WindowSummary {
        window_start,
        window_end,
        sample_count: records.len(),
        idle_ratio: idle as f64 / total,
        distraction_ratio: distraction as f64 / total,
        switch_rate: switches as f64 / total,
        mean_score: score_sum / total,
    })
}

/// Computes the `[start, end)` window containing `timestamp`.
pub fn window_bounds<Tz: TimeZone>(
    timestamp: DateTime<Utc>,
    granularity: Granularity,
    tz: &Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let local = timestamp.with_timezone(tz).naive_local();
    match granularity {
        Granularity::Hour => {
            let truncated = local
                .date()
                .and_time(NaiveTime::from_hms_opt(local.hour(), 0, 0).unwrap_or(NaiveTime::MIN));
            let start = local_to_utc(tz, truncated).unwrap_or_else(|| truncate_utc_hour(timestamp));
            // A repeated local hour spans two real hours; the window covers both.
            let next = truncated + Duration::hours(1);
            let end = local_to_utc(tz, next)
                .or_else(|| local_to_utc(tz, next + Duration::hours(1)))
                .filter(|end| *end > timestamp)
                .unwrap_or(start + Duration::hours(1));
            (start, end)
        }
        Granularity::Day => {
            let date = local.date();
            let start = local_midnight_to_utc(tz, date.and_time(NaiveTime::MIN));
            let end = date
                .succ_opt()
                .map_or(start + Duration::days(1), |next| {
                    local_midnight_to_utc(tz, next.and_time(NaiveTime::MIN))
                });
            (start, end)
        }
    }
}

/// Converts a local midnight to UTC.
/// Handles DST ambiguity by picking the earlier time; a midnight that falls in
/// a spring-forward gap moves to 1am.
fn local_midnight_to_utc<Tz: TimeZone>(tz: &Tz, midnight: NaiveDateTime) -> DateTime<Utc> {
    local_to_utc(tz, midnight)
        .or_else(|| local_to_utc(tz, midnight + Duration::hours(1)))
        .unwrap_or_else(|| midnight.and_utc())
}

fn local_to_utc<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

fn truncate_utc_hour(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let naive = timestamp.naive_utc();
    naive
        .date()
        .and_time(NaiveTime::from_hms_opt(naive.hour(), 0, 0).unwrap_or(NaiveTime::MIN))
        .and_utc()
}

/// Extracts one metric from each summary, preserving order.
pub fn metric_series(summaries: &[WindowSummary], metric: fn(&WindowSummary) -> f64) -> Vec<f64> {
    summaries.iter().map(metric).collect()
}
