//! Summary command for recent activity.
//!
//! `lb summary --hour` covers the last 60 minutes, `--day` everything since
//! local midnight.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use lb_core::insights::ActivitySummary;
use lb_core::summary::window_bounds;
use lb_core::{Granularity, WindowSummary};
use lb_db::Database;
use serde::Serialize;

use super::util::{format_duration, format_time, percent, progress_bar, write_json};
use crate::analysis::Analyzer;

/// Period covered by the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
}

/// Computed summary data.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub period: Period,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub activity: Option<ActivitySummary>,
    pub hours: Vec<WindowSummary>,
}

pub fn generate_summary_data<Tz: TimeZone>(
    db: &Database,
    analyzer: &Analyzer<Tz>,
    period: Period,
    now: DateTime<Utc>,
) -> Result<SummaryData> {
    let start = match period {
        Period::Hour => now - Duration::hours(1),
        Period::Day => window_bounds(now, Granularity::Day, analyzer.tz()).0,
    };
    let (activity, hours) = analyzer.activity(db, start, now)?;
    Ok(SummaryData {
        period,
        start,
        end: now,
        activity,
        hours,
    })
}

pub fn format_summary<W, Tz>(writer: &mut W, data: &SummaryData, tz: &Tz) -> std::io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let label = match data.period {
        Period::Hour => "LAST HOUR",
        Period::Day => "TODAY",
    };
    writeln!(
        writer,
        "ACTIVITY {label}: {} to {}",
        format_time(data.start, tz),
        format_time(data.end, tz)
    )?;

    let Some(activity) = &data.activity else {
        writeln!(writer)?;
        writeln!(writer, "No samples recorded in this period.")?;
        writeln!(writer)?;
        writeln!(writer, "Hint: Run 'lb run' to start sampling.")?;
        return Ok(());
    };

    writeln!(writer)?;
    writeln!(writer, "Samples:       {}", activity.sample_count)?;
    writeln!(
        writer,
        "Productivity:  {:.1}/100  {}",
        activity.productivity_score,
        progress_bar(activity.productivity_score, 100.0)
    )?;
    writeln!(writer, "Active:        {}", format_duration(activity.active_secs))?;
    writeln!(writer, "Idle:          {}", format_duration(activity.idle_secs))?;
    writeln!(writer, "Top category:  {}", activity.top_category)?;

    writeln!(writer)?;
    writeln!(writer, "BY HOUR")?;
    writeln!(writer, "───────")?;
    writeln!(writer, "Hour   Samples  Idle  Distracted  Switches  Score")?;
    for hour in &data.hours {
        writeln!(
            writer,
            "{}  {:>7}  {:>4}  {:>10}  {:>8.2}  {:>5.2}",
            hour.window_start.with_timezone(tz).format("%H:%M"),
            hour.sample_count,
            percent(hour.idle_ratio),
            percent(hour.distraction_ratio),
            hour.switch_rate,
            hour.mean_score
        )?;
    }
    Ok(())
}

pub fn run<W, Tz>(
    writer: &mut W,
    db: &Database,
    analyzer: &Analyzer<Tz>,
    period: Period,
    json: bool,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let data = generate_summary_data(db, analyzer, period, Utc::now())?;
    if json {
        write_json(writer, &data)
    } else {
        format_summary(writer, &data, analyzer.tz())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use insta::assert_snapshot;

    use crate::Config;
    use crate::analysis::tests::{day_start, fill};

    fn analyzer() -> Analyzer<Utc> {
        Analyzer::new(Arc::new(Config::default()), Utc)
    }

    fn render(data: &SummaryData) -> String {
        let mut output = Vec::new();
        format_summary(&mut output, data, &Utc).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_day_summary_groups_by_hour() {
        let mut db = Database::open_in_memory().unwrap();
        let start = day_start(6);
        fill(&mut db, start, 60, "Terminal", 60.0);
        fill(&mut db, start + Duration::minutes(60), 15, "Netflix", 1.0);

        let now = start + Duration::minutes(90);
        let data = generate_summary_data(&db, &analyzer(), Period::Day, now).unwrap();
        assert_eq!(data.start, Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap());

        assert_snapshot!(render(&data), @r"
        ACTIVITY TODAY: 2025-01-06 00:00 to 2025-01-06 10:30

        Samples:       75
        Productivity:  82.0/100  ████████░░
        Active:        5m
        Idle:          1m
        Top category:  Work

        BY HOUR
        ───────
        Hour   Samples  Idle  Distracted  Switches  Score
        09:00       60    0%          0%      0.00   1.00
        10:00       15  100%        100%      0.00   0.10
        ");
    }

    #[test]
    fn test_hour_summary_only_reads_last_hour() {
        let mut db = Database::open_in_memory().unwrap();
        let start = day_start(6);
        fill(&mut db, start, 90, "Terminal", 60.0);

        let now = start + Duration::minutes(90);
        let data = generate_summary_data(&db, &analyzer(), Period::Hour, now).unwrap();
        assert_eq!(data.activity.unwrap().sample_count, 60);
        assert_eq!(data.hours.len(), 2);
    }

    #[test]
    fn test_empty_summary() {
        let db = Database::open_in_memory().unwrap();
        let now = day_start(6);
        let data = generate_summary_data(&db, &analyzer(), Period::Hour, now).unwrap();

        assert_snapshot!(render(&data), @r"
        ACTIVITY LAST HOUR: 2025-01-06 08:00 to 2025-01-06 09:00

        No samples recorded in this period.

        Hint: Run 'lb run' to start sampling.
        ");
    }

    #[test]
    fn test_summary_json_output() {
        let db = Database::open_in_memory().unwrap();
        let data = generate_summary_data(&db, &analyzer(), Period::Day, day_start(6)).unwrap();
        let mut output = Vec::new();
        write_json(&mut output, &data).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["period"], "day");
        assert!(value["activity"].is_null());
        assert_eq!(value["hours"], serde_json::json!([]));
    }
}
