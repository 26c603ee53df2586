//! Trends command: direction of each metric over recent days.

use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_core::Trend;
use lb_db::Database;

use super::util::write_json;
use crate::analysis::{Analyzer, TrendReport};

pub fn format_trends<W: Write>(writer: &mut W, report: &TrendReport, min_points: usize) -> std::io::Result<()> {
    writeln!(writer, "TRENDS OVER {} DAYS", report.days.len())?;
    writeln!(writer)?;

    if report.trends.mean_score == Trend::InsufficientData {
        writeln!(
            writer,
            "Not enough history: {} of {min_points} days needed.",
            report.days.len()
        )?;
        return Ok(());
    }

    let rows = [
        ("Idle ratio", report.trends.idle_ratio),
        ("Distraction ratio", report.trends.distraction_ratio),
        ("Switch rate", report.trends.switch_rate),
        ("Mean score", report.trends.mean_score),
    ];
    for (label, trend) in rows {
        writeln!(writer, "{label:<18} {}", trend.as_str())?;
    }

    writeln!(writer)?;
    for finding in &report.findings {
        writeln!(writer, "{finding}")?;
    }
    Ok(())
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    analyzer: &Analyzer<Tz>,
    json: bool,
) -> Result<()> {
    let report = analyzer.trend_report(db, Utc::now())?;
    if json {
        write_json(writer, &report)
    } else {
        format_trends(writer, &report, analyzer.config().trend.detector.min_points)?;
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

    fn render(db: &Database, now: chrono::DateTime<Utc>) -> String {
        let analyzer = Analyzer::new(Arc::new(Config::default()), Utc);
        let report = analyzer.trend_report(db, now).unwrap();
        let mut output = Vec::new();
        format_trends(&mut output, &report, 3).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_trends_with_falling_productivity() {
        let mut db = Database::open_in_memory().unwrap();
        fill(&mut db, day_start(1), 10, "Terminal", 60.0);
        fill(&mut db, day_start(2), 10, "Notion", 20.0);
        fill(&mut db, day_start(3), 10, "Discord", 20.0);
        fill(&mut db, day_start(4), 10, "Netflix", 1.0);

        assert_snapshot!(render(&db, day_start(5)), @r"
        TRENDS OVER 4 DAYS

        Idle ratio         upward
        Distraction ratio  upward
        Switch rate        stable
        Mean score         downward

        Productivity is falling. Risk of burnout.
        Idle time is rising. Possible disengagement.
        Distractions are increasing.
        ");
    }

    #[test]
    fn test_trends_without_history() {
        let db = Database::open_in_memory().unwrap();
        assert_snapshot!(render(&db, day_start(5)), @r"
        TRENDS OVER 0 DAYS

        Not enough history: 0 of 3 days needed.
        ");
    }
}
