//! Anomalies command: samples whose score stands out from the rest.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_core::AnomalyReport;
use lb_db::Database;

use super::util::{format_time, write_json};
use crate::analysis::{AnomalySummary, Analyzer};

/// Flagged samples listed in text output.
const MAX_LISTED: usize = 10;

pub fn format_anomalies<W, Tz>(
    writer: &mut W,
    summary: &AnomalySummary,
    lookback_hours: i64,
    tz: &Tz,
) -> std::io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    writeln!(writer, "ANOMALIES IN THE LAST {lookback_hours}H")?;
    writeln!(writer)?;

    let AnomalyReport::Scored { mean, std_dev, .. } = &summary.report else {
        writeln!(
            writer,
            "No variation across {} samples; nothing to score.",
            summary.sample_count
        )?;
        return Ok(());
    };
    writeln!(
        writer,
        "Scored {} samples: mean {mean:.2}, std dev {std_dev:.2}",
        summary.sample_count
    )?;

    if summary.flagged.is_empty() {
        writeln!(writer, "No anomalies found.")?;
        return Ok(());
    }

    writeln!(writer)?;
    for sample in summary.flagged.iter().take(MAX_LISTED) {
        writeln!(
            writer,
            "{}  score {:.2}  z {:+.2}  {}",
            format_time(sample.timestamp, tz),
            sample.score,
            sample.z,
            sample.window_title
        )?;
    }
    let remaining = summary.flagged.len().saturating_sub(MAX_LISTED);
    if remaining > 0 {
        writeln!(writer, "... and {remaining} more")?;
    }
    Ok(())
}

pub fn run<W, Tz>(writer: &mut W, db: &Database, analyzer: &Analyzer<Tz>, json: bool) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let summary = analyzer.anomaly_summary(db, Utc::now())?;
    if json {
        write_json(writer, &summary)
    } else {
        format_anomalies(
            writer,
            &summary,
            analyzer.config().anomaly.lookback_hours,
            analyzer.tz(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::Duration;
    use insta::assert_snapshot;

    use crate::Config;
    use crate::analysis::tests::{day_start, fill};

    fn render(db: &Database, now: chrono::DateTime<Utc>) -> String {
        let analyzer = Analyzer::new(Arc::new(Config::default()), Utc);
        let summary = analyzer.anomaly_summary(db, now).unwrap();
        let mut output = Vec::new();
        format_anomalies(&mut output, &summary, 24, &Utc).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_single_outlier_is_listed() {
        let mut db = Database::open_in_memory().unwrap();
        let now = day_start(6) + Duration::hours(1);
        fill(&mut db, now - Duration::minutes(30), 20, "Terminal", 60.0);
        fill(&mut db, now - Duration::minutes(10), 1, "Netflix", 1.0);

        let output = render(&db, now);
        assert!(output.starts_with("ANOMALIES IN THE LAST 24H\n\nScored 21 samples: mean 0.96"));
        assert!(output.contains("2025-01-06 09:50  score 0.10  z -4.36  Netflix"));
    }

    #[test]
    fn test_constant_scores() {
        let mut db = Database::open_in_memory().unwrap();
        let now = day_start(6) + Duration::hours(1);
        fill(&mut db, now - Duration::minutes(30), 5, "Terminal", 60.0);

        assert_snapshot!(render(&db, now), @r"
        ANOMALIES IN THE LAST 24H

        No variation across 5 samples; nothing to score.
        ");
    }
}
