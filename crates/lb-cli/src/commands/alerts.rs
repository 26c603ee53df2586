//! Alerts command: run a check on demand or list the alert log.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_core::{AlertOutcome, AlertRecord};
use lb_db::{Database, DbWorker};

use super::util::{format_time, write_json};
use crate::analysis::{Analyzer, Check, CheckAlert};
use crate::dispatch::AlertDispatcher;

pub fn format_alert_log<W, Tz>(writer: &mut W, alerts: &[AlertRecord], tz: &Tz) -> std::io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if alerts.is_empty() {
        writeln!(writer, "No alerts recorded.")?;
        return Ok(());
    }
    for alert in alerts {
        writeln!(
            writer,
            "{}  {:<10}  {}",
            format_time(alert.timestamp, tz),
            alert.channel,
            alert.message.replace('\n', " ")
        )?;
    }
    Ok(())
}

pub fn format_check<W: Write>(
    writer: &mut W,
    check: Check,
    result: Option<&CheckAlert>,
) -> std::io::Result<()> {
    match result {
        None => writeln!(writer, "[{}] nothing to report.", check.channel()),
        Some(CheckAlert {
            outcome: AlertOutcome::Suppressed,
            message,
        }) => {
            writeln!(writer, "[{}] suppressed by cooldown:", check.channel())?;
            writeln!(writer, "{message}")
        }
        Some(CheckAlert {
            outcome: AlertOutcome::Fired,
            message,
        }) => {
            writeln!(writer, "[{}] alert sent:", check.channel())?;
            writeln!(writer, "{message}")
        }
    }
}

/// Runs `check` now and dispatches its alert.
pub async fn run_check<W, Tz>(
    writer: &mut W,
    db: &DbWorker,
    analyzer: &Analyzer<Tz>,
    dispatcher: &AlertDispatcher,
    check: Check,
    json: bool,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone + Send + Sync + 'static,
{
    let result = analyzer.run_check(check, db, dispatcher, Utc::now()).await?;
    if json {
        write_json(writer, &result)
    } else {
        format_check(writer, check, result.as_ref())?;
        Ok(())
    }
}

/// Lists the newest `limit` alerts.
pub fn list<W, Tz>(writer: &mut W, db: &Database, tz: &Tz, limit: usize, json: bool) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let alerts = db.recent_alerts(limit)?;
    if json {
        write_json(writer, &alerts)
    } else {
        format_alert_log(writer, &alerts, tz)?;
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
    use crate::analysis::tests::{day_start, fill_worker};
    use crate::dispatch::tests::RecordingNotifier;

    fn alert(minute: i64, channel: &str, message: &str) -> AlertRecord {
        AlertRecord {
            timestamp: day_start(6) + Duration::minutes(minute),
            message: message.to_string(),
            channel: channel.to_string(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_alert_log_newest_first() {
        let mut db = Database::open_in_memory().unwrap();
        db.append_alert(&alert(0, "threshold", "High idle time detected.\nYour productivity score is low."))
            .unwrap();
        db.append_alert(&alert(30, "burnout", "Burnout risk is high (index 20.0). Consider taking a break."))
            .unwrap();

        let mut output = Vec::new();
        list(&mut output, &db, &Utc, 10, false).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        2025-01-06 09:30  burnout     Burnout risk is high (index 20.0). Consider taking a break.
        2025-01-06 09:00  threshold   High idle time detected. Your productivity score is low.
        ");
    }

    #[test]
    fn test_empty_alert_log() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        list(&mut output, &db, &Utc, 10, false).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"No alerts recorded.");
    }

    #[tokio::test]
    async fn test_run_check_reports_outcome() {
        let db = DbWorker::open_in_memory().unwrap();
        let now = Utc::now();
        fill_worker(&db, now - Duration::minutes(90), 60, "Netflix", 1.0).await;

        let analyzer = Analyzer::new(Arc::new(Config::default()), Utc);
        let dispatcher = AlertDispatcher::new(
            Arc::new(RecordingNotifier::default()),
            chrono::Duration::minutes(60),
            std::time::Duration::from_secs(1),
        );

        let mut first = Vec::new();
        run_check(&mut first, &db, &analyzer, &dispatcher, Check::Threshold, false)
            .await
            .unwrap();
        let mut second = Vec::new();
        run_check(&mut second, &db, &analyzer, &dispatcher, Check::Threshold, false)
            .await
            .unwrap();

        let first = String::from_utf8(first).unwrap();
        assert!(first.starts_with("[threshold] alert sent:\nHigh idle time detected.\n"));
        let second = String::from_utf8(second).unwrap();
        assert!(second.starts_with("[threshold] suppressed by cooldown:\n"));
        let alerts = db.execute(|db| db.recent_alerts(10)).await.unwrap();
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn test_format_check_nothing_to_report() {
        let mut output = Vec::new();
        format_check(&mut output, Check::Forecast, None).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"[forecast] nothing to report.");
    }
}
