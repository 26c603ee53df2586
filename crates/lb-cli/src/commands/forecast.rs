//! Forecast command: days left before burnout at the current pace.

use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_core::{Forecast, Severity};
use lb_db::Database;

use super::util::{percent, progress_bar, write_json};
use crate::analysis::Analyzer;

const fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Immediate => "burnout is imminent",
        Severity::Warning => "risk is building",
        Severity::Stable => "stable",
    }
}

pub fn format_forecast<W: Write>(writer: &mut W, forecast: &Forecast) -> std::io::Result<()> {
    match forecast {
        Forecast::InsufficientData {
            available,
            required,
        } => writeln!(
            writer,
            "Not enough history to forecast: {available} of {required} days recorded."
        ),
        Forecast::Estimate {
            risk,
            days_estimate,
            severity,
        } => {
            writeln!(
                writer,
                "Risk:              {:>4}  {}",
                percent(*risk),
                progress_bar(*risk, 1.0)
            )?;
            writeln!(writer, "Days to burnout:   {days_estimate:>4}")?;
            writeln!(writer, "Outlook:           {}", severity_label(*severity))
        }
    }
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    analyzer: &Analyzer<Tz>,
    json: bool,
) -> Result<()> {
    let forecast = analyzer.forecast_report(db, Utc::now())?;
    if json {
        write_json(writer, &forecast)
    } else {
        format_forecast(writer, &forecast)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn render(forecast: &Forecast) -> String {
        let mut output = Vec::new();
        format_forecast(&mut output, forecast).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_forecast_estimate() {
        let forecast = Forecast::Estimate {
            risk: 0.62,
            days_estimate: 5,
            severity: Severity::Warning,
        };
        assert_snapshot!(render(&forecast), @r"
        Risk:               62%  ██████░░░░
        Days to burnout:      5
        Outlook:           risk is building
        ");
    }

    #[test]
    fn test_forecast_insufficient_history() {
        let forecast = Forecast::InsufficientData {
            available: 2,
            required: 5,
        };
        assert_snapshot!(
            render(&forecast),
            @"Not enough history to forecast: 2 of 5 days recorded."
        );
    }

    #[test]
    fn test_forecast_json_is_tagged() {
        let forecast = Forecast::InsufficientData {
            available: 2,
            required: 5,
        };
        let mut output = Vec::new();
        write_json(&mut output, &forecast).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["result"], "insufficient_data");
        assert_eq!(value["available"], 2);
    }
}
