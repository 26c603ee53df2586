//! Burnout command: assess the recent window and record the result.

use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_db::Database;

use super::util::{percent, progress_bar, write_json};
use crate::analysis::{Analyzer, BurnoutReport};

pub fn format_burnout<W: Write>(
    writer: &mut W,
    report: &BurnoutReport,
    lookback_hours: i64,
) -> std::io::Result<()> {
    let BurnoutReport::Assessed { sample, flags } = report else {
        writeln!(
            writer,
            "No samples in the last {lookback_hours} hours; nothing assessed."
        )?;
        return Ok(());
    };

    writeln!(
        writer,
        "BURNOUT INDEX: {:.1}/100  {}  ({} risk)",
        sample.burnout_index,
        progress_bar(sample.burnout_index, 100.0),
        sample.status_band.as_str().to_lowercase()
    )?;
    writeln!(writer)?;
    writeln!(writer, "Idle ratio:         {}", percent(sample.idle_ratio))?;
    writeln!(writer, "Distraction ratio:  {}", percent(sample.distraction_ratio))?;
    writeln!(writer, "Switch rate:        {:.2}", sample.switch_rate)?;
    writeln!(writer, "Mean score:         {:.2}", sample.mean_score)?;

    if !flags.is_empty() {
        writeln!(writer)?;
        for flag in flags {
            writeln!(writer, "- {flag}")?;
        }
    }
    Ok(())
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &mut Database,
    analyzer: &Analyzer<Tz>,
    json: bool,
) -> Result<()> {
    let report = analyzer.burnout_report(db, Utc::now())?;
    if json {
        write_json(writer, &report)
    } else {
        format_burnout(writer, &report, analyzer.config().burnout.lookback_hours)?;
        Ok(())
    }
}
