//! Compare command: day-over-day productivity.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_core::insights::DailyComparison;
use lb_db::Database;

use super::util::{format_date, progress_bar, write_json};
use crate::analysis::Analyzer;

pub fn format_comparison<W, Tz>(writer: &mut W, comparison: &DailyComparison, tz: &Tz) -> std::io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if comparison.days.is_empty() {
        writeln!(writer, "No samples recorded in the comparison window.")?;
        return Ok(());
    }

    writeln!(writer, "Day             Score  Change")?;
    for day in &comparison.days {
        let change = day
            .delta
            .map_or_else(|| "-".to_string(), |delta| format!("{delta:+.2}"));
        writeln!(
            writer,
            "{}  {:>5.2}  {:>6}  {}",
            format_date(day.day_start, tz),
            day.mean_score,
            change,
            progress_bar(day.mean_score, 1.0)
        )?;
    }

    if let Some(best) = &comparison.largest_increase {
        writeln!(writer)?;
        writeln!(writer, "Best improvement: {}", format_date(best.day_start, tz))?;
    }
    if let Some(worst) = &comparison.largest_drop {
        writeln!(writer, "Largest drop:     {}", format_date(worst.day_start, tz))?;
    }
    Ok(())
}

pub fn run<W, Tz>(writer: &mut W, db: &Database, analyzer: &Analyzer<Tz>, json: bool) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let comparison = analyzer.comparison(db, Utc::now())?;
    if json {
        write_json(writer, &comparison)
    } else {
        format_comparison(writer, &comparison, analyzer.tz())?;
        Ok(())
    }
}
