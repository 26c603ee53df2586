//! Patterns command: busiest hour and time per category.

use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_core::insights::UsagePatterns;
use lb_db::Database;

use super::util::{progress_bar, write_json};
use crate::analysis::Analyzer;

pub fn format_patterns<W: Write>(writer: &mut W, patterns: &UsagePatterns) -> std::io::Result<()> {
    let Some(hour) = patterns.most_active_hour else {
        writeln!(writer, "No samples recorded in the pattern window.")?;
        return Ok(());
    };
    writeln!(writer, "Most active hour: {hour:02}:00-{:02}:00", (hour + 1) % 24)?;
    writeln!(writer)?;
    writeln!(writer, "BY CATEGORY")?;
    writeln!(writer, "───────────")?;
    for (category, share) in &patterns.category_share {
        writeln!(
            writer,
            "{:<12} {:>5.1}%  {}",
            category.as_str(),
            share,
            progress_bar(*share, 100.0)
        )?;
    }
    Ok(())
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    analyzer: &Analyzer<Tz>,
    json: bool,
) -> Result<()> {
    let patterns = analyzer.patterns(db, Utc::now())?;
    if json {
        write_json(writer, &patterns)
    } else {
        format_patterns(writer, &patterns)?;
        Ok(())
    }
}
