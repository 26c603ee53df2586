//! Reset command: wipe the logs.

use std::io::Write;

use anyhow::Result;
use lb_db::{Database, ResetCounts};

pub fn format_reset<W: Write>(writer: &mut W, counts: &ResetCounts) -> std::io::Result<()> {
    writeln!(writer, "Deleted {} samples.", counts.events)?;
    writeln!(writer, "Deleted {} burnout assessments.", counts.burnout_samples)?;
    writeln!(writer, "Deleted {} alerts.", counts.alerts)
}

/// Truncates all logs when `confirmed`; otherwise only says what would go.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, confirmed: bool) -> Result<()> {
    if !confirmed {
        writeln!(
            writer,
            "This deletes {} samples and every burnout assessment and alert.",
            db.event_count()?
        )?;
        writeln!(writer, "Run 'lb reset --yes' to confirm.")?;
        return Ok(());
    }
    let counts = db.reset_all()?;
    tracing::info!(?counts, "logs reset");
    format_reset(writer, &counts)?;
    Ok(())
}
