//! Status command for showing where data lives and how fresh it is.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::TimeZone;
use lb_db::Database;

use super::util::format_time;
use crate::Config;

pub fn run<W, Tz>(writer: &mut W, db: &Database, config: &Config, tz: &Tz, tz_name: &str) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    writeln!(writer, "LoopBreak status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Timezone: {tz_name}")?;
    writeln!(
        writer,
        "Sampling every {}s, idle below {}% load",
        config.sample_interval_secs, config.idle_threshold
    )?;

    let count = db.event_count()?;
    let Some(last) = db.last_event_time()? else {
        writeln!(writer, "No samples recorded.")?;
        return Ok(());
    };
    writeln!(writer, "Samples: {count} (last at {})", format_time(last, tz))?;

    match db.last_burnout_sample()? {
        Some(sample) => writeln!(
            writer,
            "Last burnout assessment: {:.1} ({}) at {}",
            sample.burnout_index,
            sample.status_band.as_str().to_lowercase(),
            format_time(sample.timestamp, tz)
        )?,
        None => writeln!(writer, "Last burnout assessment: none")?,
    }

    match db.recent_alerts(1)?.first() {
        Some(alert) => writeln!(
            writer,
            "Last alert: [{}] at {}",
            alert.channel,
            format_time(alert.timestamp, tz)
        )?,
        None => writeln!(writer, "Last alert: none")?,
    }

    Ok(())
}
