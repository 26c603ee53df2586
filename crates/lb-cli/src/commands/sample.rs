//! Sample command: capture one reading and log it.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use lb_core::EventRecord;
use lb_db::DbWorker;

use crate::Config;
use crate::probe::{ActivityProbe, SystemProbe};
use crate::sampler::Sampler;

pub fn format_sample<W: Write>(writer: &mut W, record: &EventRecord) -> std::io::Result<()> {
    writeln!(
        writer,
        "Recorded {} ({}, load {:.1}%, score {:.2})",
        record.window_title,
        record.status.as_str().to_lowercase(),
        record.load_pct,
        record.score
    )
}

pub async fn run<W: Write>(writer: &mut W, db: &DbWorker, config: &Config) -> Result<()> {
    let probe = SystemProbe::new(config.probe_timeout());
    // The first load reading needs a baseline interval.
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    record_one(writer, db, config, Arc::new(probe)).await
}

async fn record_one<W: Write>(
    writer: &mut W,
    db: &DbWorker,
    config: &Config,
    probe: Arc<dyn ActivityProbe>,
) -> Result<()> {
    let last = db.execute(|db| db.last_event_time()).await?;
    let mut sampler = Sampler::new(probe, config).resume_after(last);
    let record = sampler
        .tick(db, Utc::now())
        .await
        .context("failed to record sample")?;
    format_sample(writer, &record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;
    use lb_core::Classifier;

    use crate::sampler::tests::FakeProbe;

    #[test]
    fn test_format_sample() {
        let record = EventRecord::from_reading(
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
            "Terminal",
            15.0,
            5.0,
            &Classifier::default(),
        );
        let mut output = Vec::new();
        format_sample(&mut output, &record).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"Recorded Terminal (active, load 15.0%, score 0.80)");
    }

    #[tokio::test]
    async fn record_one_appends_to_log() {
        let db = DbWorker::open_in_memory().unwrap();
        let mut output = Vec::new();
        record_one(
            &mut output,
            &db,
            &Config::default(),
            Arc::new(FakeProbe::new("Netflix", 1.0)),
        )
        .await
        .unwrap();

        assert_eq!(db.execute(|db| db.event_count()).await.unwrap(), 1);
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Recorded Netflix (idle"));
    }
}
