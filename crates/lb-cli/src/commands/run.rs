//! Run command: sample and analyze in the foreground until Ctrl-C.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::TimeZone;
use fs2::FileExt;

use crate::analysis::Analyzer;
use crate::probe::SystemProbe;
use crate::scheduler::Scheduler;

/// Takes the exclusive sampler lock at `path`.
///
/// The lock is held for as long as the returned file stays open.
pub fn acquire_lock(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .with_context(|| format!("failed to open lock file {}", path.display()))?;
    file.try_lock_exclusive().with_context(|| {
        format!(
            "another sampler already holds {}; stop it before starting a new one",
            path.display()
        )
    })?;
    Ok(file)
}

pub async fn run<Tz>(analyzer: Analyzer<Tz>) -> Result<()>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    let config = analyzer.config().clone();
    let _lock = acquire_lock(&config.lock_path())?;

    let notifier = config
        .notifier
        .build(config.notifier_timeout())
        .context("failed to set up notifier")?;
    let probe = SystemProbe::new(config.probe_timeout());

    let scheduler = Scheduler::start(analyzer, Arc::new(probe), Arc::from(notifier))
        .await
        .context("failed to start sampler")?;
    println!(
        "Sampling every {}s into {}. Press Ctrl-C to stop.",
        config.sample_interval_secs,
        config.database_path.display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("interrupt received, shutting down");
    scheduler.shutdown().await;
    Ok(())
}
