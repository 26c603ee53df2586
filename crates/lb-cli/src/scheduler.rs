//! Background tasks behind `lb run`.
//!
//! One task samples activity; one task per [`Check`] runs that analysis on its
//! own schedule. Tasks share nothing but the database file: each owns a
//! [`DbWorker`] with its own connection, so a slow analysis never delays
//! sampling and a lock wait never holds a runtime thread.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use lb_db::{DbError, DbWorker};
use lb_notify::Notifier;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::Config;
use crate::analysis::{Analyzer, Check};
use crate::dispatch::AlertDispatcher;
use crate::probe::ActivityProbe;
use crate::sampler::Sampler;

/// Running sampler and analysis tasks.
pub struct Scheduler {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the sampler and every periodic check.
    pub async fn start<Tz>(
        analyzer: Analyzer<Tz>,
        probe: Arc<dyn ActivityProbe>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, DbError>
    where
        Tz: TimeZone + Send + Sync + 'static,
    {
        let config = analyzer.config().clone();
        let cancel = CancellationToken::new();
        let mut tasks = Vec::with_capacity(Check::ALL.len() + 1);

        let db = DbWorker::open(&config.database_path)?;
        let last = db.execute(|db| db.last_event_time()).await?;
        let sampler = Sampler::new(probe, &config).resume_after(last);
        tasks.push(tokio::spawn(sampler.run(
            db,
            config.sample_interval(),
            cancel.clone(),
        )));

        let dispatcher =
            AlertDispatcher::new(notifier, config.cooldown(), config.notifier_timeout());
        for check in Check::ALL {
            let period = config.schedule.period(check);
            let db = DbWorker::open(&config.database_path)?;
            tasks.push(tokio::spawn(run_periodic(
                check,
                period,
                analyzer.clone(),
                db,
                dispatcher.clone(),
                cancel.clone(),
            )));
        }

        tracing::info!(tasks = tasks.len(), "scheduler started");
        Ok(Self { cancel, tasks })
    }

    /// Token that stops every task when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops all tasks and waits for them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "background task panicked");
            }
        }
        tracing::info!("scheduler stopped");
    }
}

/// Runs `check` every `period`, starting one period from now.
async fn run_periodic<Tz>(
    check: Check,
    period: Duration,
    analyzer: Analyzer<Tz>,
    db: DbWorker,
    dispatcher: AlertDispatcher,
    cancel: CancellationToken,
) where
    Tz: TimeZone + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = run_once(check, &analyzer, &db, &dispatcher).await {
                    tracing::error!(channel = check.channel(), error = %err, "periodic check failed");
                }
            }
            () = cancel.cancelled() => break,
        }
    }
}

async fn run_once<Tz>(
    check: Check,
    analyzer: &Analyzer<Tz>,
    db: &DbWorker,
    dispatcher: &AlertDispatcher,
) -> Result<(), DbError>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    let outcome = analyzer.run_check(check, db, dispatcher, Utc::now()).await?;
    tracing::debug!(channel = check.channel(), ?outcome, "periodic check finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use lb_db::Database;

    use crate::dispatch::tests::RecordingNotifier;
    use crate::sampler::tests::FakeProbe;

    #[tokio::test]
    async fn scheduler_samples_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: dir.path().join("loopbreak.db"),
            sample_interval_secs: 1,
            ..Config::default()
        };
        let analyzer = Analyzer::new(Arc::new(config.clone()), Utc);

        let scheduler = Scheduler::start(
            analyzer,
            Arc::new(FakeProbe::new("Terminal", 30.0)),
            Arc::new(RecordingNotifier::default()),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        scheduler.shutdown().await;

        let db = Database::open(&config.database_path).unwrap();
        let events = db.all_events().unwrap();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.window_title == "Terminal"));
        // Checks start one period in; nothing can have fired yet.
        assert!(db.recent_alerts(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_token_stops_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: dir.path().join("loopbreak.db"),
            ..Config::default()
        };
        let analyzer = Analyzer::new(Arc::new(config), Utc);
        let scheduler = Scheduler::start(
            analyzer,
            Arc::new(FakeProbe::new("Terminal", 30.0)),
            Arc::new(RecordingNotifier::default()),
        )
        .await
        .unwrap();

        scheduler.cancel_token().cancel();
        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
            .await
            .unwrap();
    }
}
