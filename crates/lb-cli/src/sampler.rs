//! Periodic activity sampler.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use lb_core::{Classifier, EventRecord, UNKNOWN_TITLE};
use lb_db::{DbError, DbWorker};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::Config;
use crate::probe::ActivityProbe;

/// Turns probe readings into scored samples and appends them to the event log.
pub struct Sampler {
    probe: Arc<dyn ActivityProbe>,
    classifier: Classifier,
    idle_threshold: f64,
    probe_timeout: Duration,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Sampler {
    pub fn new(probe: Arc<dyn ActivityProbe>, config: &Config) -> Self {
        Self {
            probe,
            classifier: Classifier::new(&config.classifier),
            idle_threshold: config.idle_threshold,
            probe_timeout: config.probe_timeout(),
            last_timestamp: None,
        }
    }

    /// Never stamps a sample earlier than `last`, e.g. the newest logged event.
    #[must_use]
    pub fn resume_after(mut self, last: Option<DateTime<Utc>>) -> Self {
        self.last_timestamp = last;
        self
    }

    /// Captures one sample at `now`.
    ///
    /// Capture failures never fail the sample: the title falls back to
    /// `"Unknown"` and the load to 0%.
    pub async fn capture(&mut self, now: DateTime<Utc>) -> EventRecord {
        let title = match tokio::time::timeout(self.probe_timeout, self.probe.foreground_title())
            .await
        {
            Ok(Ok(title)) => title,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "foreground window capture failed");
                UNKNOWN_TITLE.to_string()
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.probe_timeout, "foreground window capture timed out");
                UNKNOWN_TITLE.to_string()
            }
        };
        let load = match tokio::time::timeout(self.probe_timeout, self.probe.load_percent()).await
        {
            Ok(Ok(load)) => load,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "load capture failed");
                0.0
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.probe_timeout, "load capture timed out");
                0.0
            }
        };

        let mut timestamp = now.trunc_subsecs(0);
        if let Some(last) = self.last_timestamp {
            timestamp = timestamp.max(last);
        }
        self.last_timestamp = Some(timestamp);

        EventRecord::from_reading(timestamp, title, load, self.idle_threshold, &self.classifier)
    }

    /// Captures one sample and appends it to `db`.
    pub async fn tick(&mut self, db: &DbWorker, now: DateTime<Utc>) -> Result<EventRecord, DbError> {
        let record = self.capture(now).await;
        db.execute(move |db| db.append_event(&record).map(|()| record))
            .await
    }

    /// Samples every `interval` until `cancel` fires.
    ///
    /// Append failures are logged and the loop keeps going.
    pub async fn run(mut self, db: DbWorker, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval = ?interval, "sampler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.tick(&db, Utc::now()).await {
                        Ok(record) => tracing::debug!(
                            title = %record.window_title,
                            status = %record.status,
                            load = record.load_pct,
                            score = record.score,
                            "sample recorded"
                        ),
                        Err(err) => tracing::error!(error = %err, "failed to record sample"),
                    }
                }
                () = cancel.cancelled() => {
                    tracing::info!("sampler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use lb_core::ActivityStatus;
    use lb_db::Database;

    use crate::probe::CaptureError;

    /// Probe returning fixed readings, optionally failing or stalling.
    pub struct FakeProbe {
        pub title: Option<&'static str>,
        pub load: f64,
        pub stall: Option<Duration>,
        /// Title captures attempted so far.
        pub calls: AtomicUsize,
    }

    impl FakeProbe {
        pub const fn new(title: &'static str, load: f64) -> Self {
            Self {
                title: Some(title),
                load,
                stall: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub const fn failing(load: f64) -> Self {
            Self {
                title: None,
                load,
                stall: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ActivityProbe for FakeProbe {
        async fn foreground_title(&self) -> Result<String, CaptureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            self.title
                .map(str::to_string)
                .ok_or(CaptureError::NoWindow)
        }

        async fn load_percent(&self) -> Result<f64, CaptureError> {
            Ok(self.load)
        }
    }

    fn config() -> Config {
        Config {
            probe_timeout_secs: 1,
            ..Config::default()
        }
    }

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, second).unwrap()
    }

    #[tokio::test]
    async fn capture_scores_reading() {
        let mut sampler = Sampler::new(Arc::new(FakeProbe::new("Terminal", 15.0)), &config());
        let record = sampler.capture(at(0)).await;
        assert_eq!(record.window_title, "Terminal");
        assert_eq!(record.status, ActivityStatus::Active);
        assert!((record.score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn capture_failure_uses_unknown_title() {
        let mut sampler = Sampler::new(Arc::new(FakeProbe::failing(2.0)), &config());
        let record = sampler.capture(at(0)).await;
        assert_eq!(record.window_title, UNKNOWN_TITLE);
        assert_eq!(record.status, ActivityStatus::Idle);
        assert!((record.score - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stalled_probe_times_out() {
        let probe = FakeProbe {
            stall: Some(Duration::from_secs(30)),
            ..FakeProbe::new("Terminal", 20.0)
        };
        let mut sampler = Sampler::new(Arc::new(probe), &config());
        let record = sampler.capture(at(0)).await;
        assert_eq!(record.window_title, UNKNOWN_TITLE);
    }

    #[tokio::test]
    async fn timestamps_never_go_backwards() {
        let mut sampler = Sampler::new(Arc::new(FakeProbe::new("Terminal", 20.0)), &config())
            .resume_after(Some(at(5)));
        let db = DbWorker::open_in_memory().unwrap();

        let first = sampler.tick(&db, at(3)).await.unwrap();
        assert_eq!(first.timestamp, at(5));
        let second = sampler
            .tick(&db, at(7) + chrono::Duration::milliseconds(900))
            .await
            .unwrap();
        assert_eq!(second.timestamp, at(7));
        let third = sampler.tick(&db, at(6)).await.unwrap();
        assert_eq!(third.timestamp, at(7));
        assert_eq!(db.execute(|db| db.event_count()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loopbreak.db");
        let db = DbWorker::open(&path).unwrap();
        let sampler = Sampler::new(Arc::new(FakeProbe::new("Terminal", 20.0)), &config());

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sampler.run(db, Duration::from_millis(10), cancel.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();

        let db = Database::open(&path).unwrap();
        assert!(db.event_count().unwrap() >= 1);
    }

    #[tokio::test]
    async fn run_keeps_going_through_failures() {
        let db = DbWorker::open_in_memory().unwrap();
        // A row from the future makes every append fail as out of order.
        let future = EventRecord::from_reading(
            Utc::now().trunc_subsecs(0) + chrono::Duration::days(365),
            "Terminal",
            20.0,
            5.0,
            &Classifier::default(),
        );
        db.execute(move |db| db.append_event(&future)).await.unwrap();

        let probe = Arc::new(FakeProbe::failing(2.0));
        let sampler = Sampler::new(Arc::clone(&probe) as Arc<dyn ActivityProbe>, &config());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sampler.run(db.clone(), Duration::from_millis(10), cancel.clone()));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!handle.is_finished());
        cancel.cancel();
        handle.await.unwrap();

        assert!(probe.calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(db.execute(|db| db.event_count()).await.unwrap(), 1);
    }
}
