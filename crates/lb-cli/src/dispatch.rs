//! Alert dispatch with per-channel cooldown.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lb_core::{AlertOutcome, AlertRecord, cooldown_elapsed};
use lb_db::{DbError, DbWorker};
use lb_notify::Notifier;

/// Title shown on every notification.
const NOTIFICATION_TITLE: &str = "LoopBreak";

/// Decides whether a finding is surfaced, records it and forwards it.
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    cooldown: chrono::Duration,
    timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, cooldown: chrono::Duration, timeout: Duration) -> Self {
        Self {
            notifier,
            cooldown,
            timeout,
        }
    }

    /// Fires `message` on `channel` unless an alert fired there within the cooldown.
    ///
    /// A suppressed alert is not recorded. A fired alert is recorded before it is
    /// delivered, and delivery failures are only logged: the result is still
    /// [`AlertOutcome::Fired`]. The cooldown lookup and the append run as one
    /// call on the database worker.
    pub async fn maybe_fire(
        &self,
        db: &DbWorker,
        message: &str,
        channel: &str,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<AlertOutcome, DbError> {
        let record = AlertRecord {
            timestamp: now,
            message: message.to_string(),
            channel: channel.to_string(),
            source: source.to_string(),
        };
        let cooldown = self.cooldown;
        let outcome = db
            .execute(move |db| {
                let last = db.last_alert_time(&record.channel)?;
                if !cooldown_elapsed(last, now, cooldown) {
                    tracing::debug!(
                        channel = %record.channel,
                        ?last,
                        "alert suppressed by cooldown"
                    );
                    return Ok(AlertOutcome::Suppressed);
                }
                db.append_alert(&record)?;
                Ok(AlertOutcome::Fired)
            })
            .await?;
        if outcome == AlertOutcome::Suppressed {
            return Ok(outcome);
        }
        tracing::info!(channel, source, message, "alert fired");

        match tokio::time::timeout(self.timeout, self.notifier.notify(NOTIFICATION_TITLE, message))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(channel, error = %err, "failed to deliver alert"),
            Err(_) => tracing::warn!(channel, timeout = ?self.timeout, "alert delivery timed out"),
        }
        Ok(AlertOutcome::Fired)
    }
}
