//! On-demand analyses over the logs.
//!
//! Each analysis reads the logs, runs one of the `lb_core` passes and returns a
//! report. The only analysis that writes is the burnout assessment, which
//! appends its own audit record. Both the CLI commands and the scheduler go
//! through this module.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use lb_core::alert::{
    MetricTrends, STABLE_TRENDS_MESSAGE, channel, threshold_findings, trend_findings,
};
use lb_core::forecast::forecast;
use lb_core::insights::{
    ActivitySummary, DailyComparison, UsagePatterns, activity_summary, compare_days,
    usage_patterns,
};
use lb_core::suggest::{Suggestion, suggest_from_history};
use lb_core::summary::metric_series;
use lb_core::{
    AlertOutcome, AnomalyReport, BurnoutSample, Classifier, Forecast, Granularity, Severity,
    StatusBand, WindowSummary, burnout, detect_anomalies, detect_trend, summarize, summarize_span,
};
use lb_db::{Database, DbError, DbWorker};
use serde::Serialize;

use crate::Config;
use crate::dispatch::AlertDispatcher;

/// Threshold breaches over the recent alert window.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdReport {
    /// `None` when no samples fell in the window.
    pub window: Option<WindowSummary>,
    pub findings: Vec<&'static str>,
}

/// Direction of each metric over recent daily summaries.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub days: Vec<WindowSummary>,
    pub trends: MetricTrends,
    pub findings: Vec<&'static str>,
}

/// An anomalous sample.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedSample {
    pub timestamp: DateTime<Utc>,
    pub window_title: String,
    pub score: f64,
    pub z: f64,
}

/// Z-score outliers among recent sample scores.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalySummary {
    pub sample_count: usize,
    pub report: AnomalyReport,
    /// Anomalous samples, lowest score first.
    pub flagged: Vec<FlaggedSample>,
}

impl AnomalySummary {
    /// Anomalies on the low side of the mean.
    pub fn low_count(&self) -> usize {
        self.flagged.iter().filter(|s| s.z < 0.0).count()
    }
}

/// Result of a burnout assessment.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BurnoutReport {
    /// No samples in the lookback window; nothing was recorded.
    InsufficientData,
    Assessed {
        sample: BurnoutSample,
        /// Threshold breaches of the assessed window.
        flags: Vec<&'static str>,
    },
}

/// An alert raised by a check and what became of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckAlert {
    pub message: String,
    pub outcome: AlertOutcome,
}

/// Periodic analyses that may raise an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Threshold,
    Trend,
    Anomaly,
    Burnout,
    Forecast,
    Suggestion,
}

impl Check {
    pub const ALL: [Self; 6] = [
        Self::Threshold,
        Self::Trend,
        Self::Anomaly,
        Self::Burnout,
        Self::Forecast,
        Self::Suggestion,
    ];

    /// Cooldown channel of the check's alerts.
    pub const fn channel(self) -> &'static str {
        match self {
            Self::Threshold => channel::THRESHOLD,
            Self::Trend => channel::TREND,
            Self::Anomaly => channel::ANOMALY,
            Self::Burnout => channel::BURNOUT,
            Self::Forecast => channel::FORECAST,
            Self::Suggestion => channel::SUGGESTION,
        }
    }

    /// Component name recorded with the check's alerts.
    pub const fn source(self) -> &'static str {
        match self {
            Self::Threshold => "threshold_check",
            Self::Trend => "trend_detector",
            Self::Anomaly => "anomaly_detector",
            Self::Burnout => "burnout_index",
            Self::Forecast => "forecaster",
            Self::Suggestion => "suggestion_engine",
        }
    }
}

/// Runs analyses with one configuration, bucketing days and hours in `tz`.
#[derive(Clone)]
pub struct Analyzer<Tz: TimeZone> {
    config: Arc<Config>,
    classifier: Classifier,
    tz: Tz,
}

impl<Tz: TimeZone> Analyzer<Tz> {
    pub fn new(config: Arc<Config>, tz: Tz) -> Self {
        let classifier = Classifier::new(&config.classifier);
        Self {
            config,
            classifier,
            tz,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Time zone used for day and hour buckets.
    pub const fn tz(&self) -> &Tz {
        &self.tz
    }

    /// Summary of `[now - lookback, now)` as one window.
    fn recent_window(
        &self,
        db: &Database,
        lookback: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<Option<WindowSummary>, DbError> {
        let start = since(now, lookback);
        let records = db.read_events(start, now)?;
        Ok(summarize_span(&records, &self.classifier, start, now))
    }

    /// Daily summaries of the last `days` days.
    pub fn daily_summaries(
        &self,
        db: &Database,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<WindowSummary>, DbError> {
        let records = db.read_events(since(now, Duration::try_days(days)), now)?;
        Ok(summarize(
            &records,
            &self.classifier,
            Granularity::Day,
            &self.tz,
        ))
    }

    /// Checks the last `alerts.lookback_hours` against the alert thresholds.
    pub fn threshold_report(
        &self,
        db: &Database,
        now: DateTime<Utc>,
    ) -> Result<ThresholdReport, DbError> {
        let alerts = &self.config.alerts;
        let window = self.recent_window(db, Duration::try_hours(alerts.lookback_hours), now)?;
        let findings = window
            .as_ref()
            .map(|w| threshold_findings(w, &alerts.thresholds))
            .unwrap_or_default();
        Ok(ThresholdReport { window, findings })
    }

    /// Fits trends over the last `trend.lookback_days` daily summaries.
    pub fn trend_report(&self, db: &Database, now: DateTime<Utc>) -> Result<TrendReport, DbError> {
        let settings = &self.config.trend;
        let days = self.daily_summaries(db, settings.lookback_days, now)?;
        let trend = |metric: fn(&WindowSummary) -> f64| {
            detect_trend(&metric_series(&days, metric), &settings.detector)
        };
        let trends = MetricTrends {
            idle_ratio: trend(|s| s.idle_ratio),
            distraction_ratio: trend(|s| s.distraction_ratio),
            switch_rate: trend(|s| s.switch_rate),
            mean_score: trend(|s| s.mean_score),
        };
        let findings = trend_findings(&trends);
        Ok(TrendReport {
            days,
            trends,
            findings,
        })
    }

    /// Scores every sample of the last `anomaly.lookback_hours` against the others.
    pub fn anomaly_summary(
        &self,
        db: &Database,
        now: DateTime<Utc>,
    ) -> Result<AnomalySummary, DbError> {
        let settings = &self.config.anomaly;
        let start = since(now, Duration::try_hours(settings.lookback_hours));
        let records = db.read_events(start, now)?;
        let scores: Vec<f64> = records.iter().map(|r| r.score).collect();
        let report = detect_anomalies(&scores, settings.z_threshold);

        let mut flagged: Vec<FlaggedSample> = report
            .anomalies()
            .filter_map(|point| {
                records.get(point.index).map(|record| FlaggedSample {
                    timestamp: record.timestamp,
                    window_title: record.window_title.clone(),
                    score: record.score,
                    z: point.z,
                })
            })
            .collect();
        flagged.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.timestamp.cmp(&b.timestamp)));

        Ok(AnomalySummary {
            sample_count: records.len(),
            report,
            flagged,
        })
    }

    /// Assesses the last `burnout.lookback_hours` and appends the assessment to the
    /// burnout log.
    pub fn burnout_report(
        &self,
        db: &mut Database,
        now: DateTime<Utc>,
    ) -> Result<BurnoutReport, DbError> {
        let lookback = Duration::try_hours(self.config.burnout.lookback_hours);
        let Some(window) = self.recent_window(db, lookback, now)? else {
            return Ok(BurnoutReport::InsufficientData);
        };
        let assessment = burnout::compute(&window, &self.config.burnout);
        let sample = BurnoutSample::new(now, &window, assessment);
        db.append_burnout_sample(&sample)?;
        tracing::info!(
            index = sample.burnout_index,
            band = %sample.status_band,
            "burnout assessment recorded"
        );
        Ok(BurnoutReport::Assessed {
            sample,
            flags: threshold_findings(&window, &self.config.alerts.thresholds),
        })
    }

    /// Forecasts from the daily summaries of the whole log.
    ///
    /// Every recorded day counts towards `forecast.min_history`; the estimate
    /// itself averages only the last `forecast.window` of them.
    pub fn forecast_report(&self, db: &Database, now: DateTime<Utc>) -> Result<Forecast, DbError> {
        let records = db.read_events(DateTime::<Utc>::UNIX_EPOCH, now)?;
        let history = summarize(&records, &self.classifier, Granularity::Day, &self.tz);
        Ok(forecast(&history, &self.config.forecast))
    }

    /// Suggestions from the burnout assessments of the last few days.
    pub fn suggestions(&self, db: &Database, now: DateTime<Utc>) -> Result<Vec<Suggestion>, DbError> {
        let config = &self.config.suggestions;
        let samples = db.burnout_samples_since(since(now, Duration::try_days(config.lookback_days)))?;
        Ok(suggest_from_history(&samples, config))
    }

    /// Activity totals for `[start, now)` with per-hour windows.
    pub fn activity(
        &self,
        db: &Database,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(Option<ActivitySummary>, Vec<WindowSummary>), DbError> {
        let records = db.read_events(start, now)?;
        let summary = activity_summary(&records, &self.classifier, self.config.sample_interval_secs);
        let hours = summarize(&records, &self.classifier, Granularity::Hour, &self.tz);
        Ok((summary, hours))
    }

    /// Day-over-day change of the mean score over the trend lookback.
    pub fn comparison(&self, db: &Database, now: DateTime<Utc>) -> Result<DailyComparison, DbError> {
        let days = self.daily_summaries(db, self.config.trend.lookback_days, now)?;
        Ok(compare_days(&days))
    }

    /// Usage patterns over the trend lookback.
    pub fn patterns(&self, db: &Database, now: DateTime<Utc>) -> Result<UsagePatterns, DbError> {
        let start = since(now, Duration::try_days(self.config.trend.lookback_days));
        let records = db.read_events(start, now)?;
        Ok(usage_patterns(&records, &self.classifier, &self.tz))
    }

    /// Runs `check` and returns the alert it raises, if any.
    pub fn alert_message(
        &self,
        check: Check,
        db: &mut Database,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, DbError> {
        Ok(match check {
            Check::Threshold => {
                let report = self.threshold_report(db, now)?;
                join_findings(&report.findings)
            }
            Check::Trend => {
                let report = self.trend_report(db, now)?;
                let findings: Vec<&str> = report
                    .findings
                    .into_iter()
                    .filter(|f| *f != STABLE_TRENDS_MESSAGE)
                    .collect();
                join_findings(&findings)
            }
            Check::Anomaly => {
                let summary = self.anomaly_summary(db, now)?;
                let low = summary.low_count();
                (low > 0).then(|| {
                    format!(
                        "{low} unusually low productivity samples in the last {}h.",
                        self.config.anomaly.lookback_hours
                    )
                })
            }
            Check::Burnout => match self.burnout_report(db, now)? {
                BurnoutReport::Assessed { sample, .. } if sample.status_band == StatusBand::High => {
                    Some(format!(
                        "Burnout risk is high (index {:.1}). Consider taking a break.",
                        sample.burnout_index
                    ))
                }
                _ => None,
            },
            Check::Forecast => match self.forecast_report(db, now)? {
                Forecast::Estimate {
                    days_estimate,
                    severity: Severity::Immediate,
                    ..
                } => Some(format!(
                    "Burnout is imminent: about {days_estimate} days at the current pace."
                )),
                Forecast::Estimate {
                    days_estimate,
                    severity: Severity::Warning,
                    ..
                } => Some(format!(
                    "Burnout risk is rising: about {days_estimate} days at the current pace."
                )),
                _ => None,
            },
            Check::Suggestion => self
                .suggestions(db, now)?
                .into_iter()
                .next()
                .map(|s| s.message),
        })
    }
}

impl<Tz> Analyzer<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
{
    /// Runs `check` on the database worker and sends its alert through `dispatcher`.
    ///
    /// Returns `None` when the check found nothing worth an alert.
    pub async fn run_check(
        &self,
        check: Check,
        db: &DbWorker,
        dispatcher: &AlertDispatcher,
        now: DateTime<Utc>,
    ) -> Result<Option<CheckAlert>, DbError> {
        let analyzer = self.clone();
        let message = db
            .execute(move |db| analyzer.alert_message(check, db, now))
            .await?;
        let Some(message) = message else {
            tracing::debug!(channel = check.channel(), "check found nothing to report");
            return Ok(None);
        };
        let outcome = dispatcher
            .maybe_fire(db, &message, check.channel(), check.source(), now)
            .await?;
        Ok(Some(CheckAlert { message, outcome }))
    }
}

/// `now - span`, clamped to the Unix epoch when the span is out of range.
fn since(now: DateTime<Utc>, span: Option<Duration>) -> DateTime<Utc> {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    span.and_then(|span| now.checked_sub_signed(span))
        .map_or(epoch, |start| start.max(epoch))
}

fn join_findings(findings: &[&str]) -> Option<String> {
    (!findings.is_empty()).then(|| findings.join("\n"))
}
