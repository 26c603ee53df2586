//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use lb_core::alert::ThresholdConfig;
use lb_core::anomaly::DEFAULT_Z_THRESHOLD;
use lb_core::suggest::SuggestionConfig;
use lb_core::{BurnoutConfig, ClassifierConfig, ForecastConfig, TrendConfig};
use lb_notify::NotifierConfig;
use serde::{Deserialize, Serialize};

use crate::analysis::Check;

/// Longest history any analysis may look back over.
const MAX_LOOKBACK_DAYS: i64 = 3650;
const MAX_LOOKBACK_HOURS: i64 = MAX_LOOKBACK_DAYS * 24;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Seconds between two activity samples.
    pub sample_interval_secs: u64,
    /// Loads strictly below this percentage count as idle.
    pub idle_threshold: f64,
    /// Upper bound for one probe call.
    pub probe_timeout_secs: u64,
    pub classifier: ClassifierConfig,
    pub burnout: BurnoutConfig,
    pub forecast: ForecastConfig,
    pub trend: TrendSettings,
    pub anomaly: AnomalySettings,
    pub alerts: AlertSettings,
    pub suggestions: SuggestionConfig,
    pub schedule: ScheduleConfig,
    pub notifier: NotifierConfig,
    /// Upper bound for one notifier call.
    pub notifier_timeout_secs: u64,
}

/// Trend detector parameters plus how much history the trend report reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    /// Days of daily summaries fed to the detector.
    pub lookback_days: i64,
    #[serde(flatten)]
    pub detector: TrendConfig,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            lookback_days: 14,
            detector: TrendConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalySettings {
    /// `|z|` above which a sample is anomalous.
    pub z_threshold: f64,
    /// Hours of samples scored by the anomaly pass.
    pub lookback_hours: i64,
}

impl Default for AnomalySettings {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            lookback_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Minimum minutes between two alerts on the same channel.
    pub cooldown_minutes: i64,
    /// Hours of samples checked against the thresholds.
    pub lookback_hours: i64,
    pub thresholds: ThresholdConfig,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            cooldown_minutes: 60,
            lookback_hours: 2,
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// Minutes between runs of each periodic analysis in `lb run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub threshold_minutes: u64,
    pub trend_minutes: u64,
    pub anomaly_minutes: u64,
    pub burnout_minutes: u64,
    pub forecast_minutes: u64,
    pub suggestion_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            threshold_minutes: 10,
            trend_minutes: 60,
            anomaly_minutes: 60,
            burnout_minutes: 60,
            forecast_minutes: 360,
            suggestion_minutes: 360,
        }
    }
}

impl ScheduleConfig {
    /// Time between two runs of `check`, at least one minute.
    pub const fn period(&self, check: Check) -> Duration {
        let minutes = match check {
            Check::Threshold => self.threshold_minutes,
            Check::Trend => self.trend_minutes,
            Check::Anomaly => self.anomaly_minutes,
            Check::Burnout => self.burnout_minutes,
            Check::Forecast => self.forecast_minutes,
            Check::Suggestion => self.suggestion_minutes,
        };
        let minutes = if minutes == 0 { 1 } else { minutes };
        Duration::from_secs(minutes.saturating_mul(60))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notifier = match &self.notifier {
            NotifierConfig::Webhook { .. } => "webhook([REDACTED])",
            NotifierConfig::Command => "command",
            NotifierConfig::Log => "log",
        };
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("sample_interval_secs", &self.sample_interval_secs)
            .field("idle_threshold", &self.idle_threshold)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("classifier", &self.classifier)
            .field("burnout", &self.burnout)
            .field("forecast", &self.forecast)
            .field("trend", &self.trend)
            .field("anomaly", &self.anomaly)
            .field("alerts", &self.alerts)
            .field("suggestions", &self.suggestions)
            .field("schedule", &self.schedule)
            .field("notifier", &notifier)
            .field("notifier_timeout_secs", &self.notifier_timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("loopbreak.db"),
            sample_interval_secs: 5,
            idle_threshold: 5.0,
            probe_timeout_secs: 3,
            classifier: ClassifierConfig::default(),
            burnout: BurnoutConfig::default(),
            forecast: ForecastConfig::default(),
            trend: TrendSettings::default(),
            anomaly: AnomalySettings::default(),
            alerts: AlertSettings::default(),
            suggestions: SuggestionConfig::default(),
            schedule: ScheduleConfig::default(),
            notifier: NotifierConfig::default(),
            notifier_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources override earlier ones: defaults, the user config file,
    /// `config_path`, then `LB_*` environment variables (`__` separates nested
    /// keys, e.g. `LB_ALERTS__COOLDOWN_MINUTES=30`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (LB_*)
        figment = figment.merge(Env::prefixed("LB_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    fn validate(&self) -> Result<(), figment::Error> {
        if self.sample_interval_secs == 0 {
            return Err("sample_interval_secs must be at least 1".to_string().into());
        }
        if !(0.0..=100.0).contains(&self.idle_threshold) {
            return Err(format!(
                "idle_threshold must be between 0 and 100, got {}",
                self.idle_threshold
            )
            .into());
        }
        check_range(
            "alerts.cooldown_minutes",
            self.alerts.cooldown_minutes,
            0,
            MAX_LOOKBACK_HOURS * 60,
        )?;
        check_range("trend.lookback_days", self.trend.lookback_days, 1, MAX_LOOKBACK_DAYS)?;
        check_range(
            "suggestions.lookback_days",
            self.suggestions.lookback_days,
            1,
            MAX_LOOKBACK_DAYS,
        )?;
        check_range("anomaly.lookback_hours", self.anomaly.lookback_hours, 1, MAX_LOOKBACK_HOURS)?;
        check_range("alerts.lookback_hours", self.alerts.lookback_hours, 1, MAX_LOOKBACK_HOURS)?;
        check_range("burnout.lookback_hours", self.burnout.lookback_hours, 1, MAX_LOOKBACK_HOURS)?;
        if !self.anomaly.z_threshold.is_finite() || self.anomaly.z_threshold <= 0.0 {
            return Err("anomaly.z_threshold must be positive".to_string().into());
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    pub fn notifier_timeout(&self) -> Duration {
        Duration::from_secs(self.notifier_timeout_secs.max(1))
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.alerts.cooldown_minutes)
    }

    /// Lock file held by the running sampler, next to the database.
    pub fn lock_path(&self) -> PathBuf {
        self.database_path.with_extension("lock")
    }
}

#[expect(
    clippy::result_large_err,
    reason = "figment::Error is large but only returned at startup"
)]
fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), figment::Error> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(format!("{field} must be between {min} and {max}, got {value}").into())
    }
}

/// Returns the platform-specific config directory for loopbreak.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("loopbreak"))
}

/// Returns the platform-specific data directory for loopbreak.
///
/// On Linux: `~/.local/share/loopbreak`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("loopbreak"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_dirs_data_path_ends_with_loopbreak() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "loopbreak");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("loopbreak.db"));
        assert_eq!(config.lock_path(), data_dir.join("loopbreak.lock"));
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.sample_interval_secs, 5);
        assert_eq!(config.alerts.cooldown_minutes, 60);
        assert_eq!(config.trend.detector.window, 7);
        assert_eq!(config.forecast.min_history, 5);
        assert_eq!(config.notifier, NotifierConfig::Log);
    }

    #[test]
    fn test_config_file_overrides_nested_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/lb-test.db"
sample_interval_secs = 10

[classifier]
work_keywords = ["Emacs"]

[trend]
lookback_days = 30
window = 5

[alerts]
cooldown_minutes = 15

[notifier]
kind = "webhook"
url = "https://hooks.example.com/secret"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/lb-test.db"));
        assert_eq!(config.sample_interval_secs, 10);
        assert_eq!(config.classifier.work_keywords, vec!["Emacs"]);
        assert_eq!(config.trend.lookback_days, 30);
        assert_eq!(config.trend.detector.window, 5);
        assert_eq!(config.trend.detector.min_points, 3);
        assert_eq!(config.alerts.cooldown_minutes, 15);
        assert!((config.alerts.thresholds.max_idle_ratio - 0.40).abs() < f64::EPSILON);

        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_schedule_period_has_one_minute_floor() {
        let schedule = ScheduleConfig {
            trend_minutes: 0,
            ..ScheduleConfig::default()
        };
        assert_eq!(schedule.period(Check::Trend), Duration::from_secs(60));
        assert_eq!(schedule.period(Check::Forecast), Duration::from_secs(360 * 60));
    }

    #[test]
    fn test_out_of_range_lookbacks_are_rejected() {
        for setting in [
            "[trend]\nlookback_days = 100000000",
            "[trend]\nlookback_days = 0",
            "[anomaly]\nlookback_hours = 9223372036854775807",
            "[alerts]\nlookback_hours = -1",
            "[burnout]\nlookback_hours = 1000000",
            "[suggestions]\nlookback_days = 4000",
        ] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "{setting}").unwrap();
            let err = Config::load_from(Some(file.path())).unwrap_err();
            assert!(err.to_string().contains("must be between"), "{setting}: {err}");
        }
    }

    #[test]
    fn test_longest_lookbacks_are_accepted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[trend]\nlookback_days = 3650\n[anomaly]\nlookback_hours = 87600"
        )
        .unwrap();
        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.trend.lookback_days, 3650);
    }

    #[test]
    fn test_zero_sample_interval_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sample_interval_secs = 0").unwrap();
        assert!(Config::load_from(Some(file.path())).is_err());
    }
}
