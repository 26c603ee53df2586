//! Core analytics for the LoopBreak activity monitor.
//!
//! This crate contains the pure, storage-free parts of the pipeline:
//! - Classification and scoring of individual activity samples
//! - Windowed aggregation into hourly/daily summaries
//! - Trend, anomaly, burnout and forecast analysis over those summaries
//! - Alert rules (cooldown, thresholds) and break suggestions

pub mod alert;
pub mod anomaly;
pub mod burnout;
mod classify;
mod event;
pub mod forecast;
pub mod insights;
mod score;
pub mod suggest;
pub mod summary;
pub mod trend;
mod types;

pub use alert::{AlertOutcome, AlertRecord, cooldown_elapsed};
pub use anomaly::{AnomalyReport, ZScore, detect_anomalies};
pub use burnout::{BurnoutAssessment, BurnoutConfig, BurnoutSample};
pub use classify::{Classifier, ClassifierConfig};
pub use event::{EventRecord, UNKNOWN_TITLE};
pub use forecast::{Forecast, ForecastConfig, Severity};
pub use score::{FALLBACK_SCORE, score};
pub use summary::{Granularity, WindowSummary, summarize, summarize_span};
pub use trend::{Trend, TrendConfig, detect_trend};
pub use types::{ActivityStatus, Category, StatusBand, ValidationError, clamp_unit, unit_interval};
