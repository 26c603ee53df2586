//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::analysis::Check;

/// Activity monitor that warns before focus turns into burnout.
///
/// Samples the foreground window and system load, scores each sample, and
/// analyzes the history for trends, anomalies and burnout risk.
#[derive(Debug, Parser)]
#[command(name = "lb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format flag shared by the report commands.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct OutputArgs {
    /// Output as JSON instead of formatted text.
    #[arg(long)]
    pub json: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sample continuously and run the periodic checks until interrupted.
    Run,

    /// Capture a single sample and append it to the log.
    Sample,

    /// Show database location and logging state.
    Status,

    /// Summarize recent activity.
    Summary {
        /// Summarize the last hour (default).
        #[arg(long, conflicts_with = "day")]
        hour: bool,

        /// Summarize today since local midnight.
        #[arg(long)]
        day: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the direction of each metric over recent days.
    Trends {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List unusually low or high productivity samples.
    Anomalies {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Assess burnout risk now and record the assessment.
    Burnout {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Estimate the days left before burnout at the current pace.
    Forecast {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run a check and send its alert, or list past alerts.
    Alerts {
        /// Run this check now instead of listing the alert log.
        #[arg(long, value_enum)]
        check: Option<CheckArg>,

        /// Number of past alerts to list.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Suggest breaks or focus blocks from recent burnout assessments.
    Suggest {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compare productivity day over day.
    Compare {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show when and on what time is spent.
    Patterns {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete all logged samples, assessments and alerts.
    Reset {
        /// Confirm deletion. Without it, only report what would be deleted.
        #[arg(long)]
        yes: bool,
    },
}

/// Checks selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckArg {
    Threshold,
    Trend,
    Anomaly,
    Burnout,
    Forecast,
    Suggestion,
}

impl From<CheckArg> for Check {
    fn from(arg: CheckArg) -> Self {
        match arg {
            CheckArg::Threshold => Self::Threshold,
            CheckArg::Trend => Self::Trend,
            CheckArg::Anomaly => Self::Anomaly,
            CheckArg::Burnout => Self::Burnout,
            CheckArg::Forecast => Self::Forecast,
            CheckArg::Suggestion => Self::Suggestion,
        }
    }
}
