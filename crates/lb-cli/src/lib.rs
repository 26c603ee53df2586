//! LoopBreak CLI library.
//!
//! Wires the OS probe, the sampler, the analyses and alert delivery together
//! behind the `lb` command.

pub mod analysis;
mod cli;
pub mod commands;
mod config;
pub mod dispatch;
pub mod probe;
pub mod sampler;
pub mod scheduler;

pub use cli::{CheckArg, Cli, Commands, OutputArgs};
pub use config::{AlertSettings, AnomalySettings, Config, ScheduleConfig, TrendSettings};
