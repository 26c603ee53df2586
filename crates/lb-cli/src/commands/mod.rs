//! CLI subcommand implementations.

pub mod alerts;
pub mod anomalies;
pub mod burnout;
pub mod compare;
pub mod forecast;
pub mod patterns;
pub mod reset;
pub mod run;
pub mod sample;
pub mod status;
pub mod suggest;
pub mod summary;
pub mod trends;
pub mod util;
