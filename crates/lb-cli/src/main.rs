use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lb_cli::analysis::Analyzer;
use lb_cli::commands::{
    alerts, anomalies, burnout, compare, forecast, patterns, reset, run, sample, status, suggest,
    summary, trends,
};
use lb_cli::dispatch::AlertDispatcher;
use lb_cli::{Cli, Commands, Config};
use lb_db::{Database, DbWorker};

/// Load config and open the database on a worker thread, for async commands.
fn open_worker(config_path: Option<&Path>) -> Result<(DbWorker, Config)> {
    let config = load_config(config_path)?;
    let db = DbWorker::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = load_config(config_path)?;
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Ok(config)
}

fn analyzer(config: Config) -> Analyzer<Local> {
    Analyzer::new(Arc::new(config), Local)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Run) => {
            let config = load_config(config_path)?;
            run::run(analyzer(config)).await?;
        }
        Some(Commands::Sample) => {
            let (db, config) = open_worker(config_path)?;
            sample::run(&mut out, &db, &config).await?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(config_path)?;
            let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
            status::run(&mut out, &db, &config, &Local, &timezone)?;
        }
        Some(Commands::Summary { hour: _, day, output }) => {
            let (db, config) = open_database(config_path)?;
            let period = if day {
                summary::Period::Day
            } else {
                summary::Period::Hour
            };
            summary::run(&mut out, &db, &analyzer(config), period, output.json)?;
        }
        Some(Commands::Trends { output }) => {
            let (db, config) = open_database(config_path)?;
            trends::run(&mut out, &db, &analyzer(config), output.json)?;
        }
        Some(Commands::Anomalies { output }) => {
            let (db, config) = open_database(config_path)?;
            anomalies::run(&mut out, &db, &analyzer(config), output.json)?;
        }
        Some(Commands::Burnout { output }) => {
            let (mut db, config) = open_database(config_path)?;
            burnout::run(&mut out, &mut db, &analyzer(config), output.json)?;
        }
        Some(Commands::Forecast { output }) => {
            let (db, config) = open_database(config_path)?;
            forecast::run(&mut out, &db, &analyzer(config), output.json)?;
        }
        Some(Commands::Alerts {
            check,
            limit,
            output,
        }) => match check {
            Some(check) => {
                let (db, config) = open_worker(config_path)?;
                let notifier = config
                    .notifier
                    .build(config.notifier_timeout())
                    .context("failed to set up notifier")?;
                let dispatcher = AlertDispatcher::new(
                    Arc::from(notifier),
                    config.cooldown(),
                    config.notifier_timeout(),
                );
                let analyzer = analyzer(config);
                alerts::run_check(
                    &mut out,
                    &db,
                    &analyzer,
                    &dispatcher,
                    check.into(),
                    output.json,
                )
                .await?;
            }
            None => {
                let (db, _config) = open_database(config_path)?;
                alerts::list(&mut out, &db, &Local, limit, output.json)?;
            }
        },
        Some(Commands::Suggest { output }) => {
            let (db, config) = open_database(config_path)?;
            suggest::run(&mut out, &db, &analyzer(config), output.json)?;
        }
        Some(Commands::Compare { output }) => {
            let (db, config) = open_database(config_path)?;
            compare::run(&mut out, &db, &analyzer(config), output.json)?;
        }
        Some(Commands::Patterns { output }) => {
            let (db, config) = open_database(config_path)?;
            patterns::run(&mut out, &db, &analyzer(config), output.json)?;
        }
        Some(Commands::Reset { yes }) => {
            let (mut db, _config) = open_database(config_path)?;
            reset::run(&mut out, &mut db, yes)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}
