//! jobharvest command-line entry point.

mod cli;
mod session;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use jobharvest_core::AppConfig;
use jobharvest_store::Database;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,jobharvest=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env();
            config.validate()?;
            config
        }
        None => AppConfig::load_with_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli).context("loading configuration")?;

    if let Command::Config { write } = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        if write {
            config.save()?;
            tracing::info!("Saved configuration to {}", AppConfig::config_path()?.display());
        }
        return Ok(());
    }

    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tracing::debug!("Opening database at {}", db_path.display());
    let db = Database::new(&db_path).await?;
    db.run_migrations().await?;
    let buffer = db.result_buffer(config.buffer.cap);

    let result = match cli.command {
        Command::Scrape(args) => session::scrape(&config, &buffer, args).await,
        Command::Serve(args) => session::serve(&config, &buffer, args).await,
        Command::Buffer { clear } => session::show_buffer(&buffer, clear).await,
        Command::Config { .. } => Ok(()),
    };

    db.close().await;
    result
}
