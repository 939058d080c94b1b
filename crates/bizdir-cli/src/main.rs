mod db;
mod offline;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::search::SearchArgs;

#[derive(Debug, Parser)]
#[command(name = "bizdir")]
#[command(about = "Business directory search command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Search the directory and print ranked results
    Search(SearchArgs),
}

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Load a directory fixture into the database
    Seed {
        /// Fixture file; defaults to `BIZDIR_DIRECTORY_PATH`
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("bizdir: run `bizdir --help` for available commands");
        return Ok(());
    };

    match command {
        Commands::Db { command } => {
            let config = load_config()?;
            match command {
                DbCommands::Ping => db::run_ping(&config).await,
                DbCommands::Migrate => db::run_migrate(&config).await,
                DbCommands::Seed { path } => db::run_seed(&config, path.as_deref()).await,
            }
        }
        Commands::Search(args) => {
            if let Some(path) = args.fixture.as_deref() {
                // Fixture searches need no database, so no DATABASE_URL either.
                init_tracing("warn")?;
                search::run_fixture_search(path, &args).await
            } else {
                let config = load_config()?;
                search::run_search(&config, &args).await
            }
        }
    }
}

fn load_config() -> anyhow::Result<bizdir_core::AppConfig> {
    let config = bizdir_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    Ok(config)
}

/// Logs go to stderr so `--json` output stays machine-readable.
fn init_tracing(fallback_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests;
