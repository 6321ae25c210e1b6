//! keiba-scraper CLI
//!
//! Fetches netkeiba.com data and writes it out as JSON.

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keiba_scraper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RaceList { year, month } => cli::run_race_list(year, month).await,
        Commands::Load {
            data_type,
            entity_id,
            output,
        } => cli::run_load(data_type, entity_id, output).await,
        Commands::Scrape {
            year,
            month,
            data_type,
            output,
            force,
        } => cli::run_scrape(year, month, data_type, output, force).await,
    }
}
