//! CLI commands for keiba-scraper.
//!
//! The binary is a thin caller of the library: it prints or persists the
//! loaded records as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use keiba_scraper::{AppConfig, DataType, Loaded, Scraper};

#[derive(Parser)]
#[command(name = "keiba-scraper")]
#[command(version, about = "Keiba scraper: netkeiba.com race, odds and horse data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List race ids held in a month
    RaceList {
        #[arg(short, long)]
        year: i32,

        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Load one entity
    Load {
        /// Data type (entry, odds, result, horse)
        #[arg(value_name = "DATA_TYPE")]
        data_type: String,

        /// Race id or horse id
        #[arg(value_name = "ID")]
        entity_id: String,

        /// Write DIR/<data_type>/<id>.json instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load every race of a month and save one JSON file per race
    Scrape {
        #[arg(short, long)]
        year: i32,

        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,

        /// Data type to load for each race (entry, odds, result)
        #[arg(short, long, default_value = "entry")]
        data_type: String,

        /// Output directory
        #[arg(short, long, default_value = "data")]
        output: PathBuf,

        /// Reload races that were already saved
        #[arg(long)]
        force: bool,
    },
}

pub async fn run_race_list(year: i32, month: u32) -> anyhow::Result<()> {
    let scraper = build_scraper()?;
    let list = scraper.race_list(year, month).await?;

    if list.skipped > 0 {
        info!("{} calendar items skipped", list.skipped);
    }
    println!("{}", serde_json::to_string_pretty(&list.race_ids)?);
    Ok(())
}

pub async fn run_load(data_type: String, entity_id: String, output: Option<PathBuf>) -> anyhow::Result<()> {
    let data_type: DataType = data_type.parse()?;
    let scraper = build_scraper()?;
    let loaded = scraper.load_as(data_type, &entity_id).await?;

    match output {
        Some(dir) => {
            let path = output_path(&dir, data_type, &entity_id);
            write_json(&path, &loaded)?;
            info!("Saved {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&loaded)?),
    }
    Ok(())
}

pub async fn run_scrape(
    year: i32,
    month: u32,
    data_type: String,
    output: PathBuf,
    force: bool,
) -> anyhow::Result<()> {
    let data_type: DataType = data_type.parse()?;
    if data_type == DataType::Horse {
        anyhow::bail!("scrape loads races; use `load horse <ID>` for horses");
    }

    let scraper = build_scraper()?;
    let list = scraper.race_list(year, month).await?;
    info!(
        "{}-{:02}: {} race ids ({} calendar items skipped)",
        year,
        month,
        list.race_ids.len(),
        list.skipped
    );

    let (mut saved, mut existing, mut failed) = (0usize, 0usize, 0usize);

    for race_id in &list.race_ids {
        let path = output_path(&output, data_type, race_id);
        if !force && path.exists() {
            existing += 1;
            continue;
        }

        match scraper.load_as(data_type, race_id).await {
            Ok(loaded) => {
                write_json(&path, &loaded)?;
                saved += 1;
            }
            Err(e) => {
                error!("Failed to load {} {}: {:#}", data_type, race_id, anyhow::Error::from(e));
                failed += 1;
            }
        }
    }

    info!(
        "Done: {} saved, {} already present, {} failed",
        saved, existing, failed
    );
    Ok(())
}

fn build_scraper() -> anyhow::Result<Scraper> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    Ok(Scraper::from_config(&config)?)
}

fn output_path(dir: &Path, data_type: DataType, entity_id: &str) -> PathBuf {
    dir.join(data_type.as_str()).join(format!("{}.json", entity_id))
}

fn write_json(path: &Path, loaded: &Loaded) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(loaded)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
