//! Per-entity loaders.
//!
//! A loader builds the page URL from its template, retrieves the content
//! and runs the parsers for each of its sub-records. [`Scraper`] owns the
//! shared collaborators and dispatches on [`DataType`].

pub mod calendar;
pub mod entry;
pub mod horse;
pub mod odds;
pub mod result;

pub use calendar::{expand_race_ids, CalendarLoader, RaceList};
pub use entry::EntryLoader;
pub use horse::HorseLoader;
pub use odds::OddsLoader;
pub use result::ResultLoader;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, RenderConfig, SourcesConfig};
use crate::error::ScrapeError;
use crate::scraper::{ChromiumRenderer, Fetcher, HttpFetcher, Record, RenderOptions, Renderer};

/// Kinds of entity that can be loaded by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Entry,
    Odds,
    Result,
    Horse,
}

impl DataType {
    pub const ALL: [DataType; 4] = [DataType::Entry, DataType::Odds, DataType::Result, DataType::Horse];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Entry => "entry",
            DataType::Odds => "odds",
            DataType::Result => "result",
            DataType::Horse => "horse",
        }
    }

    /// Number of record groups the loader returns
    pub fn arity(&self) -> usize {
        match self {
            DataType::Odds => 1,
            DataType::Entry | DataType::Result | DataType::Horse => 2,
        }
    }
}

impl FromStr for DataType {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.as_str() == s)
            .ok_or_else(|| ScrapeError::Config {
                data_type: s.to_string(),
            })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a loader, tagged with its data type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "data_type", rename_all = "lowercase")]
pub enum Loaded {
    Entry { race: Record, entries: Vec<Record> },
    Odds { odds: Vec<Record> },
    Result { race: Record, results: Vec<Record> },
    Horse { horse: Record, history: Vec<Record> },
}

impl Loaded {
    pub fn data_type(&self) -> DataType {
        match self {
            Loaded::Entry { .. } => DataType::Entry,
            Loaded::Odds { .. } => DataType::Odds,
            Loaded::Result { .. } => DataType::Result,
            Loaded::Horse { .. } => DataType::Horse,
        }
    }

    pub fn arity(&self) -> usize {
        self.data_type().arity()
    }
}

/// Shared collaborators for all loaders
pub struct Scraper {
    sources: SourcesConfig,
    fetcher: Box<dyn Fetcher>,
    renderer: Box<dyn Renderer>,
    render_options: RenderOptions,
    snapshot_dir: Option<PathBuf>,
}

impl Scraper {
    pub fn new(
        sources: SourcesConfig,
        fetcher: impl Fetcher + 'static,
        renderer: impl Renderer + 'static,
    ) -> Self {
        Self {
            sources,
            fetcher: Box::new(fetcher),
            renderer: Box::new(renderer),
            render_options: RenderOptions::from_config(&RenderConfig::default()),
            snapshot_dir: None,
        }
    }

    /// Build the production scraper: reqwest fetcher and headless Chromium
    pub fn from_config(config: &AppConfig) -> Result<Self, ScrapeError> {
        let fetcher = HttpFetcher::from_config(&config.scraper)?;
        let renderer = ChromiumRenderer::from_config(config);

        let mut scraper = Self::new(config.sources.clone(), fetcher, renderer)
            .with_render_options(RenderOptions::from_config(&config.render));
        if config.debug.snapshots {
            scraper = scraper.with_snapshot_dir(&config.debug.dir);
        }
        Ok(scraper)
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Keep raw calendar pages in this directory
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn sources(&self) -> &SourcesConfig {
        &self.sources
    }

    pub(crate) fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub(crate) fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub(crate) fn render_options(&self) -> &RenderOptions {
        &self.render_options
    }

    pub(crate) fn snapshot_dir(&self) -> Option<&Path> {
        self.snapshot_dir.as_deref()
    }

    pub fn entry<'a>(&'a self, race_id: &'a str) -> EntryLoader<'a> {
        EntryLoader::new(self, race_id)
    }

    pub fn odds<'a>(&'a self, race_id: &'a str) -> OddsLoader<'a> {
        OddsLoader::new(self, race_id)
    }

    pub fn result<'a>(&'a self, race_id: &'a str) -> ResultLoader<'a> {
        ResultLoader::new(self, race_id)
    }

    pub fn horse<'a>(&'a self, horse_id: &'a str) -> HorseLoader<'a> {
        HorseLoader::new(self, horse_id)
    }

    /// Load `entity_id` as the data type named `data_type`
    pub async fn load(&self, data_type: &str, entity_id: &str) -> Result<Loaded, ScrapeError> {
        let data_type: DataType = data_type.parse()?;
        self.load_as(data_type, entity_id).await
    }

    pub async fn load_as(&self, data_type: DataType, entity_id: &str) -> Result<Loaded, ScrapeError> {
        let loaded = match data_type {
            DataType::Entry => {
                let (race, entries) = self.entry(entity_id).load().await?;
                Loaded::Entry { race, entries }
            }
            DataType::Odds => Loaded::Odds {
                odds: self.odds(entity_id).load().await?,
            },
            DataType::Result => {
                let (race, results) = self.result(entity_id).load().await?;
                Loaded::Result { race, results }
            }
            DataType::Horse => {
                let (horse, history) = self.horse(entity_id).load().await?;
                Loaded::Horse { horse, history }
            }
        };

        info!("Loaded {} {}", data_type, entity_id);
        Ok(loaded)
    }

    /// Race ids for every meeting in the month
    pub async fn race_list(&self, year: i32, month: u32) -> Result<RaceList, ScrapeError> {
        CalendarLoader::new(self, year, month).load().await
    }

    /// Best-effort write of a raw page into the snapshot directory
    pub(crate) fn write_snapshot(&self, file_name: &str, content: &str) {
        let Some(dir) = self.snapshot_dir() else {
            return;
        };

        let path = dir.join(file_name);
        let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, content));
        match written {
            Ok(()) => debug!("Saved snapshot {}", path.display()),
            Err(e) => warn!("Could not write snapshot {}: {}", path.display(), e),
        }
    }
}
