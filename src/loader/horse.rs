//! Horse loader.
//!
//! The history table on horse pages is built by script, so the page is
//! rendered first. A render failure downgrades to one plain fetch of the
//! same URL, which still yields the profile.

use tracing::{debug, warn};

use super::Scraper;
use crate::error::ScrapeError;
use crate::scraper::parsers::{parse_record, parse_records};
use crate::scraper::{create_url, FetchProfile, Record, Target};

pub struct HorseLoader<'a> {
    scraper: &'a Scraper,
    horse_id: &'a str,
}

impl<'a> HorseLoader<'a> {
    pub fn new(scraper: &'a Scraper, horse_id: &'a str) -> Self {
        Self { scraper, horse_id }
    }

    pub fn url(&self) -> String {
        create_url(&self.scraper.sources().horse, self.horse_id)
    }

    /// Returns the profile record and the race history
    pub async fn load(&self) -> Result<(Record, Vec<Record>), ScrapeError> {
        let content = self.fetch_content(&self.url()).await?;

        let horse = parse_record(Target::Horse, &content, Some(self.horse_id))?;
        let history = parse_records(Target::History, &content, Some(self.horse_id))?;
        debug!("Horse {}: {} past races", self.horse_id, history.len());

        Ok((horse, history))
    }

    async fn fetch_content(&self, url: &str) -> Result<String, ScrapeError> {
        let rendered = self
            .scraper
            .renderer()
            .render(url, self.scraper.render_options())
            .await;

        match rendered {
            Ok(result) => Ok(result.content),
            Err(ScrapeError::Render { source, .. }) => {
                warn!("Render failed for {} ({}), falling back to plain fetch", url, source);
                self.scraper.fetcher().fetch(url, FetchProfile::Browser).await
            }
            Err(e) => Err(e),
        }
    }
}
