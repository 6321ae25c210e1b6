//! Race result loader: race header and finishing order from one page.

use tracing::debug;

use super::Scraper;
use crate::error::ScrapeError;
use crate::scraper::parsers::{parse_record, parse_records};
use crate::scraper::{create_url, FetchProfile, Record, Target};

pub struct ResultLoader<'a> {
    scraper: &'a Scraper,
    race_id: &'a str,
}

impl<'a> ResultLoader<'a> {
    pub fn new(scraper: &'a Scraper, race_id: &'a str) -> Self {
        Self { scraper, race_id }
    }

    pub fn url(&self) -> String {
        create_url(&self.scraper.sources().result, self.race_id)
    }

    pub async fn load(&self) -> Result<(Record, Vec<Record>), ScrapeError> {
        let content = self
            .scraper
            .fetcher()
            .fetch(&self.url(), FetchProfile::Browser)
            .await?;

        let race = parse_record(Target::RaceDb, &content, Some(self.race_id))?;
        let results = parse_records(Target::Result, &content, Some(self.race_id))?;
        debug!("Race {}: {} results", self.race_id, results.len());

        Ok((race, results))
    }
}
