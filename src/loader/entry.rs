//! Race card loader: race header and entry table from one page.

use tracing::debug;

use super::Scraper;
use crate::error::ScrapeError;
use crate::scraper::parsers::{parse_record, parse_records};
use crate::scraper::{create_url, FetchProfile, Record, Target};

pub struct EntryLoader<'a> {
    scraper: &'a Scraper,
    race_id: &'a str,
}

impl<'a> EntryLoader<'a> {
    pub fn new(scraper: &'a Scraper, race_id: &'a str) -> Self {
        Self { scraper, race_id }
    }

    pub fn url(&self) -> String {
        create_url(&self.scraper.sources().entry, self.race_id)
    }

    /// Returns the race record and one record per runner
    pub async fn load(&self) -> Result<(Record, Vec<Record>), ScrapeError> {
        let content = self
            .scraper
            .fetcher()
            .fetch(&self.url(), FetchProfile::Browser)
            .await?;

        let race = parse_record(Target::Race, &content, Some(self.race_id))?;
        let entries = parse_records(Target::Entry, &content, Some(self.race_id))?;
        debug!("Race {}: {} entries", self.race_id, entries.len());

        Ok((race, entries))
    }
}
