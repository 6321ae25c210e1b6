//! Win odds loader for the JSON odds API.

use super::Scraper;
use crate::error::ScrapeError;
use crate::scraper::parsers::parse_records;
use crate::scraper::{create_url, FetchProfile, Record, Target};

pub struct OddsLoader<'a> {
    scraper: &'a Scraper,
    race_id: &'a str,
}

impl<'a> OddsLoader<'a> {
    pub fn new(scraper: &'a Scraper, race_id: &'a str) -> Self {
        Self { scraper, race_id }
    }

    pub fn url(&self) -> String {
        create_url(&self.scraper.sources().odds, self.race_id)
    }

    pub async fn load(&self) -> Result<Vec<Record>, ScrapeError> {
        let content = self
            .scraper
            .fetcher()
            .fetch(&self.url(), FetchProfile::Browser)
            .await?;

        parse_records(Target::Odds, &content, Some(self.race_id))
    }
}
