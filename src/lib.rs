//! Keiba scraper
//!
//! Loads race cards, results, odds and horse pages from netkeiba.com and
//! monthly meeting calendars from Yahoo! Sports, and returns them as
//! structured records. Persisting the records is left to the caller.

pub mod config;
pub mod error;
pub mod loader;
pub mod scraper;

pub use config::AppConfig;
pub use error::{FetchFailure, ScrapeError};
pub use loader::{DataType, Loaded, RaceList, Scraper};
pub use scraper::Record;

/// Load one entity with the configured production scraper
pub async fn load(data_type: &str, entity_id: &str) -> Result<Loaded, ScrapeError> {
    let data_type: DataType = data_type.parse()?;
    let config = AppConfig::load()?;
    Scraper::from_config(&config)?.load_as(data_type, entity_id).await
}

/// Race ids for every meeting in the month
pub async fn race_list(year: i32, month: u32) -> Result<Vec<String>, ScrapeError> {
    let config = AppConfig::load()?;
    let list = Scraper::from_config(&config)?.race_list(year, month).await?;
    Ok(list.race_ids)
}
