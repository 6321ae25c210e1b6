//! Web scraper module for netkeiba.com
//!
//! Provides plain HTTP fetching, browser rendering and parsing.

pub mod browser;
pub mod fetcher;
pub mod parsers;
pub mod rate_limiter;

pub use browser::{ChromiumRenderer, RenderOptions, RenderResult, Renderer};
pub use fetcher::{FetchProfile, Fetcher, HttpFetcher};
pub use parsers::{ContentKind, Parsed, Record, Target};
pub use rate_limiter::RateLimiter;

/// Substitute the entity id into a `{ID}` URL template
pub fn create_url(template: &str, entity_id: &str) -> String {
    template.replace("{ID}", entity_id)
}

/// Build the monthly calendar URL. The month is not zero-padded.
pub fn calendar_url(template: &str, year: i32, month: u32) -> String {
    template
        .replace("{YEAR}", &year.to_string())
        .replace("{MONTH}", &month.to_string())
}
