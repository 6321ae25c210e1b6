//! Configuration for the keiba scraper.

use serde::{Deserialize, Serialize};

/// Network politeness and HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: f64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_min_delay_secs() -> f64 {
    2.0
}

fn default_max_delay_secs() -> f64 {
    3.0
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/58.0.3029.110 Safari/537.3"
        .to_string()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Headless browser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Chrome/Chromium executable; a per-OS default is used when unset
    #[serde(default)]
    pub chrome_path: Option<String>,
    #[serde(default = "default_render_timeout_ms")]
    pub timeout_ms: u64,
    /// Selector that only exists once the page's scripts have run
    #[serde(default)]
    pub wait_selector: Option<String>,
    #[serde(default = "default_no_sandbox")]
    pub no_sandbox: bool,
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_no_sandbox() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            timeout_ms: default_render_timeout_ms(),
            wait_selector: None,
            no_sandbox: default_no_sandbox(),
        }
    }
}

/// URL templates per data type.
///
/// `{ID}` is replaced with the entity id; the calendar template takes
/// `{YEAR}` and `{MONTH}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_entry_url")]
    pub entry: String,
    #[serde(default = "default_odds_url")]
    pub odds: String,
    #[serde(default = "default_result_url")]
    pub result: String,
    #[serde(default = "default_horse_url")]
    pub horse: String,
    #[serde(default = "default_calendar_url")]
    pub calendar: String,
}

fn default_entry_url() -> String {
    "https://race.netkeiba.com/race/shutuba.html?race_id={ID}".to_string()
}

fn default_odds_url() -> String {
    "https://race.netkeiba.com/api/api_get_jra_odds.html?race_id={ID}&type=1&action=update"
        .to_string()
}

fn default_result_url() -> String {
    "https://db.netkeiba.com/race/{ID}/".to_string()
}

fn default_horse_url() -> String {
    "https://db.netkeiba.com/horse/{ID}/".to_string()
}

fn default_calendar_url() -> String {
    "https://sports.yahoo.co.jp/keiba/schedule/monthly?year={YEAR}&month={MONTH}".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            entry: default_entry_url(),
            odds: default_odds_url(),
            result: default_result_url(),
            horse: default_horse_url(),
            calendar: default_calendar_url(),
        }
    }
}

/// Debug side channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Write the raw calendar page of each `race_list` call
    #[serde(default = "default_snapshots")]
    pub snapshots: bool,
    #[serde(default = "default_debug_dir")]
    pub dir: String,
    #[serde(default = "default_render_error_log")]
    pub render_error_log: String,
}

fn default_snapshots() -> bool {
    true
}

fn default_debug_dir() -> String {
    "data/debug".to_string()
}

fn default_render_error_log() -> String {
    "data/debug/render_error.log".to_string()
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            snapshots: default_snapshots(),
            dir: default_debug_dir(),
            render_error_log: default_render_error_log(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and the
    /// environment (`KEIBA__SCRAPER__MIN_DELAY_SECS`, etc.)
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("KEIBA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.scraper.min_delay_secs, 2.0);
        assert_eq!(config.scraper.max_delay_secs, 3.0);
        assert_eq!(config.render.timeout_ms, 30_000);
        assert!(config.render.wait_selector.is_none());
        assert!(config.sources.entry.contains("{ID}"));
        assert!(config.sources.horse.contains("{ID}"));
        assert!(config.sources.calendar.contains("{YEAR}"));
        assert!(config.sources.calendar.contains("{MONTH}"));
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let json = r#"{"scraper": {"min_delay_secs": 0.0, "max_delay_secs": 0.0}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.scraper.min_delay_secs, 0.0);
        assert_eq!(config.scraper.request_timeout_secs, 30);
        assert_eq!(config.sources.result, "https://db.netkeiba.com/race/{ID}/");
        assert!(config.debug.snapshots);
    }
}
