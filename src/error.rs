//! Error taxonomy for the retrieval-and-parsing pipeline.

use thiserror::Error;

use crate::scraper::parsers::Target;

/// Boxed cause carried by render and parse failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by loaders, fetchers, renderers and parsers.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network or transport failure, including non-2xx responses.
    #[error("failed to load contents from {url}")]
    Fetch {
        url: String,
        #[source]
        source: FetchFailure,
    },
    /// Headless browser failure.
    #[error("failed to render page for {url}")]
    Render {
        url: String,
        #[source]
        source: BoxError,
    },
    /// Content did not match the structure the parser expects.
    #[error(
        "failed to parse {target} data for {}",
        .entity_id.as_deref().unwrap_or("<none>")
    )]
    Parse {
        target: Target,
        entity_id: Option<String>,
        #[source]
        source: BoxError,
    },
    /// Unrecognised data type name.
    #[error("unexpected data type: {data_type}")]
    Config { data_type: String },
    #[error("failed to load configuration")]
    Settings(#[from] config::ConfigError),
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
}

/// Underlying cause of a [`ScrapeError::Fetch`].
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("server responded with status {0}")]
    Status(u16),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ScrapeError {
    pub(crate) fn fetch(url: &str, source: impl Into<FetchFailure>) -> Self {
        ScrapeError::Fetch {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn render(url: &str, source: impl Into<BoxError>) -> Self {
        ScrapeError::Render {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn parse(target: Target, entity_id: Option<&str>, source: impl Into<BoxError>) -> Self {
        ScrapeError::Parse {
            target,
            entity_id: entity_id.map(str::to_string),
            source: source.into(),
        }
    }

    /// URL attached to fetch and render failures.
    pub fn url(&self) -> Option<&str> {
        match self {
            ScrapeError::Fetch { url, .. } | ScrapeError::Render { url, .. } => Some(url),
            _ => None,
        }
    }
}
