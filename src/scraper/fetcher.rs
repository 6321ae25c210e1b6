//! Plain HTTP fetching with reqwest.
//!
//! Every request waits on the [`RateLimiter`] first, and every body is
//! decoded as EUC-JP, the legacy encoding the source pages are served in.

use async_trait::async_trait;
use encoding_rs::EUC_JP;
use reqwest::header::USER_AGENT;
use std::time::Duration;
use tracing::{debug, warn};

use super::RateLimiter;
use crate::config::ScraperConfig;
use crate::error::{FetchFailure, ScrapeError};

/// Which request headers to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchProfile {
    /// Browser-like identification header
    Browser,
    /// No custom headers
    Bare,
}

/// Source of raw page text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return its decoded body
    async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<String, ScrapeError>;
}

/// HTTP fetcher backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: RateLimiter,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(
        limiter: RateLimiter,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(ScrapeError::Client)?;

        Ok(Self {
            client,
            limiter,
            user_agent: user_agent.into(),
        })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        Self::new(
            RateLimiter::from_config(config),
            config.user_agent.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn get_bytes(&self, url: &str, profile: FetchProfile) -> Result<Vec<u8>, FetchFailure> {
        let mut request = self.client.get(url);
        if profile == FetchProfile::Browser {
            request = request.header(USER_AGENT, self.user_agent.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<String, ScrapeError> {
        self.limiter.acquire().await;
        debug!("GET {} ({:?})", url, profile);

        match self.get_bytes(url, profile).await {
            Ok(bytes) => Ok(decode_euc_jp(&bytes)),
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                Err(ScrapeError::fetch(url, e))
            }
        }
    }
}

/// Decode a response body as EUC-JP, ignoring any declared charset
pub fn decode_euc_jp(bytes: &[u8]) -> String {
    let (text, _, had_errors) = EUC_JP.decode(bytes);
    if had_errors {
        debug!("Body contained bytes that are not valid EUC-JP");
    }
    text.into_owned()
}
