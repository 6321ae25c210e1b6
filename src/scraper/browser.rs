//! Browser automation using chromiumoxide.
//!
//! Horse pages fill in their data client-side, so a plain GET returns an
//! incomplete document. The renderer drives a throwaway headless Chromium
//! session to get the post-script markup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use super::RateLimiter;
use crate::config::{AppConfig, RenderConfig};
use crate::error::ScrapeError;

/// Fixed pause after navigation so late XHRs can land. This stands in for
/// network-idle detection; set `render.wait_selector` for a stricter wait.
const NETWORK_IDLE_GRACE: Duration = Duration::from_millis(1500);

/// Interval between wait-selector checks
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long a closed browser may take to exit before it is killed
const BROWSER_EXIT_TIMEOUT: Duration = Duration::from_secs(5);

const VIEWPORT: (u32, u32) = (1280, 800);

/// Rendered document and the URL it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    pub url: String,
    pub content: String,
}

/// Per-call render settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Navigation timeout, also used for the wait selector
    pub timeout: Duration,
    /// Selector that must appear before the document is taken
    pub wait_selector: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(20_000),
            wait_selector: None,
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            wait_selector: config.wait_selector.clone(),
        }
    }
}

/// Source of JavaScript-rendered page text.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderResult, ScrapeError>;
}

/// Renderer that launches a fresh headless Chromium per call
pub struct ChromiumRenderer {
    chrome_path: PathBuf,
    user_agent: String,
    no_sandbox: bool,
    limiter: RateLimiter,
    error_log: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new(chrome_path: impl Into<PathBuf>, user_agent: impl Into<String>, limiter: RateLimiter) -> Self {
        Self {
            chrome_path: chrome_path.into(),
            user_agent: user_agent.into(),
            no_sandbox: true,
            limiter,
            error_log: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let chrome_path = config
            .render
            .chrome_path
            .clone()
            .unwrap_or_else(|| default_chrome_path().to_string());

        let mut renderer = Self::new(
            chrome_path,
            config.scraper.user_agent.clone(),
            RateLimiter::from_config(&config.scraper),
        )
        .with_error_log(&config.debug.render_error_log);
        renderer.no_sandbox = config.render.no_sandbox;
        renderer
    }

    /// Append render failures to this file
    pub fn with_error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log = Some(path.into());
        self
    }

    fn browser_config(&self, options: &RenderOptions) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.chrome_path)
            .disable_default_args()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--mute-audio")
            .arg(format!("--user-agent={}", self.user_agent))
            .window_size(VIEWPORT.0, VIEWPORT.1)
            .request_timeout(options.timeout);

        if self.no_sandbox {
            builder = builder.no_sandbox().arg("--disable-setuid-sandbox");
        }

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))
    }

    /// Launch, capture, and always tear the session down
    async fn render_once(&self, url: &str, options: &RenderOptions) -> Result<String> {
        let config = self.browser_config(options)?;

        let (mut browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .context("Failed to launch browser")?;

        // Handler must keep running for the browser to work
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let result = capture(&browser, url, options).await;

        shutdown(&mut browser).await;
        handle.abort();

        result
    }

    fn log_failure(&self, url: &str, error: &anyhow::Error) {
        let Some(path) = &self.error_log else {
            return;
        };

        let written = (|| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            writeln!(
                file,
                "\n--- render error for {} at {} ---\n{:?}",
                url,
                chrono::Utc::now().to_rfc3339(),
                error
            )
        })();

        if let Err(e) = written {
            warn!("Could not write render error log {}: {}", path.display(), e);
        }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderResult, ScrapeError> {
        self.limiter.acquire().await;
        debug!("Rendering {} (timeout {:?})", url, options.timeout);

        match self.render_once(url, options).await {
            Ok(content) => Ok(RenderResult {
                url: url.to_string(),
                content,
            }),
            Err(e) => {
                self.log_failure(url, &e);
                Err(ScrapeError::render(url, e))
            }
        }
    }
}

/// Close the browser and reap the child; kill it if either step stalls
async fn shutdown(browser: &mut ChromeBrowser) {
    let closed = match browser.close().await {
        Ok(_) => true,
        Err(e) => {
            debug!("Browser close failed: {}", e);
            false
        }
    };

    if closed && wait_bounded(browser.wait(), BROWSER_EXIT_TIMEOUT).await.is_some() {
        return;
    }

    debug!("Killing browser process");
    if let Some(Err(e)) = browser.kill().await {
        warn!("Browser kill failed: {}", e);
    }
}

async fn wait_bounded<F: std::future::Future>(future: F, limit: Duration) -> Option<F::Output> {
    tokio::time::timeout(limit, future).await.ok()
}

async fn capture(browser: &ChromeBrowser, url: &str, options: &RenderOptions) -> Result<String> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("Failed to create new page")?;

    let navigation = async {
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        Ok::<_, chromiumoxide::error::CdpError>(())
    };
    tokio::time::timeout(options.timeout, navigation)
        .await
        .map_err(|_| anyhow::anyhow!("Navigation timed out after {:?}", options.timeout))?
        .context("Navigation failed")?;

    tokio::time::sleep(NETWORK_IDLE_GRACE).await;

    if let Some(selector) = &options.wait_selector {
        wait_for_selector(&page, selector, options.timeout).await?;
    }

    let html = page.content().await.context("Failed to get page content")?;

    let _ = page.close().await;

    Ok(html)
}

async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            anyhow::bail!("Selector {} did not appear within {:?}", selector, timeout);
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

/// Chrome executable for the current platform
pub fn default_chrome_path() -> &'static str {
    if cfg!(target_os = "macos") {
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
    } else if cfg!(target_os = "windows") {
        "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"
    } else {
        "google-chrome"
    }
}
