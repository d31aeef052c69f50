//! The browser seam. The workflow only drives a `BrowserSession`; the
//! Chromium implementation lives in `chromium.rs`, tests script a fake.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::scraper::strategy::{ElementProbe, ElementSnapshot};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {timeout:?} waiting for selector '{selector}'")]
    SelectorTimeout { selector: String, timeout: Duration },

    /// The page or browser went away underneath us.
    #[error("Target page, context or browser has been closed")]
    Closed,

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),

    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// One page in one browser instance.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Loads `url` and waits for the navigation to settle.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError>;

    /// Clicks the first match. `Ok(false)` if nothing matches.
    async fn click_if_present(&self, selector: &str) -> Result<bool, BrowserError>;

    async fn count(&self, selector: &str) -> Result<usize, BrowserError>;

    /// Captures the probed parts of the `index`-th element matching `selector`.
    async fn snapshot(
        &self,
        selector: &str,
        index: usize,
        probe: &ElementProbe,
    ) -> Result<ElementSnapshot, BrowserError>;

    async fn screenshot(&self, path: &Path) -> Result<(), BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
