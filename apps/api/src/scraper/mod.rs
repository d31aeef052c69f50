//! LinkedIn people-search scraper.
//!
//! `workflow` sequences a run (launch, navigate, wait out a login wall,
//! wait for results, scroll, extract, persist) against the `browser` seam,
//! with all markup knowledge in `strategy`. `cleanup` decides when the
//! browser is closed.

pub mod browser;
pub mod chromium;
pub mod cleanup;
pub mod login;
pub mod strategy;
pub mod workflow;

use async_trait::async_trait;

use crate::models::profile::ScrapedProfile;

/// Path fragment every accepted search URL must carry.
pub const SEARCH_RESULTS_PATH: &str = "linkedin.com/search/results/people";

pub const DEFAULT_MAX_PROFILES: usize = 25;

/// Result of one scraping run. Failures are reported here, never raised.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub success: bool,
    pub profiles: Vec<ScrapedProfile>,
    /// How many of `profiles` were new and got stored.
    pub saved: usize,
    pub message: String,
}

impl ScrapeOutcome {
    pub fn succeeded(profiles: Vec<ScrapedProfile>, saved: usize) -> Self {
        let message = format!(
            "Successfully scraped {} profiles ({saved} new)",
            profiles.len()
        );
        Self {
            success: true,
            profiles,
            saved,
            message,
        }
    }

    pub fn failed(reason: &impl std::fmt::Display) -> Self {
        Self {
            success: false,
            profiles: Vec::new(),
            saved: 0,
            message: format!("Scraping failed: {reason}"),
        }
    }

    pub fn count(&self) -> usize {
        self.profiles.len()
    }
}

/// What the HTTP layer calls. `AppState` holds an `Arc<dyn ProfileScraper>`.
#[async_trait]
pub trait ProfileScraper: Send + Sync {
    async fn scrape(&self, search_url: &str, max_profiles: usize) -> ScrapeOutcome;
}
