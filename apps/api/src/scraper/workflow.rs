use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::select_ok;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::profile::{NewProfile, ScrapedProfile};
use crate::scraper::browser::{BrowserError, BrowserLauncher, BrowserSession};
use crate::scraper::cleanup::{CleanupDelays, CleanupPolicy, SessionGuard};
use crate::scraper::login::{is_auth_wall, poll_until};
use crate::scraper::strategy::ExtractionStrategy;
use crate::scraper::{ProfileScraper, ScrapeOutcome, DEFAULT_MAX_PROFILES, SEARCH_RESULTS_PATH};
use crate::store::{ProfileStore, StoreError};

const NO_RESULTS_SCREENSHOT: &str = "linkedin-debug.png";
const NO_PROFILES_SCREENSHOT: &str = "linkedin-no-profiles.png";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Login timeout - please try again and complete login faster")]
    LoginTimeout,

    #[error("Could not find search results. Page title: \"{title}\". Screenshot saved to {screenshot}")]
    ResultsNotFound { title: String, screenshot: String },

    #[error("No profile elements found on the page. Screenshot saved to {0}")]
    NoProfileElements(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

impl ScrapeError {
    /// Login problems keep the window open so the operator can deal with them.
    pub fn cleanup_policy(&self) -> CleanupPolicy {
        match self {
            ScrapeError::LoginTimeout | ScrapeError::Browser(BrowserError::Closed) => {
                CleanupPolicy::AwaitManualIntervention
            }
            ScrapeError::Browser(BrowserError::Navigation { url, .. }) if is_auth_wall(url) => {
                CleanupPolicy::AwaitManualIntervention
            }
            _ => CleanupPolicy::AfterFailure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Launch,
    Navigate,
    Login,
    AwaitResults,
    Scroll,
    Extract,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Launch => "launch",
            Phase::Navigate => "navigate",
            Phase::Login => "login",
            Phase::AwaitResults => "await_results",
            Phase::Scroll => "scroll",
            Phase::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// Timings and limits for a run. Pause ranges are in milliseconds and are
/// sampled uniformly each time.
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    pub debug_dir: PathBuf,
    pub login_poll_interval: Duration,
    pub login_deadline: Duration,
    pub selector_timeout: Duration,
    pub scroll_rounds: u32,
    pub settle_pause_ms: RangeInclusive<u64>,
    pub scroll_pause_ms: RangeInclusive<u64>,
    pub page_click_pause_ms: RangeInclusive<u64>,
    pub extract_pause_ms: RangeInclusive<u64>,
    pub max_profiles: usize,
    pub cleanup: CleanupDelays,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            debug_dir: PathBuf::from("."),
            login_poll_interval: Duration::from_secs(10),
            login_deadline: Duration::from_secs(180),
            selector_timeout: Duration::from_secs(15),
            scroll_rounds: 3,
            settle_pause_ms: 3000..=5000,
            scroll_pause_ms: 2000..=4000,
            page_click_pause_ms: 3000..=5000,
            extract_pause_ms: 500..=1500,
            max_profiles: DEFAULT_MAX_PROFILES,
            cleanup: CleanupDelays::default(),
        }
    }
}

/// Drives one browser through a people-search page and stores what it finds.
pub struct ScrapeWorkflow {
    launcher: Arc<dyn BrowserLauncher>,
    strategy: Arc<dyn ExtractionStrategy>,
    profiles: Arc<dyn ProfileStore>,
    settings: ScraperSettings,
}

impl ScrapeWorkflow {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        strategy: Arc<dyn ExtractionStrategy>,
        profiles: Arc<dyn ProfileStore>,
        settings: ScraperSettings,
    ) -> Self {
        Self {
            launcher,
            strategy,
            profiles,
            settings,
        }
    }

    pub async fn run(&self, search_url: &str, max_profiles: usize) -> ScrapeOutcome {
        let max_profiles = max_profiles.clamp(1, self.settings.max_profiles);
        info!(url = %search_url, max_profiles, "Starting LinkedIn scraping");

        let session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                error!(phase = %Phase::Launch, "Scraping failed: {e}");
                return ScrapeOutcome::failed(&e);
            }
        };
        let guard = SessionGuard::new(session);

        let mut phase = Phase::Navigate;
        let result = self
            .drive(guard.session(), search_url, max_profiles, &mut phase)
            .await;

        let policy = match &result {
            Ok(_) => CleanupPolicy::AfterSuccess,
            Err(e) => e.cleanup_policy(),
        };
        let delay = policy.delay(&self.settings.cleanup);
        if policy == CleanupPolicy::AwaitManualIntervention {
            warn!(
                "Leaving the browser open for {} minutes for manual intervention",
                delay.as_secs() / 60
            );
        }
        let _ = guard.release(delay);

        match result {
            Ok(profiles) => {
                let saved = self.persist(&profiles).await;
                info!(
                    scraped = profiles.len(),
                    saved, "Scraping completed"
                );
                ScrapeOutcome::succeeded(profiles, saved)
            }
            Err(e) => {
                error!(phase = %phase, "Scraping failed: {e}");
                ScrapeOutcome::failed(&e)
            }
        }
    }

    async fn drive(
        &self,
        session: &dyn BrowserSession,
        search_url: &str,
        max_profiles: usize,
        phase: &mut Phase,
    ) -> Result<Vec<ScrapedProfile>, ScrapeError> {
        *phase = Phase::Navigate;
        info!("Navigating to search URL");
        session.goto(search_url).await?;
        pause(&self.settings.settle_pause_ms).await;

        *phase = Phase::Login;
        self.wait_for_login(session, search_url).await?;

        *phase = Phase::AwaitResults;
        self.wait_for_results(session).await?;

        *phase = Phase::Scroll;
        self.load_more(session).await?;

        *phase = Phase::Extract;
        self.extract(session, max_profiles).await
    }

    /// Polls until the operator has got past the sign-in wall, then makes
    /// sure the browser is back on the search page.
    async fn wait_for_login(
        &self,
        session: &dyn BrowserSession,
        search_url: &str,
    ) -> Result<(), ScrapeError> {
        if !is_auth_wall(&session.current_url().await?) {
            return Ok(());
        }

        info!(
            "LinkedIn login required. Please log in manually in the browser window ({}s)",
            self.settings.login_deadline.as_secs()
        );
        let logged_in = poll_until(
            self.settings.login_poll_interval,
            self.settings.login_deadline,
            move |attempt| async move {
                let url = session.current_url().await?;
                info!(attempt, "Login check, current URL: {url}");
                Ok::<_, BrowserError>(!is_auth_wall(&url))
            },
        )
        .await?;
        if !logged_in {
            return Err(ScrapeError::LoginTimeout);
        }

        info!("Login successful");
        if !session.current_url().await?.contains(SEARCH_RESULTS_PATH) {
            info!("Returning to search URL");
            session.goto(search_url).await?;
            pause(&self.settings.settle_pause_ms).await;
        }
        Ok(())
    }

    /// Races the ready selectors; the first to appear wins.
    async fn wait_for_results(&self, session: &dyn BrowserSession) -> Result<(), ScrapeError> {
        let selectors = self.strategy.ready_selectors();
        if selectors.is_empty() {
            return Ok(());
        }

        let timeout = self.settings.selector_timeout;
        let waits = selectors
            .iter()
            .map(|selector| session.wait_for_selector(selector, timeout));

        match select_ok(waits).await {
            Ok(_) => {
                info!("Search results loaded");
                Ok(())
            }
            Err(BrowserError::Closed) => Err(BrowserError::Closed.into()),
            Err(e) => {
                warn!("Search results did not appear: {e}");
                let title = session.title().await.unwrap_or_default();
                let screenshot = self.capture(session, NO_RESULTS_SCREENSHOT).await;
                Err(ScrapeError::ResultsNotFound { title, screenshot })
            }
        }
    }

    async fn load_more(&self, session: &dyn BrowserSession) -> Result<(), ScrapeError> {
        for round in 1..=self.settings.scroll_rounds {
            debug!(round, "Scrolling results");
            session.scroll_to_bottom().await?;
            pause(&self.settings.scroll_pause_ms).await;

            let Some(next) = self.strategy.next_page_selector() else {
                continue;
            };
            match session.click_if_present(next).await {
                Ok(true) => {
                    debug!(round, "Clicked next page");
                    pause(&self.settings.page_click_pause_ms).await;
                }
                Ok(false) => {}
                Err(e) => debug!("Next page click failed: {e}"),
            }
        }
        Ok(())
    }

    async fn extract(
        &self,
        session: &dyn BrowserSession,
        max_profiles: usize,
    ) -> Result<Vec<ScrapedProfile>, ScrapeError> {
        let mut found = None;
        for selector in self.strategy.result_selectors() {
            let count = session.count(selector).await?;
            if count > 0 {
                info!("Found {count} result elements using selector: {selector}");
                found = Some((*selector, count));
                break;
            }
        }
        let Some((selector, count)) = found else {
            let screenshot = self.capture(session, NO_PROFILES_SCREENSHOT).await;
            return Err(ScrapeError::NoProfileElements(screenshot));
        };

        let mut profiles = Vec::new();
        for index in 0..count.min(max_profiles) {
            match session.snapshot(selector, index, self.strategy.probe()).await {
                Ok(snapshot) => match self.strategy.extract(&snapshot) {
                    Some(profile) => {
                        info!(index, "Extracted profile: {}", profile.full_name);
                        profiles.push(profile);
                    }
                    None => debug!(index, "Result rejected"),
                },
                Err(BrowserError::Closed) => return Err(BrowserError::Closed.into()),
                Err(e) => warn!(index, "Error extracting profile: {e}"),
            }
            pause(&self.settings.extract_pause_ms).await;
        }

        info!("Extracted {} profiles", profiles.len());
        Ok(profiles)
    }

    /// Stores every profile whose URL is new. Failures are logged and skipped.
    async fn persist(&self, profiles: &[ScrapedProfile]) -> usize {
        let mut saved = 0;
        for profile in profiles {
            match self.profiles.find_by_url(&profile.profile_url).await {
                Ok(Some(_)) => {
                    info!("Profile already exists: {}", profile.full_name);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Error checking profile {}: {e}", profile.profile_url);
                    continue;
                }
            }

            let record = match NewProfile::from_scraped(profile, Utc::now()) {
                Ok(record) => record,
                Err(reason) => {
                    warn!("Not saving {}: {reason}", profile.profile_url);
                    continue;
                }
            };

            match self.profiles.insert(record).await {
                Ok(stored) => {
                    info!("Saved profile: {}", stored.full_name);
                    saved += 1;
                }
                Err(StoreError::Duplicate(_)) => {
                    info!("Profile already exists: {}", profile.full_name);
                }
                Err(e) => error!("Error saving profile {}: {e}", profile.profile_url),
            }
        }
        saved
    }

    async fn capture(&self, session: &dyn BrowserSession, file_name: &str) -> String {
        let path = self.settings.debug_dir.join(file_name);
        match session.screenshot(&path).await {
            Ok(()) => info!("Saved debug screenshot to {}", path.display()),
            Err(e) => warn!("Could not save debug screenshot: {e}"),
        }
        path.display().to_string()
    }
}

#[async_trait]
impl ProfileScraper for ScrapeWorkflow {
    async fn scrape(&self, search_url: &str, max_profiles: usize) -> ScrapeOutcome {
        self.run(search_url, max_profiles).await
    }
}

async fn pause(range: &RangeInclusive<u64>) {
    tokio::time::sleep(random_delay(range)).await;
}

fn random_delay(range: &RangeInclusive<u64>) -> Duration {
    if range.start() >= range.end() {
        return Duration::from_millis(*range.start());
    }
    Duration::from_millis(rand::rng().random_range(range.clone()))
}
