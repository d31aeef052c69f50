use std::sync::Arc;

use crate::messages::generator::MessageGenerator;
use crate::scraper::ProfileScraper;
use crate::store::{CampaignStore, ProfileStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub campaigns: Arc<dyn CampaignStore>,
    pub profiles: Arc<dyn ProfileStore>,
    /// LLM-backed by default, falling back to templates without a key.
    pub messages: Arc<dyn MessageGenerator>,
    /// Browser-driven scraper. One browser per request; runs are not queued.
    pub scraper: Arc<dyn ProfileScraper>,
}
