//! Persistence seams for campaigns and profiles.
//!
//! Handlers and the scraper only see the `CampaignStore` / `ProfileStore`
//! traits. `AppState` carries them as `Arc<dyn ...>`; production wires the
//! MongoDB implementations, tests wire the in-memory ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::campaign::{Campaign, CampaignChanges, NewCampaign};
use crate::models::profile::{NewProfile, Profile, ProfileFilter, ProfileStats};

#[cfg(test)]
pub mod memory;
pub mod mongo;

/// How many buckets the stats endpoint returns per grouping.
pub const TOP_GROUPS: usize = 10;

/// Result of an append: the campaign after the update, and how many of the
/// requested leads were new to it.
#[derive(Debug, Clone)]
pub struct LeadsAppended {
    pub campaign: Campaign,
    pub added: usize,
}

/// Rows to skip before the 1-based `page`.
pub fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("BSON decode error: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("duplicate key: {0}")]
    Duplicate(String),
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// All campaigns not soft-deleted, newest first.
    async fn list_visible(&self) -> Result<Vec<Campaign>, StoreError>;

    /// Raw lookup; soft-deleted campaigns are returned too. Unparseable ids resolve to `None`.
    async fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError>;

    async fn insert(&self, campaign: NewCampaign) -> Result<Campaign, StoreError>;

    /// Applies `changes` to a non-deleted campaign and bumps `updated_at`.
    async fn update(
        &self,
        id: &str,
        changes: &CampaignChanges,
    ) -> Result<Option<Campaign>, StoreError>;

    /// Flips a non-deleted campaign to `DELETED`. Returns whether one matched.
    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Appends every lead not already present, keeping existing order.
    async fn append_leads(
        &self,
        id: &str,
        leads: &[String],
    ) -> Result<Option<LeadsAppended>, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// One page of profiles, most recently scraped first, plus the total match count.
    async fn list(
        &self,
        filter: &ProfileFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Profile>, u64), StoreError>;

    /// Case-insensitive substring match on the profile URL.
    async fn search_by_url(&self, fragment: &str) -> Result<Vec<Profile>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<Profile>, StoreError>;

    /// Fails with `StoreError::Duplicate` if the URL is already stored.
    async fn insert(&self, profile: NewProfile) -> Result<Profile, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// `recent_since` bounds the "recently scraped" count.
    async fn stats(&self, recent_since: DateTime<Utc>) -> Result<ProfileStats, StoreError>;
}
