//! In-memory stores used by handler and scraper tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use super::{page_offset, CampaignStore, LeadsAppended, ProfileStore, StoreError, TOP_GROUPS};
use crate::models::campaign::{
    merge_leads, Campaign, CampaignChanges, CampaignStatus, NewCampaign,
};
use crate::models::profile::{GroupCount, NewProfile, Profile, ProfileFilter, ProfileStats};

#[derive(Default)]
pub struct MemoryCampaignStore {
    rows: Mutex<Vec<Campaign>>,
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn list_visible(&self) -> Result<Vec<Campaign>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut visible: Vec<Campaign> = rows.iter().filter(|c| !c.is_deleted()).cloned().collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(visible)
    }

    async fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn insert(&self, campaign: NewCampaign) -> Result<Campaign, StoreError> {
        let now = Utc::now();
        let row = Campaign {
            id: ObjectId::new().to_hex(),
            name: campaign.name,
            description: campaign.description,
            status: CampaignStatus::Active,
            leads: campaign.leads,
            account_ids: campaign.account_ids,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: &str,
        changes: &CampaignChanges,
    ) -> Result<Option<Campaign>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|c| c.id == id && !c.is_deleted()) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            row.name = name.clone();
        }
        if let Some(description) = &changes.description {
            row.description = description.clone();
        }
        if let Some(status) = changes.status {
            row.status = status;
        }
        if let Some(leads) = &changes.leads {
            row.leads = leads.clone();
        }
        if let Some(ids) = &changes.account_ids {
            row.account_ids = ids.clone();
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|c| c.id == id && !c.is_deleted()) {
            Some(row) => {
                row.status = CampaignStatus::Deleted;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn append_leads(
        &self,
        id: &str,
        leads: &[String],
    ) -> Result<Option<LeadsAppended>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|c| c.id == id && !c.is_deleted()) else {
            return Ok(None);
        };
        let added = merge_leads(&mut row.leads, leads);
        row.updated_at = Utc::now();
        Ok(Some(LeadsAppended {
            campaign: row.clone(),
            added,
        }))
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    rows: Mutex<Vec<Profile>>,
}

impl MemoryProfileStore {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Inserts a fully-formed row, bypassing validation. Lets tests control timestamps.
    pub fn seed(&self, profile: Profile) {
        self.rows.lock().unwrap().push(profile);
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn top_groups<'a>(values: impl Iterator<Item = &'a str>) -> Vec<GroupCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(value, count)| GroupCount {
            value: Some(value.to_string()),
            count,
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    groups.truncate(TOP_GROUPS);
    groups
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn list(
        &self,
        filter: &ProfileFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Profile>, u64), StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<Profile> = rows
            .iter()
            .filter(|p| {
                filter
                    .company
                    .as_deref()
                    .map_or(true, |c| contains_ci(&p.company_name, c))
                    && filter
                        .location
                        .as_deref()
                        .map_or(true, |l| contains_ci(&p.location, l))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
        let total = matching.len() as u64;
        let skip = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let page_rows = matching.into_iter().skip(skip).take(limit as usize).collect();
        Ok((page_rows, total))
    }

    async fn search_by_url(&self, fragment: &str) -> Result<Vec<Profile>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut found: Vec<Profile> = rows
            .iter()
            .filter(|p| contains_ci(&p.profile_url, fragment))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
        Ok(found)
    }

    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.profile_url == url)
            .cloned())
    }

    async fn insert(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|p| p.profile_url == profile.scraped.profile_url) {
            return Err(StoreError::Duplicate(profile.scraped.profile_url));
        }
        let now = Utc::now();
        let s = profile.scraped;
        let row = Profile {
            id: ObjectId::new().to_hex(),
            full_name: s.full_name,
            headline: s.headline,
            current_job_title: s.current_job_title,
            company_name: s.company_name,
            location: s.location,
            profile_url: s.profile_url,
            about: s.about,
            profile_photo: s.profile_photo,
            scraped: true,
            scraped_at: profile.scraped_at,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|p| p.id != id);
        Ok(rows.len() < before)
    }

    async fn stats(&self, recent_since: DateTime<Utc>) -> Result<ProfileStats, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(ProfileStats {
            total_profiles: rows.len() as u64,
            recently_scraped: rows.iter().filter(|p| p.scraped_at >= recent_since).count() as u64,
            top_companies: top_groups(rows.iter().map(|p| p.company_name.as_str())),
            top_locations: top_groups(rows.iter().map(|p| p.location.as_str())),
        })
    }
}
