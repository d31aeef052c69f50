//! MongoDB-backed stores. Documents use the camelCase field names the API
//! exposes; `_id` is an ObjectId rendered as a hex string outside this module.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{page_offset, CampaignStore, LeadsAppended, ProfileStore, StoreError, TOP_GROUPS};
use crate::models::campaign::{
    merge_leads, Campaign, CampaignChanges, CampaignStatus, NewCampaign,
};
use crate::models::profile::{
    GroupCount, NewProfile, Profile, ProfileFilter, ProfileStats, ScrapedProfile,
};

const CAMPAIGNS: &str = "campaigns";
const PROFILES: &str = "profiles";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CampaignDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    description: String,
    status: CampaignStatus,
    leads: Vec<String>,
    #[serde(rename = "accountIDs")]
    account_ids: Vec<String>,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

impl From<CampaignDoc> for Campaign {
    fn from(doc: CampaignDoc) -> Self {
        Campaign {
            id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: doc.name,
            description: doc.description,
            status: doc.status,
            leads: doc.leads,
            account_ids: doc.account_ids,
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    full_name: String,
    #[serde(default)]
    headline: String,
    #[serde(default)]
    current_job_title: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    location: String,
    profile_url: String,
    #[serde(default)]
    about: String,
    #[serde(default)]
    profile_photo: String,
    #[serde(default = "default_scraped")]
    scraped: bool,
    scraped_at: BsonDateTime,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

fn default_scraped() -> bool {
    true
}

impl From<ProfileDoc> for Profile {
    fn from(doc: ProfileDoc) -> Self {
        Profile {
            id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
            full_name: doc.full_name,
            headline: doc.headline,
            current_job_title: doc.current_job_title,
            company_name: doc.company_name,
            location: doc.location,
            profile_url: doc.profile_url,
            about: doc.about,
            profile_photo: doc.profile_photo,
            scraped: doc.scraped,
            scraped_at: doc.scraped_at.to_chrono(),
            created_at: doc.created_at.to_chrono(),
            updated_at: doc.updated_at.to_chrono(),
        }
    }
}

fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

fn not_deleted(id: ObjectId) -> Document {
    doc! { "_id": id, "status": { "$ne": CampaignStatus::Deleted.as_str() } }
}

fn contains_ci(fragment: &str) -> Document {
    doc! { "$regex": regex::escape(fragment), "$options": "i" }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

/// Creates the indexes both collections rely on. Idempotent.
async fn create_indexes(db: &Database) -> Result<(), StoreError> {
    let campaigns = db.collection::<Document>(CAMPAIGNS);
    campaigns
        .create_indexes(vec![
            IndexModel::builder().keys(doc! { "status": 1 }).build(),
            IndexModel::builder().keys(doc! { "createdAt": -1 }).build(),
            IndexModel::builder().keys(doc! { "name": 1 }).build(),
        ])
        .await?;

    let profiles = db.collection::<Document>(PROFILES);
    profiles
        .create_indexes(vec![
            IndexModel::builder()
                .keys(doc! { "profileUrl": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder().keys(doc! { "companyName": 1 }).build(),
            IndexModel::builder().keys(doc! { "location": 1 }).build(),
            IndexModel::builder().keys(doc! { "scraped": 1 }).build(),
            IndexModel::builder().keys(doc! { "scrapedAt": -1 }).build(),
        ])
        .await?;

    info!("MongoDB indexes ensured");
    Ok(())
}

#[derive(Clone)]
pub struct MongoCampaignStore {
    collection: Collection<CampaignDoc>,
}

impl MongoCampaignStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(CAMPAIGNS),
        }
    }

    async fn find_visible(&self, id: ObjectId) -> Result<Option<Campaign>, StoreError> {
        Ok(self
            .collection
            .find_one(not_deleted(id))
            .await?
            .map(Campaign::from))
    }
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    async fn list_visible(&self) -> Result<Vec<Campaign>, StoreError> {
        let docs: Vec<CampaignDoc> = self
            .collection
            .find(doc! { "status": { "$ne": CampaignStatus::Deleted.as_str() } })
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(Campaign::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Campaign>, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        Ok(self
            .collection
            .find_one(doc! { "_id": oid })
            .await?
            .map(Campaign::from))
    }

    async fn insert(&self, campaign: NewCampaign) -> Result<Campaign, StoreError> {
        let now = BsonDateTime::now();
        let mut doc = CampaignDoc {
            id: None,
            name: campaign.name,
            description: campaign.description,
            status: CampaignStatus::Active,
            leads: campaign.leads,
            account_ids: campaign.account_ids,
            created_at: now,
            updated_at: now,
        };
        let result = self.collection.insert_one(&doc).await?;
        doc.id = result.inserted_id.as_object_id();
        debug!(id = ?doc.id, "campaign inserted");
        Ok(doc.into())
    }

    async fn update(
        &self,
        id: &str,
        changes: &CampaignChanges,
    ) -> Result<Option<Campaign>, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        if changes.is_empty() {
            return self.find_visible(oid).await;
        }

        let mut set = doc! { "updatedAt": BsonDateTime::now() };
        if let Some(name) = &changes.name {
            set.insert("name", name.as_str());
        }
        if let Some(description) = &changes.description {
            set.insert("description", description.as_str());
        }
        if let Some(status) = changes.status {
            set.insert("status", status.as_str());
        }
        if let Some(leads) = &changes.leads {
            set.insert("leads", leads.clone());
        }
        if let Some(ids) = &changes.account_ids {
            set.insert("accountIDs", ids.clone());
        }

        Ok(self
            .collection
            .find_one_and_update(not_deleted(oid), doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
            .map(Campaign::from))
    }

    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        let result = self
            .collection
            .update_one(
                not_deleted(oid),
                doc! { "$set": {
                    "status": CampaignStatus::Deleted.as_str(),
                    "updatedAt": BsonDateTime::now(),
                } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn append_leads(
        &self,
        id: &str,
        leads: &[String],
    ) -> Result<Option<LeadsAppended>, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        let now = BsonDateTime::now();
        let each: Vec<Bson> = leads.iter().map(|l| Bson::String(l.clone())).collect();

        // The pre-image is what this update saw; replaying `$addToSet` on it
        // gives both the stored result and the exact number of new leads.
        let before = self
            .collection
            .find_one_and_update(
                not_deleted(oid),
                doc! {
                    "$addToSet": { "leads": { "$each": each } },
                    "$set": { "updatedAt": now },
                },
            )
            .return_document(ReturnDocument::Before)
            .await?;

        Ok(before.map(|doc| {
            let mut campaign = Campaign::from(doc);
            let added = merge_leads(&mut campaign.leads, leads);
            campaign.updated_at = now.to_chrono();
            LeadsAppended { campaign, added }
        }))
    }
}

/// Profile writes wait until the unique `profileUrl` index exists. A failed
/// attempt leaves the cell empty, so the next insert tries again.
#[derive(Clone)]
pub struct MongoProfileStore {
    db: Database,
    collection: Collection<ProfileDoc>,
    indexes: Arc<OnceCell<()>>,
}

impl MongoProfileStore {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.collection(PROFILES),
            indexes: Arc::new(OnceCell::new()),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.indexes
            .get_or_try_init(|| create_indexes(&self.db))
            .await
            .map(|_| ())
    }

    pub fn indexes_ready(&self) -> bool {
        self.indexes.initialized()
    }

    async fn top_groups(&self, field: &str) -> Result<Vec<GroupCount>, StoreError> {
        let pipeline = vec![
            doc! { "$group": { "_id": format!("${field}"), "count": { "$sum": 1 } } },
            doc! { "$sort": { "count": -1 } },
            doc! { "$limit": TOP_GROUPS as i64 },
        ];
        let docs: Vec<Document> = self
            .collection
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;

        docs.into_iter()
            .map(|d| bson::from_document::<GroupCount>(d).map_err(StoreError::from))
            .collect()
    }
}

fn profile_filter(filter: &ProfileFilter) -> Document {
    let mut query = Document::new();
    if let Some(company) = &filter.company {
        query.insert("companyName", contains_ci(company));
    }
    if let Some(location) = &filter.location {
        query.insert("location", contains_ci(location));
    }
    query
}

#[async_trait]
impl ProfileStore for MongoProfileStore {
    async fn list(
        &self,
        filter: &ProfileFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Profile>, u64), StoreError> {
        let query = profile_filter(filter);
        let docs: Vec<ProfileDoc> = self
            .collection
            .find(query.clone())
            .sort(doc! { "scrapedAt": -1 })
            .skip(page_offset(page, limit))
            .limit(limit as i64)
            .await?
            .try_collect()
            .await?;
        let total = self.collection.count_documents(query).await?;
        Ok((docs.into_iter().map(Profile::from).collect(), total))
    }

    async fn search_by_url(&self, fragment: &str) -> Result<Vec<Profile>, StoreError> {
        let docs: Vec<ProfileDoc> = self
            .collection
            .find(doc! { "profileUrl": contains_ci(fragment) })
            .sort(doc! { "scrapedAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(Profile::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };
        Ok(self
            .collection
            .find_one(doc! { "_id": oid })
            .await?
            .map(Profile::from))
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .collection
            .find_one(doc! { "profileUrl": url })
            .await?
            .map(Profile::from))
    }

    async fn insert(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        self.ensure_indexes().await?;

        let now = BsonDateTime::now();
        let NewProfile {
            scraped,
            scraped_at,
        } = profile;
        let ScrapedProfile {
            full_name,
            headline,
            current_job_title,
            company_name,
            location,
            profile_url,
            about,
            profile_photo,
        } = scraped;

        let mut doc = ProfileDoc {
            id: None,
            full_name,
            headline,
            current_job_title,
            company_name,
            location,
            profile_url,
            about,
            profile_photo,
            scraped: true,
            scraped_at: BsonDateTime::from_chrono(scraped_at),
            created_at: now,
            updated_at: now,
        };
        match self.collection.insert_one(&doc).await {
            Ok(result) => {
                doc.id = result.inserted_id.as_object_id();
                Ok(doc.into())
            }
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate(doc.profile_url)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };
        let result = self.collection.delete_one(doc! { "_id": oid }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn stats(&self, recent_since: DateTime<Utc>) -> Result<ProfileStats, StoreError> {
        let total_profiles = self.collection.count_documents(doc! {}).await?;
        let recently_scraped = self
            .collection
            .count_documents(doc! { "scrapedAt": { "$gte": BsonDateTime::from_chrono(recent_since) } })
            .await?;

        Ok(ProfileStats {
            total_profiles,
            recently_scraped,
            top_companies: self.top_groups("companyName").await?,
            top_locations: self.top_groups("location").await?,
        })
    }
}
