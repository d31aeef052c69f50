use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Shape every campaign lead must have.
static PROFILE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(www\.)?linkedin\.com/in/[a-zA-Z0-9\-_]+/?$").expect("valid regex")
});

/// Campaign lifecycle. `Deleted` is a soft-delete marker; rows are never removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Inactive => "INACTIVE",
            CampaignStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CampaignStatus::Active),
            "INACTIVE" => Ok(CampaignStatus::Inactive),
            "DELETED" => Ok(CampaignStatus::Deleted),
            _ => Err("Status must be either ACTIVE, INACTIVE, or DELETED".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: CampaignStatus,
    pub leads: Vec<String>,
    #[serde(rename = "accountIDs")]
    pub account_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn is_deleted(&self) -> bool {
        self.status == CampaignStatus::Deleted
    }
}

/// A validated campaign ready to be inserted. Status is always `Active`.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub description: String,
    pub leads: Vec<String>,
    pub account_ids: Vec<String>,
}

impl NewCampaign {
    /// Trims text fields and checks every field constraint.
    pub fn new(
        name: &str,
        description: &str,
        leads: Vec<String>,
        account_ids: Vec<String>,
    ) -> Result<Self, String> {
        let name = name.trim().to_string();
        let description = description.trim().to_string();
        validate_name(&name)?;
        validate_description(&description)?;
        validate_leads(&leads)?;
        validate_account_ids(&account_ids)?;
        Ok(Self {
            name,
            description,
            leads,
            account_ids,
        })
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<CampaignStatus>,
    pub leads: Option<Vec<String>>,
    pub account_ids: Option<Vec<String>>,
}

impl CampaignChanges {
    pub fn is_empty(&self) -> bool {
        *self == CampaignChanges::default()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(leads) = &self.leads {
            validate_leads(leads)?;
        }
        if let Some(ids) = &self.account_ids {
            validate_account_ids(ids)?;
        }
        Ok(())
    }
}

pub fn is_profile_url(url: &str) -> bool {
    PROFILE_URL_RE.is_match(url)
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Campaign name is required".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!(
            "Campaign name cannot exceed {MAX_NAME_LEN} characters"
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), String> {
    if description.is_empty() {
        return Err("Campaign description is required".to_string());
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!(
            "Campaign description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_leads(leads: &[String]) -> Result<(), String> {
    match leads.iter().find(|url| !is_profile_url(url)) {
        Some(bad) => Err(format!(
            "Please provide a valid LinkedIn profile URL (got '{bad}')"
        )),
        None => Ok(()),
    }
}

/// Pushes each incoming lead not already in `leads`, in order. Returns how
/// many were pushed. Mirrors MongoDB's `$addToSet` with `$each`.
pub fn merge_leads(leads: &mut Vec<String>, incoming: &[String]) -> usize {
    let before = leads.len();
    for lead in incoming {
        if !leads.contains(lead) {
            leads.push(lead.clone());
        }
    }
    leads.len() - before
}

pub fn validate_account_ids(ids: &[String]) -> Result<(), String> {
    match ids.iter().find(|id| ObjectId::parse_str(id.as_str()).is_err()) {
        Some(bad) => Err(format!("Please provide a valid account ID (got '{bad}')")),
        None => Ok(()),
    }
}
