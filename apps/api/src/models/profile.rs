use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::campaign::is_profile_url;

pub const MAX_FULL_NAME_LEN: usize = 100;
pub const MAX_JOB_TITLE_LEN: usize = 200;
pub const MAX_COMPANY_LEN: usize = 200;
pub const MAX_LOCATION_LEN: usize = 100;

/// A persisted profile. `profile_url` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub headline: String,
    pub current_job_title: String,
    pub company_name: String,
    pub location: String,
    pub profile_url: String,
    pub about: String,
    pub profile_photo: String,
    pub scraped: bool,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record pulled off a search results page, before persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedProfile {
    pub full_name: String,
    pub headline: String,
    pub current_job_title: String,
    pub company_name: String,
    pub location: String,
    pub profile_url: String,
    pub about: String,
    pub profile_photo: String,
}

/// A scraped record that passed the persistence constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub scraped: ScrapedProfile,
    pub scraped_at: DateTime<Utc>,
}

impl NewProfile {
    pub fn from_scraped(scraped: &ScrapedProfile, scraped_at: DateTime<Utc>) -> Result<Self, String> {
        let trimmed = ScrapedProfile {
            full_name: scraped.full_name.trim().to_string(),
            headline: scraped.headline.trim().to_string(),
            current_job_title: scraped.current_job_title.trim().to_string(),
            company_name: scraped.company_name.trim().to_string(),
            location: scraped.location.trim().to_string(),
            profile_url: scraped.profile_url.trim().to_string(),
            about: scraped.about.trim().to_string(),
            profile_photo: scraped.profile_photo.trim().to_string(),
        };

        if trimmed.full_name.is_empty() {
            return Err("Full name is required".to_string());
        }
        check_len("Full name", &trimmed.full_name, MAX_FULL_NAME_LEN)?;
        check_len("Job title", &trimmed.current_job_title, MAX_JOB_TITLE_LEN)?;
        check_len("Company name", &trimmed.company_name, MAX_COMPANY_LEN)?;
        check_len("Location", &trimmed.location, MAX_LOCATION_LEN)?;
        if !is_profile_url(&trimmed.profile_url) {
            return Err("Please provide a valid LinkedIn profile URL".to_string());
        }

        Ok(Self {
            scraped: trimmed,
            scraped_at,
        })
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{field} cannot exceed {max} characters"));
    }
    Ok(())
}

/// Case-insensitive substring filters for the profile list.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub company: Option<String>,
    pub location: Option<String>,
}

/// One bucket of a top-N grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCount {
    #[serde(rename = "_id")]
    pub value: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_profiles: u64,
    pub recently_scraped: u64,
    pub top_companies: Vec<GroupCount>,
    pub top_locations: Vec<GroupCount>,
}
