//! Axum route handlers for `/api/profiles`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::profile::{Profile, ProfileFilter, ProfileStats};
use crate::response::{ApiResponse, MessageResponse};
use crate::scraper::{DEFAULT_MAX_PROFILES, SEARCH_RESULTS_PATH};
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 50;
/// Keeps `(page - 1) * limit` within a BSON int64 skip.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

const NOT_FOUND: &str = "Profile not found";

/// Query values arrive as strings so that junk falls back to defaults
/// instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}

impl ListQuery {
    /// Page is clamped to `1..=MAX_PAGE`; limit defaults to 20 and is clamped to `1..=50`.
    pub fn paging(&self) -> (u64, u64) {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        let page = parse(&self.page).map_or(1, |p| (p.max(1) as u64).min(MAX_PAGE));
        let limit = parse(&self.limit)
            .filter(|l| *l > 0)
            .map_or(DEFAULT_PAGE_SIZE, |l| (l as u64).min(MAX_PAGE_SIZE));
        (page, limit)
    }

    fn filter(&self) -> ProfileFilter {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        ProfileFilter {
            company: text(&self.company),
            location: text(&self.location),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
    pub data: Vec<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: Option<String>,
    pub max_profiles: Option<usize>,
}

/// GET /api/profiles
pub async fn handle_list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProfilePage>, AppError> {
    let (page, limit) = query.paging();
    let (profiles, total) = state.profiles.list(&query.filter(), page, limit).await?;

    Ok(Json(ProfilePage {
        success: true,
        count: profiles.len(),
        total,
        page,
        pages: total.div_ceil(limit),
        data: profiles,
    }))
}

/// GET /api/profiles/search?url=
pub async fn handle_search_profiles(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<Profile>>>, AppError> {
    let fragment = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("LinkedIn URL is required".to_string()))?;

    let profiles = state.profiles.search_by_url(fragment.trim()).await?;
    let count = profiles.len();
    Ok(Json(ApiResponse::counted(profiles, count)))
}

/// GET /api/profiles/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let profile = state
        .profiles
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// DELETE /api/profiles/:id
pub async fn handle_delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.profiles.delete(&id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(Json(MessageResponse::ok("Profile deleted successfully")))
}

/// GET /api/profiles/stats
pub async fn handle_profile_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProfileStats>>, AppError> {
    let since = Utc::now() - Duration::hours(24);
    let stats = state.profiles.stats(since).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// POST /api/profiles/scrape
///
/// Runs a full scrape inside the request. A failed run is a 500 carrying the
/// scraper's message, not an `AppError`.
pub async fn handle_scrape_profiles(
    State(state): State<AppState>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Response, AppError> {
    let url = req
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("LinkedIn search URL is required".to_string()))?;
    if !url.contains(SEARCH_RESULTS_PATH) {
        return Err(AppError::Validation(
            "Invalid LinkedIn search URL format".to_string(),
        ));
    }
    let max_profiles = req
        .max_profiles
        .unwrap_or(DEFAULT_MAX_PROFILES)
        .clamp(1, DEFAULT_MAX_PROFILES);

    info!(%url, max_profiles, "Scrape requested");
    let outcome = state.scraper.scrape(&url, max_profiles).await;

    if outcome.success {
        let body = json!({
            "success": true,
            "message": outcome.message,
            "count": outcome.count(),
            "data": outcome.profiles,
        });
        return Ok((StatusCode::OK, Json(body)).into_response());
    }

    warn!("Scrape failed: {}", outcome.message);
    let body = json!({
        "success": false,
        "message": outcome.message,
        "count": 0,
    });
    Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
}
