//! Axum route handlers for `/api/campaigns`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::campaign::{validate_leads, Campaign, CampaignChanges, CampaignStatus, NewCampaign};
use crate::response::{ApiResponse, MessageResponse};
use crate::state::AppState;
use crate::store::LeadsAppended;

const NOT_FOUND: &str = "Campaign not found";

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub leads: Option<Vec<String>>,
    #[serde(rename = "accountIDs")]
    pub account_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub leads: Option<Vec<String>>,
    #[serde(rename = "accountIDs")]
    pub account_ids: Option<Vec<String>>,
}

impl UpdateCampaignRequest {
    /// Empty strings count as "not supplied". Only ACTIVE and INACTIVE can be
    /// set here; DELETED is reserved for the delete endpoint.
    fn into_changes(self) -> Result<CampaignChanges, String> {
        let text = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let status = match text(self.status).map(|s| s.parse::<CampaignStatus>()) {
            None => None,
            Some(Ok(status)) if status != CampaignStatus::Deleted => Some(status),
            Some(_) => return Err("Status must be either ACTIVE or INACTIVE".to_string()),
        };

        let changes = CampaignChanges {
            name: text(self.name),
            description: text(self.description),
            status,
            leads: self.leads,
            account_ids: self.account_ids,
        };
        changes.validate()?;
        Ok(changes)
    }
}

#[derive(Debug, Deserialize)]
pub struct AppendLeadsRequest {
    pub leads: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct AppendLeadsResponse {
    pub success: bool,
    pub added: usize,
    pub data: Campaign,
}

/// Loads a campaign, treating soft-deleted rows as missing.
async fn find_visible(state: &AppState, id: &str) -> Result<Campaign, AppError> {
    state
        .campaigns
        .get(id)
        .await?
        .filter(|c| !c.is_deleted())
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

/// GET /api/campaigns
pub async fn handle_list_campaigns(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Campaign>>>, AppError> {
    let campaigns = state.campaigns.list_visible().await?;
    let count = campaigns.len();
    Ok(Json(ApiResponse::counted(campaigns, count)))
}

/// GET /api/campaigns/:id
pub async fn handle_get_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Campaign>>, AppError> {
    let campaign = find_visible(&state, &id).await?;
    Ok(Json(ApiResponse::ok(campaign)))
}

/// POST /api/campaigns
pub async fn handle_create_campaign(
    State(state): State<AppState>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Campaign>>), AppError> {
    let (Some(name), Some(description)) = (
        req.name.filter(|n| !n.trim().is_empty()),
        req.description.filter(|d| !d.trim().is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Name and description are required".to_string(),
        ));
    };

    let new = NewCampaign::new(
        &name,
        &description,
        req.leads.unwrap_or_default(),
        req.account_ids.unwrap_or_default(),
    )
    .map_err(AppError::Validation)?;

    let campaign = state.campaigns.insert(new).await?;
    info!(id = %campaign.id, "Created campaign '{}'", campaign.name);

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(campaign))))
}

/// PUT /api/campaigns/:id
pub async fn handle_update_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<ApiResponse<Campaign>>, AppError> {
    let existing = find_visible(&state, &id).await?;
    let changes = req.into_changes().map_err(AppError::Validation)?;

    if changes.is_empty() {
        return Ok(Json(ApiResponse::ok(existing)));
    }

    let campaign = state
        .campaigns
        .update(&id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    Ok(Json(ApiResponse::ok(campaign)))
}

/// DELETE /api/campaigns/:id
pub async fn handle_delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.campaigns.soft_delete(&id).await? {
        return Err(AppError::NotFound(NOT_FOUND.to_string()));
    }
    info!(%id, "Campaign soft-deleted");
    Ok(Json(MessageResponse::ok("Campaign deleted successfully")))
}

/// POST /api/campaigns/:id/leads
///
/// Appends leads that are not already on the campaign in one atomic update,
/// so concurrent callers cannot overwrite each other's additions. `added`
/// comes from that same update.
pub async fn handle_append_leads(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AppendLeadsRequest>,
) -> Result<Json<AppendLeadsResponse>, AppError> {
    let leads = req
        .leads
        .filter(|l| !l.is_empty())
        .ok_or_else(|| AppError::Validation("Leads are required".to_string()))?;
    validate_leads(&leads).map_err(AppError::Validation)?;

    let LeadsAppended { campaign, added } = state
        .campaigns
        .append_leads(&id, &leads)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;
    info!(%id, added, "Appended leads to campaign");

    Ok(Json(AppendLeadsResponse {
        success: true,
        added,
        data: campaign,
    }))
}
