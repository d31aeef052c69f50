//! Axum route handlers for outreach message generation.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::messages::generator::{
    generate_variations, variation_count, MessageRequest, ProfileInput,
};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GeneratedMessage {
    pub message: String,
    pub profile: ProfileInput,
}

#[derive(Debug, Serialize)]
pub struct MessageVariations {
    pub messages: Vec<String>,
    pub count: usize,
    pub profile: ProfileInput,
}

#[derive(Debug, Deserialize)]
pub struct VariationsQuery {
    pub count: Option<String>,
}

/// POST /api/personalized-message
pub async fn handle_generate_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<ApiResponse<GeneratedMessage>>, AppError> {
    let profile = request.validate().map_err(AppError::Validation)?;

    let message = state.messages.generate(&profile).await;

    Ok(Json(ApiResponse::ok(GeneratedMessage { message, profile })))
}

/// POST /api/personalized-message/variations?count=N
///
/// N defaults to 3 and is capped at 5.
pub async fn handle_generate_variations(
    State(state): State<AppState>,
    Query(query): Query<VariationsQuery>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<ApiResponse<MessageVariations>>, AppError> {
    let profile = request.validate().map_err(AppError::Validation)?;
    let count = variation_count(query.count.as_deref());
    info!("Generating {count} message variations for {}", profile.name);

    let messages = generate_variations(state.messages.as_ref(), &profile, count).await;

    Ok(Json(ApiResponse::ok(MessageVariations {
        count: messages.len(),
        messages,
        profile,
    })))
}
