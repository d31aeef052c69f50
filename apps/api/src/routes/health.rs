use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

/// GET /health
/// Liveness only; does not touch the database.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "OutFlo Campaign Management API is running",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }))
}
