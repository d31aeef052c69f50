pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::campaigns::handlers as campaigns;
use crate::messages::handlers as messages;
use crate::profiles::handlers as profiles;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "API endpoint not found"
        })),
    )
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Campaigns
        .route(
            "/api/campaigns",
            get(campaigns::handle_list_campaigns).post(campaigns::handle_create_campaign),
        )
        .route(
            "/api/campaigns/:id",
            get(campaigns::handle_get_campaign)
                .put(campaigns::handle_update_campaign)
                .delete(campaigns::handle_delete_campaign),
        )
        .route(
            "/api/campaigns/:id/leads",
            post(campaigns::handle_append_leads),
        )
        // Messages
        .route(
            "/api/personalized-message",
            post(messages::handle_generate_message),
        )
        .route(
            "/api/personalized-message/variations",
            post(messages::handle_generate_variations),
        )
        // Profiles
        .route("/api/profiles", get(profiles::handle_list_profiles))
        .route("/api/profiles/search", get(profiles::handle_search_profiles))
        .route("/api/profiles/stats", get(profiles::handle_profile_stats))
        .route("/api/profiles/scrape", post(profiles::handle_scrape_profiles))
        .route(
            "/api/profiles/:id",
            get(profiles::handle_get_profile).delete(profiles::handle_delete_profile),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// `*` allows any origin (without credentials); otherwise only the listed
/// origins, with credentials.
pub fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::messages::generator::LlmMessageGenerator;
    use crate::models::profile::{Profile, ScrapedProfile};
    use crate::scraper::{ProfileScraper, ScrapeOutcome};
    use crate::store::memory::{MemoryCampaignStore, MemoryProfileStore};

    const LEAD: &str = "https://www.linkedin.com/in/jane-doe";
    const SEARCH_URL: &str = "https://www.linkedin.com/search/results/people/?keywords=cto";

    struct FakeScraper(ScrapeOutcome);

    #[async_trait]
    impl ProfileScraper for FakeScraper {
        async fn scrape(&self, _search_url: &str, _max_profiles: usize) -> ScrapeOutcome {
            self.0.clone()
        }
    }

    fn app_with(profiles: Arc<MemoryProfileStore>, outcome: ScrapeOutcome) -> Router {
        build_router(AppState {
            campaigns: Arc::new(MemoryCampaignStore::default()),
            profiles,
            messages: Arc::new(LlmMessageGenerator::new(None)),
            scraper: Arc::new(FakeScraper(outcome)),
        })
    }

    fn app() -> Router {
        app_with(
            Arc::new(MemoryProfileStore::default()),
            ScrapeOutcome::succeeded(Vec::new(), 0),
        )
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn profile(id: &str, name: &str, company: &str, location: &str, hours_ago: i64) -> Profile {
        let at = Utc::now() - Duration::hours(hours_ago);
        Profile {
            id: id.to_string(),
            full_name: name.to_string(),
            headline: format!("Engineer at {company}"),
            current_job_title: "Engineer".to_string(),
            company_name: company.to_string(),
            location: location.to_string(),
            profile_url: format!("https://www.linkedin.com/in/{id}"),
            about: String::new(),
            profile_photo: String::new(),
            scraped: true,
            scraped_at: at,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = send(&app(), Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "API endpoint not found" }));
    }

    #[tokio::test]
    async fn test_campaign_lifecycle() {
        let app = app();

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/campaigns",
            Some(json!({ "name": "Q3 Outreach", "description": "CTOs in fintech", "leads": [LEAD] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["status"], "ACTIVE");
        assert_eq!(created["data"]["accountIDs"], json!([]));
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let (_, list) = send(&app, Method::GET, "/api/campaigns", None).await;
        assert_eq!(list["count"], 1);

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/campaigns/{id}"),
            Some(json!({ "status": "INACTIVE", "name": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["status"], "INACTIVE");
        assert_eq!(updated["data"]["name"], "Q3 Outreach");

        let (status, deleted) = send(&app, Method::DELETE, &format!("/api/campaigns/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["message"], "Campaign deleted successfully");

        let (status, missing) = send(&app, Method::GET, &format!("/api/campaigns/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["message"], "Campaign not found");

        let (_, list) = send(&app, Method::GET, "/api/campaigns", None).await;
        assert_eq!(list["count"], 0);

        let (status, _) = send(&app, Method::DELETE, &format!("/api/campaigns/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &app,
            Method::PUT,
            &format!("/api/campaigns/{id}"),
            Some(json!({ "name": "Revived" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_campaign_defaults_to_empty_lists() {
        let app = app();

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/campaigns",
            Some(json!({ "name": "Q1 Outreach", "description": "test", "leads": [], "accountIDs": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["success"], true);
        assert_eq!(created["data"]["name"], "Q1 Outreach");
        assert_eq!(created["data"]["status"], "ACTIVE");
        assert_eq!(created["data"]["leads"], json!([]));
        assert_eq!(created["data"]["accountIDs"], json!([]));

        let (_, bare) = send(
            &app,
            Method::POST,
            "/api/campaigns",
            Some(json!({ "name": "Q2 Outreach", "description": "test" })),
        )
        .await;
        assert_eq!(bare["data"]["leads"], json!([]));
    }

    #[tokio::test]
    async fn test_create_campaign_validation() {
        let app = app();

        let (status, body) = send(&app, Method::POST, "/api/campaigns", Some(json!({ "name": "Only name" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Name and description are required");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/campaigns",
            Some(json!({ "name": "n", "description": "d", "leads": ["https://example.com/in/x"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/campaigns",
            Some(json!({ "name": "n", "description": "d", "accountIDs": ["not-an-id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_status() {
        let app = app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/campaigns",
            Some(json!({ "name": "n", "description": "d" })),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/campaigns/{id}"),
            Some(json!({ "status": "PAUSED" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Status must be either ACTIVE or INACTIVE");
    }

    #[tokio::test]
    async fn test_malformed_campaign_id_is_not_found() {
        let (status, _) = send(&app(), Method::GET, "/api/campaigns/xyz", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_append_leads_skips_existing() {
        let app = app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/campaigns",
            Some(json!({ "name": "n", "description": "d", "leads": [LEAD] })),
        )
        .await;
        let id = created["data"]["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/campaigns/{id}/leads"),
            Some(json!({ "leads": [LEAD, "https://www.linkedin.com/in/ada-lovelace"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"], 1);

        let (_, repeat) = send(
            &app,
            Method::POST,
            &format!("/api/campaigns/{id}/leads"),
            Some(json!({ "leads": [LEAD, LEAD] })),
        )
        .await;
        assert_eq!(repeat["added"], 0);
        assert_eq!(
            body["data"]["leads"],
            json!([LEAD, "https://www.linkedin.com/in/ada-lovelace"])
        );

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/campaigns/{id}/leads"),
            Some(json!({ "leads": ["not a url"] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_personalized_message_uses_fallback_without_key() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/personalized-message",
            Some(json!({ "name": "Jane Doe", "job_title": "CTO", "company": "Initech" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["data"]["message"].as_str().unwrap().contains("Jane Doe"));
        assert_eq!(body["data"]["profile"]["company"], "Initech");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/personalized-message",
            Some(json!({ "name": "Jane Doe" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Name, job title, and company are required");
    }

    #[tokio::test]
    async fn test_variations_are_capped() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/personalized-message/variations?count=9",
            Some(json!({ "name": "Jane Doe", "job_title": "CTO", "company": "Initech" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 5);
        assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_profile_listing_search_and_stats() {
        let store = Arc::new(MemoryProfileStore::default());
        store.seed(profile("jane-doe", "Jane Doe", "Initech", "Berlin", 1));
        store.seed(profile("ada-lovelace", "Ada Lovelace", "Initech", "London", 2));
        store.seed(profile("alan-turing", "Alan Turing", "Bletchley", "London", 48));
        let app = app_with(store, ScrapeOutcome::succeeded(Vec::new(), 0));

        let (status, page) = send(&app, Method::GET, "/api/profiles?page=2&limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 3);
        assert_eq!(page["pages"], 2);
        assert_eq!(page["page"], 2);
        assert_eq!(page["count"], 1);
        assert_eq!(page["data"][0]["fullName"], "Alan Turing");

        let (status, far) = send(
            &app,
            Method::GET,
            "/api/profiles?page=9223372036854775807",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(far["page"], crate::profiles::handlers::MAX_PAGE);
        assert_eq!(far["count"], 0);
        assert_eq!(far["total"], 3);

        let (_, filtered) = send(&app, Method::GET, "/api/profiles?company=initech", None).await;
        assert_eq!(filtered["total"], 2);

        let (status, body) = send(&app, Method::GET, "/api/profiles/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "LinkedIn URL is required");

        let (_, found) = send(&app, Method::GET, "/api/profiles/search?url=ADA", None).await;
        assert_eq!(found["count"], 1);

        let (_, stats) = send(&app, Method::GET, "/api/profiles/stats", None).await;
        assert_eq!(stats["data"]["totalProfiles"], 3);
        assert_eq!(stats["data"]["recentlyScraped"], 2);
        assert_eq!(stats["data"]["topCompanies"][0], json!({ "_id": "Initech", "count": 2 }));
        assert_eq!(stats["data"]["topLocations"][0], json!({ "_id": "London", "count": 2 }));
    }

    #[tokio::test]
    async fn test_profile_get_and_delete() {
        let store = Arc::new(MemoryProfileStore::default());
        store.seed(profile("jane-doe", "Jane Doe", "Initech", "Berlin", 1));
        let app = app_with(Arc::clone(&store), ScrapeOutcome::succeeded(Vec::new(), 0));

        let (status, body) = send(&app, Method::GET, "/api/profiles/jane-doe", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["profileUrl"], "https://www.linkedin.com/in/jane-doe");

        let (status, body) = send(&app, Method::DELETE, "/api/profiles/jane-doe", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Profile deleted successfully");
        assert_eq!(store.len(), 0);

        let (status, body) = send(&app, Method::GET, "/api/profiles/jane-doe", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Profile not found");
    }

    #[tokio::test]
    async fn test_scrape_validates_url() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/api/profiles/scrape", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "LinkedIn search URL is required");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/profiles/scrape",
            Some(json!({ "url": "https://www.linkedin.com/in/jane-doe" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid LinkedIn search URL format");
    }

    #[tokio::test]
    async fn test_scrape_success_and_failure_bodies() {
        let scraped = ScrapedProfile {
            full_name: "Jane Doe".into(),
            profile_url: LEAD.into(),
            ..Default::default()
        };
        let ok = app_with(
            Arc::new(MemoryProfileStore::default()),
            ScrapeOutcome::succeeded(vec![scraped], 1),
        );
        let (status, body) = send(
            &ok,
            Method::POST,
            "/api/profiles/scrape",
            Some(json!({ "url": SEARCH_URL, "maxProfiles": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["fullName"], "Jane Doe");

        let failing = app_with(
            Arc::new(MemoryProfileStore::default()),
            ScrapeOutcome::failed(&"Login timeout - please try again and complete login faster"),
        );
        let (status, body) = send(
            &failing,
            Method::POST,
            "/api/profiles/scrape",
            Some(json!({ "url": SEARCH_URL })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["count"], 0);
        assert!(body["message"].as_str().unwrap().starts_with("Scraping failed: Login timeout"));
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin() {
        let app = app().layer(build_cors(&["http://localhost:3000".to_string()]));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/campaigns")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }
}
