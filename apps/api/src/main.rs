mod campaigns;
mod config;
mod db;
mod errors;
mod llm_client;
mod messages;
mod models;
mod profiles;
mod response;
mod routes;
mod scraper;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::messages::generator::LlmMessageGenerator;
use crate::routes::{build_cors, build_router};
use crate::scraper::chromium::ChromiumLauncher;
use crate::scraper::strategy::SearchResultStrategy;
use crate::scraper::workflow::{ScrapeWorkflow, ScraperSettings};
use crate::state::AppState;
use crate::store::mongo::{MongoCampaignStore, MongoProfileStore};
use crate::store::{CampaignStore, ProfileStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={level},tower_http={level}",
                env!("CARGO_PKG_NAME"),
                level = config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Outreach API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize MongoDB
    let db = db::connect(&config.mongodb_uri, config.mongodb_database.as_deref()).await?;
    let profile_store = MongoProfileStore::new(&db);
    if let Err(e) = profile_store.ensure_indexes().await {
        warn!("Could not create indexes yet, retrying on first profile write: {e}");
    }
    let campaigns: Arc<dyn CampaignStore> = Arc::new(MongoCampaignStore::new(&db));
    let profiles: Arc<dyn ProfileStore> = Arc::new(profile_store);

    // Initialize LLM client (optional: no key means template messages only)
    let llm = match &config.openai_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone(), &config.openai_base_url)?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(client)
        }
        None => {
            warn!("OPENAI_API_KEY not set, personalized messages will use fallback templates");
            None
        }
    };

    // Initialize scraper
    let scraper = ScrapeWorkflow::new(
        Arc::new(ChromiumLauncher::new(
            config.scraper_headless,
            config.chrome_executable.clone(),
        )),
        Arc::new(SearchResultStrategy::default()),
        Arc::clone(&profiles),
        ScraperSettings {
            debug_dir: config.scraper_debug_dir.clone(),
            ..Default::default()
        },
    );
    info!(
        headless = config.scraper_headless,
        "Scraper ready (debug screenshots in {})",
        config.scraper_debug_dir.display()
    );

    // Build app state
    let state = AppState {
        campaigns,
        profiles,
        messages: Arc::new(LlmMessageGenerator::new(llm)),
        scraper: Arc::new(scraper),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal, starting graceful shutdown");
}
