use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use regex::Regex;
use tracing::{info, warn};

const DEFAULT_DATABASE: &str = "outflo";

static CREDENTIALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([^:@/]+)@").expect("valid regex"));

/// Creates the MongoDB client and returns a handle to the application database.
///
/// The driver connects lazily, so an unreachable server does not stop startup:
/// the failed ping is logged and requests will surface database errors until
/// the server becomes reachable. Indexes are owned by the stores.
pub async fn connect(uri: &str, database_override: Option<&str>) -> Result<Database> {
    info!("Connecting to MongoDB at {}", mask_uri(uri));

    let mut options = ClientOptions::parse(uri)
        .await
        .context("MONGODB_URI is not a valid connection string")?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    options.max_pool_size = Some(10);
    options.server_selection_timeout = Some(Duration::from_secs(5));

    let database_name = database_override
        .map(str::to_string)
        .or_else(|| options.default_database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(options)?;
    let db = client.database(&database_name);

    match db.run_command(doc! { "ping": 1 }).await {
        Ok(_) => info!("Connected to MongoDB (database: {database_name})"),
        Err(e) => warn!("MongoDB ping failed, starting without a confirmed connection: {e}"),
    }

    Ok(db)
}

/// Hides the password part of a connection string.
pub fn mask_uri(uri: &str) -> String {
    CREDENTIALS_RE.replace(uri, ":****@").into_owned()
}
