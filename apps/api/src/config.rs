use std::path::PathBuf;

use anyhow::{bail, Context, Result};

const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/outflo";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";

/// Application configuration loaded from environment variables.
/// Everything has a default except the text-generation key, which is optional:
/// without it message generation runs on the fallback templates.
#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    /// Overrides the database named in the URI path.
    pub mongodb_database: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub port: u16,
    pub rust_log: String,
    pub cors_origins: Vec<String>,
    pub scraper_headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub scraper_debug_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            mongodb_uri: get("MONGODB_URI").unwrap_or_else(|| DEFAULT_MONGODB_URI.to_string()),
            mongodb_database: get("MONGODB_DATABASE"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            port: get("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            cors_origins: split_list(
                &get("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            scraper_headless: match get("SCRAPER_HEADLESS") {
                Some(raw) => parse_bool(&raw).context("SCRAPER_HEADLESS must be a boolean")?,
                None => false,
            },
            chrome_executable: get("CHROME_EXECUTABLE").map(PathBuf::from),
            scraper_debug_dir: get("SCRAPER_DEBUG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised boolean value '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.mongodb_uri, DEFAULT_MONGODB_URI);
        assert_eq!(config.port, 5000);
        assert!(config.openai_api_key.is_none());
        assert!(!config.scraper_headless);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000", "http://localhost:3001"]
        );
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_cors_origins_are_trimmed_and_lose_trailing_slash() {
        let config = config_from(&[(
            "CORS_ORIGINS",
            "https://app.example.com/, http://localhost:3000 ,,",
        )])
        .unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["https://app.example.com", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_headless_flag_parsing() {
        assert!(config_from(&[("SCRAPER_HEADLESS", "TRUE")]).unwrap().scraper_headless);
        assert!(!config_from(&[("SCRAPER_HEADLESS", "off")]).unwrap().scraper_headless);
        assert!(config_from(&[("SCRAPER_HEADLESS", "maybe")]).is_err());
    }
}
