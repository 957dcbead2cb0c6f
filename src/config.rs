//! Configuration loader for `openaq-harvest`.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Nothing else in the crate reads `env::var`.
//!
use std::env;

use anyhow::{anyhow, bail, Result};
use reqwest::Url;

use crate::api::DEFAULT_BASE_URL;
use crate::collector::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Key sent with every API request.
    pub api_key: String,

    /// Measurement API base URL.
    pub api_url: String,

    /// PostgreSQL connection string; only needed by the Postgres sink.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Records requested per page.
    pub api_page_size: u32,

    /// Maximum number of API pages to fetch per sensor (safety limit).
    pub api_max_pages: u32,

    /// Per-request HTTP timeout in seconds.
    pub api_timeout_secs: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `OPENAQ_API_KEY` – API key for the measurement service
///
/// Optional:
/// - `OPENAQ_API_URL` – API base URL (default: production v3 endpoint)
/// - `DATABASE_URL` – PostgreSQL connection string (Postgres sink only)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `API_PAGE_SIZE` – records per page (default: 1000)
/// - `API_MAX_PAGES` – max API pages per sensor (default: 100)
/// - `API_TIMEOUT_SECS` – HTTP timeout (default: 30)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let api_key = require_env!("OPENAQ_API_KEY");
    let api_url = env::var("OPENAQ_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let db_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let api_page_size = parse_env_u32!("API_PAGE_SIZE", DEFAULT_PAGE_SIZE);
    let api_max_pages = parse_env_u32!("API_MAX_PAGES", DEFAULT_MAX_PAGES);
    let api_timeout_secs = parse_env_u32!("API_TIMEOUT_SECS", 30);

    if api_page_size == 0 {
        bail!("Invalid API_PAGE_SIZE: must be at least 1");
    }
    if api_max_pages == 0 {
        bail!("Invalid API_MAX_PAGES: must be at least 1");
    }

    Ok(Config {
        api_key,
        api_url,
        db_url,
        db_pool_max,
        api_page_size,
        api_max_pages,
        api_timeout_secs,
    })
}

/// Replace the password in a connection string with `****`.
///
/// Strings that do not parse as a URL are hidden entirely, since there is no
/// reliable way to tell where the password sits.
fn mask_db_url(db_url: &str) -> String {
    // ---
    let Ok(mut url) = Url::parse(db_url) else {
        return "(unparseable)".to_string();
    };
    if url.password().is_some() && url.set_password(Some("****")).is_err() {
        return "(unparseable)".to_string();
    }
    url.to_string()
}

/// Keep only the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    // ---
    let len = secret.chars().count();
    if len <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(len - 4).collect();
    format!("****{tail}")
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password and API key while showing all other
    /// configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_db_url = self
            .db_url
            .as_deref()
            .map_or_else(|| "(unset)".to_string(), mask_db_url);

        tracing::info!("Configuration loaded:");
        tracing::info!("  OPENAQ_API_KEY   : {}", mask_secret(&self.api_key));
        tracing::info!("  OPENAQ_API_URL   : {}", self.api_url);
        tracing::info!("  DATABASE_URL     : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX      : {}", self.db_pool_max);
        tracing::info!("  API_PAGE_SIZE    : {}", self.api_page_size);
        tracing::info!("  API_MAX_PAGES    : {}", self.api_max_pages);
        tracing::info!("  API_TIMEOUT_SECS : {}", self.api_timeout_secs);
    }
}
