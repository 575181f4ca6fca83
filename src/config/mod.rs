//! Application configuration management

use std::env;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// SQLite connection URL (e.g. `sqlite:./data/spoke.db?mode=rwc`)
    pub database_url: String,

    /// Maximum size of the connection pool
    pub database_max_connections: u32,

    /// JWT secret for token verification
    pub jwt_secret: String,

    /// Public base URL, used to build campaign join links
    pub base_url: String,

    /// Data warehouse host. Superadmins see the warehouse as available when set.
    pub warehouse_db_host: Option<String>,

    /// Expose per-campaign phone number inventory for every organization
    pub campaign_phone_numbers: bool,

    /// Track which users currently have a campaign open for editing
    pub editor_tracking: bool,

    /// Lifetime of read-through cache entries, in seconds
    pub cache_ttl_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite:./data/spoke.db?mode=rwc".to_string(),
            database_max_connections: 10,
            jwt_secret: "dev-secret".to_string(),
            base_url: "http://localhost:3000".to_string(),
            warehouse_db_host: None,
            campaign_phone_numbers: false,
            editor_tracking: false,
            cache_ttl_seconds: 300,
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        // In production JWT_SECRET must be set explicitly
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using development secret");
            defaults.jwt_secret.clone()
        });

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .context("Invalid PORT")?,

            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),

            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .map(|s| s.parse())
                .transpose()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database_max_connections),

            jwt_secret,

            base_url: env::var("BASE_URL").unwrap_or(defaults.base_url),

            warehouse_db_host: env::var("WAREHOUSE_DB_HOST")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            campaign_phone_numbers: env_flag("EXPERIMENTAL_CAMPAIGN_PHONE_NUMBERS"),

            editor_tracking: env_flag("EDITOR_TRACKING"),

            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| defaults.cache_ttl_seconds.to_string())
                .parse()
                .context("Invalid CACHE_TTL_SECONDS")?,
        })
    }
}
