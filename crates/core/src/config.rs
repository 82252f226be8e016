//! Runtime configuration for the proxy, read from the environment once at
//! startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 4000;

/// Default snapshot file path, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = "data/state.json";

/// Default market category allow-list.
pub const DEFAULT_ALLOWED_CATEGORIES: &str = "sports,crypto,financials";

/// Proxy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Path of the persisted state snapshot.
    pub state_file: PathBuf,

    /// Market categories the markets endpoint is allowed to surface,
    /// lowercased.
    pub allowed_categories: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            allowed_categories: parse_categories(DEFAULT_ALLOWED_CATEGORIES),
        }
    }
}

impl AppConfig {
    /// Builds the configuration from environment variables, falling back
    /// to defaults for anything unset or unparseable.
    ///
    /// Reads `PORT`, `ARB_DESK_STATE_FILE`, and
    /// `KALSHI_ALLOWED_CATEGORIES`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let state_file = std::env::var("ARB_DESK_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.state_file);

        let allowed_categories = std::env::var("KALSHI_ALLOWED_CATEGORIES")
            .map(|raw| parse_categories(&raw))
            .unwrap_or(defaults.allowed_categories);

        Self {
            host: defaults.host,
            port,
            state_file,
            allowed_categories,
        }
    }

    /// Returns the bind address as `host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Splits a comma-separated category list, trimming, lowercasing, and
/// dropping empty entries.
#[must_use]
pub fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}
