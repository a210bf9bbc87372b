//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::store::DuplicateKeyPolicy;
use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 3000,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Store behavior configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// What a duplicate unique key does: reject (default) or overwrite.
    pub duplicate_key_policy: DuplicateKeyPolicy,
    /// How many records each summary's recent view returns.
    pub recent_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            duplicate_key_policy: DuplicateKeyPolicy::Reject,
            recent_limit: 10,
        }
    }
}

/// Mirror backends configuration
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub search_enabled: bool,
    pub graph_enabled: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            search_enabled: true,
            graph_enabled: true,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub store: StoreConfig,
    pub mirrors: MirrorConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let server = ServerConfig {
            host: std::env::var("HOST")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(|| ServerConfig::default().port),
        };

        let cors = CorsConfig {
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let duplicate_key_policy = match std::env::var("DUPLICATE_KEY_POLICY") {
            Ok(raw) => DuplicateKeyPolicy::parse(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "DUPLICATE_KEY_POLICY must be 'reject' or 'overwrite', got '{}'",
                    raw
                ))
            })?,
            Err(_) => DuplicateKeyPolicy::Reject,
        };

        let store = StoreConfig {
            duplicate_key_policy,
            recent_limit: std::env::var("SUMMARY_RECENT_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(|| StoreConfig::default().recent_limit),
        };

        let mirrors = MirrorConfig {
            search_enabled: env_flag("SEARCH_MIRROR_ENABLED", true),
            graph_enabled: env_flag("GRAPH_MIRROR_ENABLED", true),
        };

        Ok(Self {
            server,
            cors,
            store,
            mirrors,
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
