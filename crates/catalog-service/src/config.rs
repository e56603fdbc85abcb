//! Configuration management for the catalog service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;

const DEFAULT_UPLOAD_URL: &str = "https://api.cloudinary.com/v1_1/dzrn84j0i/auto/upload";
const MAX_PAGE_SIZE: usize = 100;

/// Where documents live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    pub store_backend: StoreBackend,

    /// Redis connection URL
    pub redis_url: String,

    /// Bearer token for the admin routes
    pub admin_token: Option<String>,

    /// Media service upload endpoint
    pub media_upload_url: String,

    /// Unsigned upload profile name
    pub media_upload_preset: String,

    /// Catalog page size when a request names none
    pub page_size: usize,

    /// Entries shown in the admin activity feed
    pub activity_limit: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store_backend = match var("STORE_BACKEND", "redis").to_lowercase().as_str() {
            "redis" => StoreBackend::Redis,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("Unknown STORE_BACKEND: {}", other),
        };

        let config = Config {
            api_host: var("API_HOST", "0.0.0.0"),

            api_port: var("API_PORT", "8090")
                .parse()
                .context("Invalid API_PORT")?,

            store_backend,

            redis_url: var("REDIS_URL", "redis://127.0.0.1:6379"),

            admin_token: lookup("ADMIN_TOKEN").filter(|token| !token.trim().is_empty()),

            media_upload_url: var("MEDIA_UPLOAD_URL", DEFAULT_UPLOAD_URL),

            media_upload_preset: var("MEDIA_UPLOAD_PRESET", "ml_default"),

            page_size: var("PAGE_SIZE", "12").parse().context("Invalid PAGE_SIZE")?,

            activity_limit: var("ACTIVITY_LIMIT", "10")
                .parse()
                .context("Invalid ACTIVITY_LIMIT")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            anyhow::bail!("PAGE_SIZE must be between 1 and {}", MAX_PAGE_SIZE);
        }

        if self.store_backend == StoreBackend::Redis && self.admin_token.is_none() {
            anyhow::bail!("ADMIN_TOKEN is required with the redis backend");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Largest page a client may ask for
    pub fn max_page_size(&self) -> usize {
        MAX_PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[("ADMIN_TOKEN", "segredo")]).expect("Failed to load config");

        assert_eq!(config.api_host, "0.0.0.0");
        assert_eq!(config.api_port, 8090);
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.media_upload_preset, "ml_default");
        assert_eq!(config.page_size, 12);
        assert_eq!(config.activity_limit, 10);
    }

    #[test]
    fn test_api_address() {
        let config = load(&[("STORE_BACKEND", "memory"), ("API_HOST", "127.0.0.1"), ("API_PORT", "9000")]).unwrap();
        assert_eq!(config.api_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_redis_backend_requires_admin_token() {
        let result = load(&[]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ADMIN_TOKEN"));

        let config = load(&[("STORE_BACKEND", "memory"), ("ADMIN_TOKEN", "  ")]).unwrap();
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_validate_invalid_values() {
        let err = load(&[("STORE_BACKEND", "memory"), ("API_PORT", "0")]).unwrap_err();
        assert!(err.to_string().contains("API_PORT must be greater than 0"));

        assert!(load(&[("STORE_BACKEND", "memory"), ("PAGE_SIZE", "0")]).is_err());
        assert!(load(&[("STORE_BACKEND", "memory"), ("PAGE_SIZE", "101")]).is_err());
        assert!(load(&[("STORE_BACKEND", "sqlite")]).is_err());
    }
}
