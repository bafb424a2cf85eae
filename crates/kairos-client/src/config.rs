// Kairos/crates/kairos-client/src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
    pub read_retries: u32,
    pub stale_seconds: u64,
    pub cache_idle_seconds: u64,
    pub cache_capacity: u64,
    pub progress_days: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            token: None,
            timeout_seconds: 30,
            read_retries: 1,
            stale_seconds: 30,
            cache_idle_seconds: 300,
            cache_capacity: 512,
            progress_days: 14,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("Failed to load .env file: {}. Using system environment variables.", e);
        } else {
            info!("Loaded environment variables from .env file");
        }

        let defaults = Self::default();

        let api_url = env::var("KAIROS_API_URL").unwrap_or(defaults.api_url);
        let token = env::var("KAIROS_TOKEN").ok().filter(|t| !t.trim().is_empty());

        let config = Self {
            api_url: normalize_url(&api_url)?,
            token,
            timeout_seconds: env_or("KAIROS_TIMEOUT_SECONDS", defaults.timeout_seconds)?,
            read_retries: env_or("KAIROS_READ_RETRIES", defaults.read_retries)?,
            stale_seconds: env_or("KAIROS_STALE_SECONDS", defaults.stale_seconds)?,
            cache_idle_seconds: env_or("KAIROS_CACHE_IDLE_SECONDS", defaults.cache_idle_seconds)?,
            cache_capacity: env_or("KAIROS_CACHE_CAPACITY", defaults.cache_capacity)?,
            progress_days: env_or("KAIROS_PROGRESS_DAYS", defaults.progress_days)?,
        };

        if config.progress_days == 0 {
            return Err(ClientError::Config("KAIROS_PROGRESS_DAYS must be at least 1".into()));
        }

        info!("Client configuration: api {}, progress window {} days", config.api_url, config.progress_days);
        Ok(config)
    }

    /// Point the config at another base URL (tests and embedding).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_seconds)
    }

    pub fn cache_idle(&self) -> Duration {
        Duration::from_secs(self.cache_idle_seconds)
    }

    pub fn print_config(&self) {
        info!("API URL: {}", self.api_url);
        info!("Token: {}", if self.token.is_some() { "set (masked)" } else { "not set" });
        info!("Request timeout: {}s, read retries: {}", self.timeout_seconds, self.read_retries);
        info!(
            "Cache: stale after {}s, idle eviction {}s, capacity {}",
            self.stale_seconds, self.cache_idle_seconds, self.cache_capacity
        );
        info!("Progress window: {} days", self.progress_days);
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ClientError::Config(format!("{} has invalid value {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::Config(format!(
            "KAIROS_API_URL must start with http:// or https://, got {:?}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> ClientConfig {
        ClientConfig::default().with_api_url("http://localhost:9999/")
    }

    #[test]
    fn test_default_values() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert!(config.token.is_none());
        assert_eq!(config.read_retries, 1);
        assert_eq!(config.progress_days, 14);
    }

    #[test]
    fn test_with_api_url_trims_trailing_slash() {
        let config = create_test_config();
        assert_eq!(config.api_url, "http://localhost:9999");
    }

    #[test]
    fn test_durations() {
        let config = create_test_config();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.stale_after(), Duration::from_secs(30));
        assert_eq!(config.cache_idle(), Duration::from_secs(300));
    }

    #[test]
    fn test_normalize_url_rejects_missing_scheme() {
        assert!(normalize_url("localhost:8000").is_err());
        assert_eq!(normalize_url(" https://api.kairos.app/ ").unwrap(), "https://api.kairos.app");
    }

    #[test]
    fn test_env_or_parses_and_rejects() {
        // Variable names unique to this test so parallel tests don't collide.
        env::set_var("KAIROS_TEST_ENV_OR_OK", " 42 ");
        env::set_var("KAIROS_TEST_ENV_OR_BAD", "forty-two");
        assert_eq!(env_or::<u64>("KAIROS_TEST_ENV_OR_OK", 1).unwrap(), 42);
        assert!(matches!(
            env_or::<u64>("KAIROS_TEST_ENV_OR_BAD", 1),
            Err(ClientError::Config(_))
        ));
        assert_eq!(env_or::<u64>("KAIROS_TEST_ENV_OR_MISSING", 7).unwrap(), 7);
    }
}
