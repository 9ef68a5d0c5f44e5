use serde::Deserialize;
use std::time::Duration;

use crate::libraries::retention::{RetentionPolicy, DEFAULT_MAX_AGE_SECS};
use crate::services::geocode::DEFAULT_GEOCODE_URL;
use crate::services::mlab::DEFAULT_STORE_BASE_URL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Env(#[from] envy::Error),

    #[error("LOCATION_URL must not be empty")]
    EmptyLocationUrl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Listening port, no default: the service refuses to start without it
    pub port: u16,

    // Collection path on the document store, e.g. /api/1/databases/geo/collections/locations
    pub location_url: String,

    #[serde(default)]
    pub mlab_api_key: String,

    #[serde(default = "default_store_base_url")]
    pub store_base_url: String,

    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    #[serde(default)]
    pub geocode_api_key: Option<String>,

    // Applies to every outbound request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_retention_secs")]
    pub retention_secs: i64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_sweep_initial_delay_secs")]
    pub sweep_initial_delay_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(vars)?;

        if config.location_url.trim().is_empty() {
            return Err(ConfigError::EmptyLocationUrl);
        }

        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age_secs: self.retention_secs,
            initial_delay: Duration::from_secs(self.sweep_initial_delay_secs),
            interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

fn default_store_base_url() -> String {
    DEFAULT_STORE_BASE_URL.to_string()
}

fn default_geocode_url() -> String {
    DEFAULT_GEOCODE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_retention_secs() -> i64 {
    DEFAULT_MAX_AGE_SECS
}

fn default_sweep_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_sweep_initial_delay_secs() -> u64 {
    60 * 60
}
