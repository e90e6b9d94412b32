use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;

/// Service configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection URL. Required.
    pub database_url: String,
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_db_pool_max_size")]
    pub db_pool_max_size: u32,
    /// Lifetime of a bearer token from login or refresh.
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
}

fn default_server_host() -> String {
    "0.0.0.0".into()
}

fn default_server_port() -> u16 {
    3000
}

fn default_db_pool_max_size() -> u32 {
    10
}

fn default_session_ttl_minutes() -> i64 {
    12 * 60
}

impl Config {
    pub fn from_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config =
            envy::from_iter(vars).context("Missing or invalid configuration variables")?;
        if config.session_ttl_minutes <= 0 {
            anyhow::bail!("SESSION_TTL_MINUTES must be positive");
        }
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::minutes(self.session_ttl_minutes)
    }
}

/// Reads the process environment into a [`Config`]. `.env` is loaded earlier
/// by `bootstrap::init_env`.
pub fn load() -> Result<Config> {
    Config::from_iter(std::env::vars())
}
