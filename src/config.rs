use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.brawlstars.com/v1";
pub const MAX_BATCH_SIZE: usize = 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_keys: Vec<String>,
    pub api_base_url: String,
    pub database_url: Option<String>,
    pub batch_size: usize,
    pub max_in_flight: usize,
    pub batch_timeout: Duration,
    pub stale_after: chrono::Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded environment file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_keys: Vec<String> = lookup("BRAWLSTARS_API_KEY")
            .ok_or(ConfigError::Missing("BRAWLSTARS_API_KEY"))?
            .split('#')
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        if api_keys.is_empty() {
            return Err(ConfigError::Missing("BRAWLSTARS_API_KEY"));
        }

        let batch_size: usize = parse_or(&lookup, "INGEST_BATCH_SIZE", 500)?;
        let stale_hours: i64 = parse_or(&lookup, "INGEST_STALE_AFTER_HOURS", 8)?;

        Ok(Self {
            api_keys,
            api_base_url: lookup("BRAWLSTARS_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            max_in_flight: parse_or(&lookup, "INGEST_MAX_IN_FLIGHT", 100)?,
            batch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "INGEST_BATCH_TIMEOUT_SECS",
                3600,
            )?),
            stale_after: chrono::Duration::hours(stale_hours),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "HTTP_REQUEST_TIMEOUT_SECS",
                30,
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
    }
}
