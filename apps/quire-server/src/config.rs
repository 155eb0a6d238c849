//! Server policy configuration.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! QUIRE_INVITE_TTL_HOURS=168       # default lifetime of a direct invite
//! QUIRE_INVITE_LINK_TTL_HOURS=720  # default lifetime of an invite link
//! QUIRE_MAX_PAGE_SIZE=100          # upper bound for ListGroups page_size
//! QUIRE_REQUEST_TIMEOUT_MS=10000   # per-request deadline
//! ```

use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_INVITE_TTL_HOURS: i64 = 168;
const DEFAULT_INVITE_LINK_TTL_HOURS: i64 = 720;
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub invite_ttl: chrono::Duration,
    pub invite_link_ttl: chrono::Duration,
    pub max_page_size: u32,
    pub request_timeout: Duration,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            invite_ttl: chrono::Duration::hours(DEFAULT_INVITE_TTL_HOURS),
            invite_link_ttl: chrono::Duration::hours(DEFAULT_INVITE_LINK_TTL_HOURS),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let invite_hours = parse_positive(&lookup, "QUIRE_INVITE_TTL_HOURS", DEFAULT_INVITE_TTL_HOURS)?;
        let link_hours = parse_positive(
            &lookup,
            "QUIRE_INVITE_LINK_TTL_HOURS",
            DEFAULT_INVITE_LINK_TTL_HOURS,
        )?;
        let max_page_size = parse_positive(&lookup, "QUIRE_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE)?;
        let timeout_ms = parse_positive(
            &lookup,
            "QUIRE_REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT_MS,
        )?;

        Ok(Self {
            invite_ttl: hours("QUIRE_INVITE_TTL_HOURS", invite_hours)?,
            invite_link_ttl: hours("QUIRE_INVITE_LINK_TTL_HOURS", link_hours)?,
            max_page_size,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn hours(var: &'static str, value: i64) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::try_hours(value).ok_or_else(|| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn parse_positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    let value: T = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: raw.clone(),
    })?;
    if value <= T::default() {
        return Err(ConfigError::NotPositive(var));
    }
    Ok(value)
}
