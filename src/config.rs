//! Service configuration parsed from environment variables.
//!
//! Vendor integrations (`IdentityConfig`, `AssistantConfig`) parse their own
//! variables; this covers the process itself.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_WEB_DIR: &str = "web";
pub const DEFAULT_SESSION_TTL_DAYS: u64 = 30;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        "E_CONFIG_PARSE"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: Option<u32>,
    /// Built single-page app; `index.html` is served for page routes.
    pub web_dir: PathBuf,
    pub session_ttl: Duration,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: unset means in-memory store
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `WEB_DIR`: default `web`
    /// - `SESSION_TTL_DAYS`: default 30
    /// - `COOKIE_SECURE`: default false
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`], reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => Some(parse_value("DB_MAX_CONNECTIONS", &raw)?),
            None => None,
        };
        let web_dir = PathBuf::from(lookup("WEB_DIR").unwrap_or_else(|| DEFAULT_WEB_DIR.to_owned()));
        let ttl_days: u64 = parse_or(&lookup, "SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS)?;
        if ttl_days == 0 {
            return Err(ConfigError::Invalid { var: "SESSION_TTL_DAYS", value: "0".into() });
        }
        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { var: "COOKIE_SECURE", value: raw })?,
            None => false,
        };

        Ok(Self {
            port,
            database_url,
            db_max_connections,
            web_dir,
            session_ttl: Duration::from_secs(ttl_days.saturating_mul(SECS_PER_DAY)),
            cookie_secure,
        })
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_value<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid { var, value: raw.to_owned() })
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    lookup(var).map_or(Ok(default), |raw| parse_value(var, &raw))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
