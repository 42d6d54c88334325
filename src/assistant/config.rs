//! Assistant configuration parsed from environment variables.

use std::time::Duration;

use super::types::AssistantError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ASSISTANT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// How a run is polled: fixed interval, fixed ceiling on accumulated wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub poll: PollPolicy,
    pub timeouts: HttpTimeouts,
}

impl AssistantConfig {
    /// Build typed assistant config from environment variables.
    ///
    /// Required:
    /// - `OPENAI_API_KEY`
    ///
    /// Optional:
    /// - `OPENAI_BASE_URL`: default `https://api.openai.com/v1`
    /// - `ASSISTANT_MODEL`: default `gpt-3.5-turbo`
    /// - `ASSISTANT_POLL_INTERVAL_SECS`: default 5
    /// - `ASSISTANT_POLL_TIMEOUT_SECS`: default 30
    /// - `ASSISTANT_REQUEST_TIMEOUT_SECS`: default 60
    /// - `ASSISTANT_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or a number is malformed.
    pub fn from_env() -> Result<Self, AssistantError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AssistantConfig::from_env`], reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or a number is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AssistantError> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AssistantError::MissingApiKey { var: "OPENAI_API_KEY".into() })?;

        let base_url = lookup("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let model = lookup("ASSISTANT_MODEL").unwrap_or_else(|| DEFAULT_ASSISTANT_MODEL.to_string());

        let interval = parse_secs(&lookup, "ASSISTANT_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let timeout = parse_secs(&lookup, "ASSISTANT_POLL_TIMEOUT_SECS", DEFAULT_POLL_TIMEOUT_SECS)?;
        if interval == 0 {
            return Err(AssistantError::ConfigParse("ASSISTANT_POLL_INTERVAL_SECS must be positive".into()));
        }

        let timeouts = HttpTimeouts {
            request_secs: parse_secs(&lookup, "ASSISTANT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_secs(&lookup, "ASSISTANT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(Self {
            api_key,
            base_url,
            model,
            poll: PollPolicy { interval: Duration::from_secs(interval), timeout: Duration::from_secs(timeout) },
            timeouts,
        })
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64, AssistantError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| AssistantError::ConfigParse(format!("{key} must be a whole number of seconds, got {raw:?}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
