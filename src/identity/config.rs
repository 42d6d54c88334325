//! Identity provider configuration parsed from environment variables.

use super::types::IdentityError;

pub const DEFAULT_FIREBASE_AUTH_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl IdentityConfig {
    /// Required: `FIREBASE_API_KEY`.
    /// Optional: `FIREBASE_AUTH_BASE_URL` (emulator or proxy), `IDENTITY_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the timeout is malformed.
    pub fn from_env() -> Result<Self, IdentityError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    ///
    /// Returns an error if the API key is missing or the timeout is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IdentityError> {
        let api_key = lookup("FIREBASE_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| IdentityError::MissingApiKey { var: "FIREBASE_API_KEY".into() })?;
        let base_url = lookup("FIREBASE_AUTH_BASE_URL")
            .unwrap_or_else(|| DEFAULT_FIREBASE_AUTH_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = match lookup("IDENTITY_TIMEOUT_SECS") {
            None => DEFAULT_IDENTITY_TIMEOUT_SECS,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| IdentityError::ConfigParse(format!("IDENTITY_TIMEOUT_SECS: {raw:?}")))?,
        };
        Ok(Self { api_key, base_url, timeout_secs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_google_endpoint() {
        let cfg = IdentityConfig::from_lookup(|k| (k == "FIREBASE_API_KEY").then(|| "AIza-test".to_string())).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_FIREBASE_AUTH_BASE_URL);
        assert_eq!(cfg.timeout_secs, DEFAULT_IDENTITY_TIMEOUT_SECS);
    }

    #[test]
    fn emulator_url_is_trimmed() {
        let cfg = IdentityConfig::from_lookup(|k| match k {
            "FIREBASE_API_KEY" => Some("fake".into()),
            "FIREBASE_AUTH_BASE_URL" => Some("http://localhost:9099/identitytoolkit.googleapis.com/v1/".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.base_url, "http://localhost:9099/identitytoolkit.googleapis.com/v1");
    }

    #[test]
    fn missing_key_errors() {
        let err = IdentityConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, IdentityError::MissingApiKey { .. }));
    }
}
