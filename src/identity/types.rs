//! Identity types: provider user, errors, and the provider trait.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The provider API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the provider failed.
    #[error("identity request failed: {0}")]
    ApiRequest(String),

    /// The provider refused the credentials or the request. `message` is the
    /// human-readable text shown next to the form.
    #[error("{message}")]
    Rejected { code: String, message: String },

    /// The provider response body could not be deserialized.
    #[error("identity response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for IdentityError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_IDENTITY_REQUEST",
            Self::Rejected { .. } => "E_IDENTITY_REJECTED",
            Self::ApiParse(_) => "E_IDENTITY_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_))
    }
}

// =============================================================================
// USER
// =============================================================================

/// The subset of the provider's account this service reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    /// Provider-issued unique id. Scopes every transaction query.
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Email/password identity provider. Enables mocking in tests.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str, display_name: Option<&str>)
    -> Result<IdentityUser, IdentityError>;
}
