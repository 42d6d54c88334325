//! Firebase Identity Toolkit client: email/password sign-in and sign-up.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::IdentityConfig;
use super::types::{IdentityError, IdentityProvider, IdentityUser};

pub struct FirebaseAuth {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FirebaseAuth {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IdentityError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key, base_url: config.base_url })
    }

    async fn call(&self, endpoint: &str, body: &PasswordRequest<'_>) -> Result<IdentityUser, IdentityError> {
        let resp = self
            .http
            .post(format!("{}/accounts:{endpoint}", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::ApiRequest(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| IdentityError::ApiRequest(e.to_string()))?;
        if !status.is_success() {
            return Err(parse_error_response(&text));
        }
        parse_account_response(&text)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        let body = PasswordRequest { email, password, display_name: None, return_secure_token: true };
        self.call("signInWithPassword", &body).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<IdentityUser, IdentityError> {
        let body = PasswordRequest { email, password, display_name, return_secure_token: true };
        self.call("signUp", &body).await
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
}

pub(crate) fn parse_account_response(json_text: &str) -> Result<IdentityUser, IdentityError> {
    let account: AccountResponse =
        serde_json::from_str(json_text).map_err(|e| IdentityError::ApiParse(e.to_string()))?;
    Ok(IdentityUser {
        uid: account.local_id,
        email: account.email,
        display_name: account.display_name.filter(|n| !n.is_empty()),
    })
}

/// Turn `{"error":{"message":"EMAIL_EXISTS"}}` into a rejection with readable text.
pub(crate) fn parse_error_response(json_text: &str) -> IdentityError {
    let code = serde_json::from_str::<Value>(json_text)
        .ok()
        .and_then(|root| {
            root.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });
    let Some(code) = code else {
        return IdentityError::ApiParse(format!("unexpected error response: {json_text}"));
    };
    // Messages may carry detail after a colon, e.g. "WEAK_PASSWORD : Password should be ...".
    let key = code.split(':').next().unwrap_or_default().trim().to_owned();
    let message = describe_error(&key).map_or_else(|| code.clone(), str::to_owned);
    IdentityError::Rejected { code: key, message }
}

fn describe_error(code: &str) -> Option<&'static str> {
    Some(match code {
        "EMAIL_EXISTS" => "The email address is already in use by another account.",
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password.",
        "USER_DISABLED" => "This account has been disabled.",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.",
        "WEAK_PASSWORD" => "Password should be at least 6 characters.",
        "INVALID_EMAIL" => "The email address is badly formatted.",
        "OPERATION_NOT_ALLOWED" => "Password sign-in is disabled for this project.",
        _ => return None,
    })
}

#[cfg(test)]
#[path = "firebase_test.rs"]
mod tests;
