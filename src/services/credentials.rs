//! Login and registration: validate locally, then ask the identity provider.
//!
//! Validation always runs first; a form with any field error never reaches
//! the provider. Provider refusals are surfaced verbatim and never retried.

use serde::Deserialize;
use tracing::{info, warn};

use super::session::{SessionStore, SessionUser};
use crate::error::FieldError;
use crate::identity::IdentityProvider;
use crate::identity::types::IdentityError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGIN_SUCCESS: &str = "Login successful.";
pub const REGISTER_SUCCESS: &str = "Registration successful.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid form")]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Provider(#[from] IdentityError),
}

/// A new session plus what the caller should show next.
#[derive(Debug)]
pub struct SignedIn {
    pub user: SessionUser,
    pub token: String,
    pub redirect: &'static str,
    pub message: &'static str,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Lower-cased, trimmed email if it has exactly one `@`, a non-empty local
/// part, and a dotted domain.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
        return None;
    }
    let parts = normalized.split('@').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0].is_empty() {
        return None;
    }
    let domain = parts[1];
    let labels = domain.split('.').collect::<Vec<_>>();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return None;
    }
    Some(normalized)
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if email.trim().is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if normalize_email(email).is_none() {
        errors.push(FieldError::new("email", "Invalid email address"));
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new("password", "Password must be at least 6 characters"));
    }
}

#[must_use]
pub fn validate_login(form: &LoginForm) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check_email(&form.email, &mut errors);
    check_password(&form.password, &mut errors);
    errors
}

#[must_use]
pub fn validate_register(form: &RegisterForm) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if form.username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    }
    check_email(&form.email, &mut errors);
    check_password(&form.password, &mut errors);
    errors
}

// =============================================================================
// PROVIDER CALLS
// =============================================================================

pub async fn login(
    identity: &dyn IdentityProvider,
    sessions: &SessionStore,
    form: &LoginForm,
) -> Result<SignedIn, CredentialError> {
    let errors = validate_login(form);
    if !errors.is_empty() {
        return Err(CredentialError::Invalid(errors));
    }
    let email = normalize_email(&form.email).unwrap_or_default();

    let user = identity
        .sign_in(&email, &form.password)
        .await
        .inspect_err(|e| warn!(error = %e, "credentials: sign-in rejected"))?;
    info!(uid = %user.uid, "credentials: signed in");

    let user = SessionUser::from(user);
    let token = sessions.create(user.clone());
    Ok(SignedIn { user, token, redirect: DASHBOARD_PATH, message: LOGIN_SUCCESS })
}

pub async fn register(
    identity: &dyn IdentityProvider,
    sessions: &SessionStore,
    form: &RegisterForm,
) -> Result<SignedIn, CredentialError> {
    let errors = validate_register(form);
    if !errors.is_empty() {
        return Err(CredentialError::Invalid(errors));
    }
    let email = normalize_email(&form.email).unwrap_or_default();

    let user = identity
        .sign_up(&email, &form.password, Some(form.username.trim()))
        .await
        .inspect_err(|e| warn!(error = %e, "credentials: sign-up rejected"))?;
    info!(uid = %user.uid, "credentials: registered");

    let user = SessionUser::from(user);
    let token = sessions.create(user.clone());
    Ok(SignedIn { user, token, redirect: DASHBOARD_PATH, message: REGISTER_SUCCESS })
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
