//! Identity: delegated email/password authentication.
//!
//! The provider owns accounts entirely. This crate reads back the unique id
//! and email and keeps its own short session token on top.

pub mod config;
pub mod firebase;
pub mod types;

use std::sync::Arc;

pub use types::IdentityProvider;
use types::IdentityError;

/// Build the configured provider from `FIREBASE_*` environment variables.
///
/// # Errors
///
/// Returns an error if the API key is missing or the HTTP client fails.
pub fn from_env() -> Result<Arc<dyn IdentityProvider>, IdentityError> {
    let config = config::IdentityConfig::from_env()?;
    Ok(Arc::new(firebase::FirebaseAuth::new(config)?))
}
