//! Session management on top of the identity provider.
//!
//! ARCHITECTURE
//! ============
//! The provider proves who the user is once, at sign-in or sign-up. From
//! then on the browser carries an opaque random token in a persistent
//! cookie, and this store maps it back to the provider's user id and email.
//!
//! TRADE-OFFS
//! ==========
//! Sessions live in process memory. A restart signs everyone out; in
//! exchange there is no session table to keep in step with the provider.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::identity::types::IdentityUser;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// The signed-in user as the rest of the service sees it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionUser {
    /// Provider-issued unique id; owner of every transaction query.
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<IdentityUser> for SessionUser {
    fn from(user: IdentityUser) -> Self {
        Self { uid: user.uid, email: user.email, display_name: user.display_name }
    }
}

struct SessionEntry {
    user: SessionUser,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session for the given user, returning the token.
    #[must_use]
    pub fn create(&self, user: SessionUser) -> String {
        self.create_at(user, Instant::now())
    }

    pub(crate) fn create_at(&self, user: SessionUser, now: Instant) -> String {
        let token = generate_token();
        let entry = SessionEntry { user, expires_at: now + self.ttl };
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), entry);
        token
    }

    /// Validate a session token and return the associated user.
    #[must_use]
    pub fn validate(&self, token: &str) -> Option<SessionUser> {
        self.validate_at(token, Instant::now())
    }

    pub(crate) fn validate_at(&self, token: &str, now: Instant) -> Option<SessionUser> {
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match sessions.get(token) {
            Some(entry) if entry.expires_at > now => Some(entry.user.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Delete a session by token. Returns whether it existed.
    pub fn delete(&self, token: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    /// Whether `uid` still holds at least one unexpired session.
    #[must_use]
    pub fn has_user(&self, uid: &str) -> bool {
        self.has_user_at(uid, Instant::now())
    }

    pub(crate) fn has_user_at(&self, uid: &str, now: Instant) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|entry| entry.user.uid == uid && entry.expires_at > now)
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let mut sessions = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
