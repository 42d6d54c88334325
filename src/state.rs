//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the transaction store, the session table, and the optional
//! vendor integrations. A vendor left unconfigured is `None`; its routes
//! answer 503 while the rest of the service keeps working.

use std::path::PathBuf;
use std::sync::Arc;

use crate::db::TransactionStore;
use crate::identity::IdentityProvider;
use crate::services::chat::ChatRegistry;
use crate::services::session::SessionStore;

/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TransactionStore>,
    pub sessions: SessionStore,
    /// `None` if `FIREBASE_*` is not configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    /// `None` if `OPENAI_*` is not configured.
    pub chats: Option<ChatRegistry>,
    pub cookie_secure: bool,
    /// Built single-page app served for page routes.
    pub web_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn TransactionStore>,
        sessions: SessionStore,
        identity: Option<Arc<dyn IdentityProvider>>,
        chats: Option<ChatRegistry>,
    ) -> Self {
        Self {
            store,
            sessions,
            identity,
            chats,
            cookie_secure: false,
            web_dir: PathBuf::from(crate::config::DEFAULT_WEB_DIR),
        }
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_web_dir(mut self, web_dir: PathBuf) -> Self {
        self.web_dir = web_dir;
        self
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
