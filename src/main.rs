mod assistant;
mod config;
mod db;
mod error;
mod identity;
mod models;
mod routes;
mod services;
mod state;

use std::time::Duration;

use services::chat::ChatRegistry;
use services::session::SessionStore;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let store = db::open_store(config.database_url.as_deref(), config.db_max_connections)
        .await
        .expect("transaction store init failed");

    // Vendors are optional: their routes answer 503 when unconfigured.
    let identity = match identity::from_env() {
        Ok(provider) => {
            tracing::info!("identity provider initialized");
            Some(provider)
        }
        Err(e) => {
            tracing::warn!(error = %e, "identity provider not configured; sign-in disabled");
            None
        }
    };
    let chats = match assistant::Assistant::from_env() {
        Ok(assistant) => {
            tracing::info!(model = %assistant.model, "assistant client initialized");
            Some(ChatRegistry::new(assistant))
        }
        Err(e) => {
            tracing::warn!(error = %e, "assistant not configured; chat disabled");
            None
        }
    };

    let sessions = SessionStore::new(config.session_ttl);
    let state = state::AppState::new(store, sessions.clone(), identity, chats.clone())
        .with_cookie_secure(config.cookie_secure)
        .with_web_dir(config.web_dir.clone());

    let purge_chats = chats.clone();
    let _purge = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired sessions removed");
            }
            // A chat outlives its user's last session only until this tick.
            if let Some(chats) = &purge_chats {
                let closed = chats.retain(|uid| sessions.has_user(uid)).await;
                if closed > 0 {
                    tracing::debug!(closed, "orphaned chat sessions closed");
                }
            }
        }
    });

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "msme-support listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("server failed");

    if let Some(chats) = chats {
        chats.close_all().await;
    }
}
