//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! JSON API under `/api`, the live feed WebSocket, and the single-page
//! app's page routes. Page routes are gated here: `/dashboard*` needs a
//! session and anything unknown goes to `/login`. Static assets come from
//! `WEB_DIR`.

pub mod assistant;
pub mod auth;
pub mod live;
pub mod transactions;

use axum::Router;
use axum::extract::State;
use axum::handler::HandlerWithoutStateExt;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, patch, post};
use axum_extra::extract::cookie::CookieJar;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::resources::{RESOURCES, Resource};
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";

/// Pages that require a session.
const DASHBOARD_PAGES: &[&str] =
    &["/dashboard", "/dashboard/transactions", "/dashboard/Assistance", "/dashboard/assistance"];

fn api_routes() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/transactions", get(transactions::list).post(transactions::create))
        .route("/api/transactions/live", get(live::handle_live))
        .route(
            "/api/transactions/{id}",
            patch(transactions::update).delete(transactions::delete),
        )
        .route(
            "/api/assistant/session",
            get(assistant::get_session)
                .post(assistant::open_session)
                .delete(assistant::close_session),
        )
        .route("/api/assistant/messages", post(assistant::send_message))
        .route("/api/resources", get(resources))
        .layer(cors)
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let mut router = api_routes()
        .route("/healthz", get(healthz))
        .route("/", get(redirect_to_login))
        .route(LOGIN_PATH, get(public_page))
        .route("/register", get(public_page));
    for page in DASHBOARD_PAGES {
        router = router.route(page, get(dashboard_page));
    }

    let assets = ServeDir::new(&state.web_dir)
        .append_index_html_on_directories(false)
        .fallback(redirect_to_login.into_service());

    router.fallback_service(assets).layer(TraceLayer::new_for_http()).with_state(state)
}

// =============================================================================
// PAGES
// =============================================================================

async fn redirect_to_login() -> Redirect {
    Redirect::temporary(LOGIN_PATH)
}

async fn index_html(state: &AppState) -> Response {
    match tokio::fs::read_to_string(state.web_dir.join("index.html")).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, dir = %state.web_dir.display(), "index.html unavailable");
            (StatusCode::NOT_FOUND, "app not built").into_response()
        }
    }
}

async fn public_page(State(state): State<AppState>) -> Response {
    index_html(&state).await
}

/// `/dashboard*`: the app shell for signed-in users, `/login` otherwise.
async fn dashboard_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if auth::session_user(&state.sessions, &jar).is_none() {
        return redirect_to_login().await.into_response();
    }
    index_html(&state).await
}

// =============================================================================
// MISC
// =============================================================================

/// `GET /api/resources`: the dashboard's landing links.
async fn resources() -> Json<&'static [Resource]> {
    Json(RESOURCES)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
