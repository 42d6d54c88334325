//! Auth routes: credential forms, session cookie, current user.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use time::Duration;

use crate::error::ApiError;
use crate::identity::types::IdentityError;
use crate::services::credentials::{self, CredentialError, LoginForm, RegisterForm, SignedIn};
use crate::services::session::{SessionStore, SessionUser};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: SessionUser,
    pub token: String,
}

/// Resolve the session cookie in `jar`, if any, to its user.
pub(crate) fn session_user(sessions: &SessionStore, jar: &CookieJar) -> Option<(SessionUser, String)> {
    let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
    if token.is_empty() {
        return None;
    }
    sessions.validate(token).map(|user| (user, token.to_owned()))
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);
        let (user, token) = session_user(&app_state.sessions, &jar).ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(Self { user, token })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub(crate) fn identity_error_to_status(err: &IdentityError) -> StatusCode {
    match err {
        IdentityError::Rejected { .. } => StatusCode::BAD_REQUEST,
        IdentityError::ApiRequest(_) | IdentityError::ApiParse(_) => StatusCode::BAD_GATEWAY,
        IdentityError::ConfigParse(_) | IdentityError::MissingApiKey { .. } => StatusCode::SERVICE_UNAVAILABLE,
        IdentityError::HttpClientBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn credential_error(err: CredentialError) -> ApiError {
    match err {
        CredentialError::Invalid(fields) => ApiError::validation(fields),
        CredentialError::Provider(e) => ApiError::new(identity_error_to_status(&e), &e),
    }
}

fn session_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: SessionUser,
    pub redirect: &'static str,
    pub message: &'static str,
}

fn signed_in_response(state: &AppState, jar: CookieJar, signed_in: SignedIn) -> (CookieJar, Json<AuthResponse>) {
    let ttl = i64::try_from(state.sessions.ttl().as_secs()).unwrap_or(i64::MAX);
    let jar = jar.add(session_cookie(signed_in.token, Duration::seconds(ttl), state.cookie_secure));
    (jar, Json(AuthResponse { user: signed_in.user, redirect: signed_in.redirect, message: signed_in.message }))
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/login`: validate, sign in with the provider, set cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(form): Json<LoginForm>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let Some(identity) = &state.identity else {
        return Err(ApiError::unavailable("identity provider"));
    };
    let signed_in = credentials::login(identity.as_ref(), &state.sessions, &form)
        .await
        .map_err(credential_error)?;
    Ok(signed_in_response(&state, jar, signed_in))
}

/// `POST /api/auth/register`: validate, create the account, set cookie.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(form): Json<RegisterForm>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let Some(identity) = &state.identity else {
        return Err(ApiError::unavailable("identity provider"));
    };
    let signed_in = credentials::register(identity.as_ref(), &state.sessions, &form)
        .await
        .map_err(credential_error)?;
    Ok(signed_in_response(&state, jar, signed_in))
}

/// `GET /api/auth/me`: return current user.
pub async fn me(auth: AuthUser) -> Json<SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout`: delete session, close the chat if it was the
/// user's last one, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    state.sessions.delete(&auth.token);
    // The chat is per user; other browsers signed in as them keep it.
    if let Some(chats) = &state.chats {
        if !state.sessions.has_user(&auth.user.uid) {
            chats.close(&auth.user.uid).await;
        }
    }
    tracing::info!(uid = %auth.user.uid, "signed out");

    let jar = CookieJar::new().add(session_cookie(String::new(), Duration::ZERO, state.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
