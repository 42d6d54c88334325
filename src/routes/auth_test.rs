use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::identity::IdentityProvider;
use crate::identity::types::IdentityUser;
use crate::state::test_helpers;

struct MockIdentity {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl IdentityProvider for MockIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if password == "wrong-password" {
            return Err(IdentityError::Rejected { code: "INVALID_PASSWORD".into(), message: "Invalid password".into() });
        }
        Ok(IdentityUser { uid: "uid-1".into(), email: email.into(), display_name: None })
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        display_name: Option<&str>,
    ) -> Result<IdentityUser, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(IdentityUser { uid: "uid-2".into(), email: email.into(), display_name: display_name.map(str::to_owned) })
    }
}

fn state_with_identity() -> (AppState, Arc<MockIdentity>) {
    let identity = Arc::new(MockIdentity { calls: AtomicUsize::new(0) });
    (test_helpers::test_app_state_with_identity(identity.clone()), identity)
}

fn login_form(email: &str, password: &str) -> LoginForm {
    LoginForm { email: email.into(), password: password.into() }
}

// =============================================================================
// identity_error_to_status
// =============================================================================

#[test]
fn rejected_credentials_are_bad_request() {
    let err = IdentityError::Rejected { code: "EMAIL_EXISTS".into(), message: "taken".into() };
    assert_eq!(identity_error_to_status(&err), StatusCode::BAD_REQUEST);
}

#[test]
fn transport_failures_are_bad_gateway() {
    assert_eq!(identity_error_to_status(&IdentityError::ApiRequest("reset".into())), StatusCode::BAD_GATEWAY);
    assert_eq!(identity_error_to_status(&IdentityError::ApiParse("eof".into())), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// session_user
// =============================================================================

#[test]
fn session_user_requires_known_cookie() {
    let state = test_helpers::test_app_state();
    assert!(session_user(&state.sessions, &CookieJar::new()).is_none());

    let stale = CookieJar::new().add(Cookie::new(COOKIE_NAME, "deadbeef"));
    assert!(session_user(&state.sessions, &stale).is_none());

    let token = test_helpers::sign_in(&state, "alice");
    let jar = CookieJar::new().add(Cookie::new(COOKIE_NAME, token.clone()));
    let (user, found) = session_user(&state.sessions, &jar).unwrap();
    assert_eq!(user.uid, "alice");
    assert_eq!(found, token);
}

// =============================================================================
// handlers
// =============================================================================

#[tokio::test]
async fn login_without_provider_is_unavailable() {
    let state = test_helpers::test_app_state();
    let err = login(State(state), CookieJar::new(), Json(login_form("a@b.test", "secret1"))).await.unwrap_err();
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.body.code, "E_NOT_CONFIGURED");
}

#[tokio::test]
async fn login_sets_persistent_http_only_cookie() {
    let (state, _) = state_with_identity();
    let (jar, Json(body)) =
        login(State(state.clone()), CookieJar::new(), Json(login_form("a@b.test", "secret1"))).await.unwrap();

    assert_eq!(body.redirect, "/dashboard");
    assert_eq!(body.message, "Login successful.");
    let cookie = jar.get(COOKIE_NAME).unwrap();
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
    assert_eq!(state.sessions.validate(cookie.value()).map(|u| u.uid), Some("uid-1".into()));
}

#[tokio::test]
async fn short_password_is_rejected_before_provider() {
    let (state, identity) = state_with_identity();
    let form = RegisterForm { username: "asha".into(), email: "asha@shop.test".into(), password: "12345".into() };
    let err = register(State(state), CookieJar::new(), Json(form)).await.unwrap_err();

    assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.body.message, "Password must be at least 6 characters");
    assert_eq!(identity.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_error_text_is_returned() {
    let (state, _) = state_with_identity();
    let err = login(State(state), CookieJar::new(), Json(login_form("a@b.test", "wrong-password")))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.body.message, "Invalid password");
    assert_eq!(err.body.code, "E_IDENTITY_REJECTED");
}

#[tokio::test]
async fn register_answers_with_confirmation() {
    let (state, _) = state_with_identity();
    let form = RegisterForm { username: "Asha".into(), email: "asha@shop.test".into(), password: "secret1".into() };
    let (_, Json(body)) = register(State(state), CookieJar::new(), Json(form)).await.unwrap();
    assert_eq!(body.message, "Registration successful.");
    assert_eq!(body.user.display_name.as_deref(), Some("Asha"));
}

#[tokio::test]
async fn logout_deletes_session() {
    let state = test_helpers::test_app_state();
    let token = test_helpers::sign_in(&state, "alice");
    let user = state.sessions.validate(&token).unwrap();

    let response = logout(State(state.clone()), AuthUser { user, token: token.clone() }).await.into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.sessions.validate(&token).is_none());
}
