//! Assistant chat routes. One chat session per signed-in user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::auth::AuthUser;
use crate::services::chat::{ChatError, ChatRegistry, ChatSnapshot};
use crate::state::AppState;

pub(crate) fn chat_error_to_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::EmptyMessage => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::RunInProgress | ChatError::Closed => StatusCode::CONFLICT,
        ChatError::NoSession => StatusCode::NOT_FOUND,
        ChatError::Assistant(_) => StatusCode::BAD_GATEWAY,
    }
}

fn chat_error(err: ChatError) -> ApiError {
    ApiError::new(chat_error_to_status(&err), &err)
}

fn registry(state: &AppState) -> Result<&ChatRegistry, ApiError> {
    state.chats.as_ref().ok_or_else(|| ApiError::unavailable("assistant"))
}

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    #[serde(default)]
    pub message: String,
}

/// `POST /api/assistant/session`: open (or reuse) the user's chat.
pub async fn open_session(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ChatSnapshot>, ApiError> {
    let session = registry(&state)?.open(&auth.user.uid).await.map_err(chat_error)?;
    Ok(Json(session.snapshot()))
}

/// `GET /api/assistant/session`
pub async fn get_session(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ChatSnapshot>, ApiError> {
    let session = registry(&state)?
        .get(&auth.user.uid)
        .await
        .ok_or_else(|| chat_error(ChatError::NoSession))?;
    Ok(Json(session.snapshot()))
}

/// `DELETE /api/assistant/session`: tear down, cancelling any pending run.
pub async fn close_session(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode, ApiError> {
    if registry(&state)?.close(&auth.user.uid).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(chat_error(ChatError::NoSession))
    }
}

/// `POST /api/assistant/messages`: send and wait for the run to finish.
/// The answer's `phase` says how it ended.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<SendMessage>,
) -> Result<Json<ChatSnapshot>, ApiError> {
    let snapshot = registry(&state)?
        .send(&auth.user.uid, &body.message)
        .await
        .map_err(chat_error)?;
    Ok(Json(snapshot))
}

#[cfg(test)]
#[path = "assistant_test.rs"]
mod tests;
