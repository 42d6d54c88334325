use std::sync::Arc;

use super::*;
use crate::routes::auth::logout;
use crate::assistant::types::{AssistantApi, AssistantError, AssistantSpec, Run, RunStatus, ThreadMessage};
use crate::services::chat::{GREETING, RunPhase};
use crate::state::test_helpers;

/// Every run completes on the first poll with a fixed reply.
struct EchoAssistant;

#[async_trait::async_trait]
impl AssistantApi for EchoAssistant {
    async fn create_assistant(&self, _spec: &AssistantSpec) -> Result<String, AssistantError> {
        Ok("asst".into())
    }
    async fn create_thread(&self) -> Result<String, AssistantError> {
        Ok("thread".into())
    }
    async fn post_message(&self, _thread_id: &str, _content: &str) -> Result<(), AssistantError> {
        Ok(())
    }
    async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> Result<Run, AssistantError> {
        Ok(Run { id: "run".into(), thread_id: thread_id.into(), status: RunStatus::Queued })
    }
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        Ok(Run { id: run_id.into(), thread_id: thread_id.into(), status: RunStatus::Completed })
    }
    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
        Ok(vec![ThreadMessage {
            id: "m1".into(),
            role: "assistant".into(),
            run_id: Some("run".into()),
            text: Some("Track your margins.".into()),
        }])
    }
}

fn auth(state: &AppState) -> AuthUser {
    let token = test_helpers::sign_in(state, "alice");
    let user = state.sessions.validate(&token).unwrap();
    AuthUser { user, token }
}

#[test]
fn chat_error_to_status_maps_overlap_to_conflict() {
    assert_eq!(chat_error_to_status(&ChatError::RunInProgress), StatusCode::CONFLICT);
    assert_eq!(chat_error_to_status(&ChatError::NoSession), StatusCode::NOT_FOUND);
    assert_eq!(chat_error_to_status(&ChatError::EmptyMessage), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unconfigured_assistant_is_unavailable() {
    let state = test_helpers::test_app_state();
    let err = open_session(State(state.clone()), auth(&state)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test(start_paused = true)]
async fn open_send_get_close() {
    let state = test_helpers::test_app_state_with_assistant(Arc::new(EchoAssistant));

    let Json(opened) = open_session(State(state.clone()), auth(&state)).await.unwrap();
    assert_eq!(opened.history[0].content, GREETING);

    let body = SendMessage { message: "How do I grow?".into() };
    let Json(after) = send_message(State(state.clone()), auth(&state), Json(body)).await.unwrap();
    assert_eq!(after.phase, RunPhase::Completed);
    assert_eq!(after.history.len(), 3);
    assert_eq!(after.history[2].content, "Track your margins.");

    let Json(fetched) = get_session(State(state.clone()), auth(&state)).await.unwrap();
    assert_eq!(fetched, after);

    assert_eq!(close_session(State(state.clone()), auth(&state)).await.unwrap(), StatusCode::NO_CONTENT);
    let err = get_session(State(state.clone()), auth(&state)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_without_open_session_is_not_found() {
    let state = test_helpers::test_app_state_with_assistant(Arc::new(EchoAssistant));
    let body = SendMessage { message: "hi".into() };
    let err = send_message(State(state.clone()), auth(&state), Json(body)).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_keeps_chat_while_another_session_is_live() {
    let state = test_helpers::test_app_state_with_assistant(Arc::new(EchoAssistant));
    let laptop = auth(&state);
    let phone = auth(&state);
    let again = AuthUser { user: laptop.user.clone(), token: laptop.token.clone() };
    open_session(State(state.clone()), again).await.unwrap();
    let chats = state.chats.clone().unwrap();

    let _ = logout(State(state.clone()), laptop).await;
    assert!(chats.get("alice").await.is_some());

    let _ = logout(State(state.clone()), phone).await;
    assert!(chats.get("alice").await.is_none());
}
