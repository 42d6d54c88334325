//! Assistant chat: one thread per session, one run per user message.
//!
//! ARCHITECTURE
//! ============
//! `ChatRegistry` holds one `ChatSession` per signed-in user and the id of
//! the remote assistant, created lazily on first use and shared by every
//! session in the process. A session owns its remote thread, its message
//! history, and the phase of the current run.
//!
//! RUN LIFECYCLE
//! =============
//! `Idle -> Sending -> Polling -> Completed | TimedOut | Failed`, or
//! `Cancelled` if the session is closed mid-run. The user's message is
//! appended before anything is sent and is never rolled back. Polling
//! gives up once the wait since the run started exceeds the policy timeout;
//! otherwise it sleeps for the policy interval and fetches the run again. A timed-out or failed run leaves
//! history unchanged; the phase alone reports it.
//!
//! A run executes on its own task, so a caller that stops waiting does not
//! stop the run. Only one run may be outstanding per session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::assistant::Assistant;
use crate::assistant::config::PollPolicy;
use crate::assistant::types::{AssistantApi, AssistantError, AssistantSpec, Run, RunStatus};
use crate::models::ChatMessage;

pub const GREETING: &str = "Hi, I'm your personal assistant. How can I help you?";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a reply is still pending")]
    RunInProgress,
    #[error("no chat session")]
    NoSession,
    #[error("chat session closed")]
    Closed,
    #[error("assistant error: {0}")]
    Assistant(#[from] AssistantError),
}

impl crate::error::ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "E_EMPTY_MESSAGE",
            Self::RunInProgress => "E_RUN_IN_PROGRESS",
            Self::NoSession => "E_NO_CHAT_SESSION",
            Self::Closed => "E_CHAT_CLOSED",
            Self::Assistant(_) => "E_ASSISTANT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RunInProgress) || matches!(self, Self::Assistant(e) if e.retryable())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Sending,
    Polling,
    Completed,
    TimedOut,
    Failed,
    Cancelled,
}

impl RunPhase {
    /// A run is outstanding; the waiting indicator is shown.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Sending | Self::Polling)
    }
}

/// How polling one run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Status `completed`; `reply` is the matching assistant message, if any.
    Completed { reply: Option<String> },
    /// Some other terminal status, e.g. `failed` or `expired`.
    Ended(RunStatus),
    TimedOut,
    Cancelled,
    Failed(String),
}

impl RunOutcome {
    fn phase(&self) -> RunPhase {
        match self {
            Self::Completed { .. } | Self::Ended(_) => RunPhase::Completed,
            Self::TimedOut => RunPhase::TimedOut,
            Self::Cancelled => RunPhase::Cancelled,
            Self::Failed(_) => RunPhase::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSnapshot {
    pub thread_id: String,
    pub history: Vec<ChatMessage>,
    pub phase: RunPhase,
    pub waiting: bool,
    pub error: Option<String>,
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `run` until it leaves `queued`/`in_progress`, the wait exceeds
/// `policy.timeout`, or `cancel` fires. On `completed`, read back the newest
/// assistant message produced by this run.
pub async fn drive_run(
    api: &dyn AssistantApi,
    mut run: Run,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> RunOutcome {
    let started = Instant::now();

    while run.status.is_pending() {
        // Deadline goes before the sleep so every sleep ends in a poll.
        if started.elapsed() > policy.timeout {
            warn!(run = %run.id, waited_ms = started.elapsed().as_millis(), "chat: run timed out");
            return RunOutcome::TimedOut;
        }
        tokio::select! {
            () = cancel.cancelled() => return RunOutcome::Cancelled,
            () = sleep(policy.interval) => {}
        }
        let polled = tokio::select! {
            () = cancel.cancelled() => return RunOutcome::Cancelled,
            polled = api.retrieve_run(&run.thread_id, &run.id) => polled,
        };
        run = match polled {
            Ok(r) => r,
            Err(e) => return RunOutcome::Failed(e.to_string()),
        };
    }

    if run.status != RunStatus::Completed {
        warn!(run = %run.id, status = ?run.status, "chat: run ended without completing");
        return RunOutcome::Ended(run.status);
    }

    match api.list_messages(&run.thread_id).await {
        Ok(messages) => {
            let reply = messages
                .into_iter()
                .find(|m| m.is_assistant() && m.run_id.as_deref() == Some(run.id.as_str()))
                .and_then(|m| m.text);
            RunOutcome::Completed { reply }
        }
        Err(e) => RunOutcome::Failed(e.to_string()),
    }
}

// =============================================================================
// SESSION
// =============================================================================

struct SessionState {
    history: Vec<ChatMessage>,
    phase: RunPhase,
    error: Option<String>,
}

pub struct ChatSession {
    thread_id: String,
    assistant_id: String,
    state: Mutex<SessionState>,
    cancel: CancellationToken,
}

impl ChatSession {
    #[must_use]
    pub fn new(thread_id: String, assistant_id: String) -> Self {
        Self {
            thread_id,
            assistant_id,
            state: Mutex::new(SessionState {
                history: vec![ChatMessage::assistant(GREETING)],
                phase: RunPhase::Idle,
                error: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.lock().phase
    }

    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.lock();
        ChatSnapshot {
            thread_id: self.thread_id.clone(),
            history: state.history.clone(),
            phase: state.phase,
            waiting: state.phase.is_busy(),
            error: state.error.clone(),
        }
    }

    /// Append the user's message and start a run on its own task. The task
    /// resolves to the phase the run finished in.
    ///
    /// # Errors
    ///
    /// Rejects empty input, a session that is closed, or one with a run
    /// still outstanding. Nothing is appended in those cases.
    pub fn send(
        self: &Arc<Self>,
        api: Arc<dyn AssistantApi>,
        policy: PollPolicy,
        text: &str,
    ) -> Result<JoinHandle<RunPhase>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.cancel.is_cancelled() {
            return Err(ChatError::Closed);
        }
        {
            let mut state = self.lock();
            if state.phase.is_busy() {
                return Err(ChatError::RunInProgress);
            }
            state.history.push(ChatMessage::user(text));
            state.phase = RunPhase::Sending;
            state.error = None;
        }

        let session = Arc::clone(self);
        let text = text.to_owned();
        Ok(tokio::spawn(async move {
            let outcome = session.run(api.as_ref(), policy, &text).await;
            session.finish(outcome)
        }))
    }

    async fn run(&self, api: &dyn AssistantApi, policy: PollPolicy, text: &str) -> RunOutcome {
        let started = tokio::select! {
            () = self.cancel.cancelled() => return RunOutcome::Cancelled,
            started = self.start_run(api, text) => started,
        };
        let run = match started {
            Ok(run) => run,
            Err(e) => return RunOutcome::Failed(e.to_string()),
        };
        info!(thread = %self.thread_id, run = %run.id, "chat: run started");
        self.lock().phase = RunPhase::Polling;
        drive_run(api, run, policy, &self.cancel).await
    }

    async fn start_run(&self, api: &dyn AssistantApi, text: &str) -> Result<Run, AssistantError> {
        api.post_message(&self.thread_id, text).await?;
        api.create_run(&self.thread_id, &self.assistant_id).await
    }

    fn finish(&self, outcome: RunOutcome) -> RunPhase {
        let mut state = self.lock();
        match &outcome {
            RunOutcome::Completed { reply: Some(text) } => state.history.push(ChatMessage::assistant(text.clone())),
            RunOutcome::Completed { reply: None } => {
                warn!(thread = %self.thread_id, "chat: completed run has no assistant message");
            }
            RunOutcome::Failed(e) => {
                warn!(thread = %self.thread_id, error = %e, "chat: run failed");
                state.error = Some(e.clone());
            }
            RunOutcome::Ended(_) | RunOutcome::TimedOut | RunOutcome::Cancelled => {}
        }
        state.phase = outcome.phase();
        state.phase
    }

    /// Stop any outstanding run. Later sends are rejected.
    pub fn close(&self) {
        self.cancel.cancel();
        let mut state = self.lock();
        if state.phase.is_busy() {
            state.phase = RunPhase::Cancelled;
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Chat sessions keyed by user id, plus the process-wide assistant.
#[derive(Clone)]
pub struct ChatRegistry {
    assistant: Assistant,
    assistant_id: Arc<OnceCell<String>>,
    sessions: Arc<RwLock<HashMap<String, Arc<ChatSession>>>>,
}

impl ChatRegistry {
    #[must_use]
    pub fn new(assistant: Assistant) -> Self {
        Self { assistant, assistant_id: Arc::new(OnceCell::new()), sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Remote assistant id, creating the assistant on first call.
    ///
    /// # Errors
    ///
    /// Returns the provider error if creation fails; the next call retries.
    pub async fn assistant_id(&self) -> Result<&str, AssistantError> {
        let id = self
            .assistant_id
            .get_or_try_init(|| async {
                let spec = AssistantSpec::business_advisor(&self.assistant.model);
                let id = self.assistant.api.create_assistant(&spec).await?;
                info!(assistant = %id, model = %spec.model, "chat: assistant created");
                Ok::<_, AssistantError>(id)
            })
            .await?;
        Ok(id.as_str())
    }

    /// Return the user's session, opening one (new thread, greeting) if
    /// there is none.
    ///
    /// # Errors
    ///
    /// Returns the provider error if the assistant or thread cannot be
    /// created.
    pub async fn open(&self, user_id: &str) -> Result<Arc<ChatSession>, ChatError> {
        if let Some(existing) = self.get(user_id).await {
            return Ok(existing);
        }

        let assistant_id = self.assistant_id().await?.to_owned();
        let thread_id = self.assistant.api.create_thread().await?;
        let session = Arc::new(ChatSession::new(thread_id, assistant_id));

        let mut sessions = self.sessions.write().await;
        // Another request may have opened one while the thread was created.
        let session = sessions.entry(user_id.to_owned()).or_insert(session).clone();
        info!(user = %user_id, thread = %session.thread_id(), "chat: session opened");
        Ok(session)
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<ChatSession>> {
        self.sessions.read().await.get(user_id).cloned()
    }

    /// Send a message on the user's session and wait for the run to end.
    ///
    /// # Errors
    ///
    /// `NoSession` if none is open, otherwise as [`ChatSession::send`].
    pub async fn send(&self, user_id: &str, text: &str) -> Result<ChatSnapshot, ChatError> {
        let session = self.get(user_id).await.ok_or(ChatError::NoSession)?;
        let handle = session.send(Arc::clone(&self.assistant.api), self.assistant.poll, text)?;
        if let Err(e) = handle.await {
            warn!(user = %user_id, error = %e, "chat: run task aborted");
        }
        Ok(session.snapshot())
    }

    /// Tear down the user's session. Returns whether one existed.
    pub async fn close(&self, user_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(user_id);
        match removed {
            Some(session) => {
                session.close();
                info!(user = %user_id, "chat: session closed");
                true
            }
            None => false,
        }
    }

    /// Close every session whose user fails `keep`. Returns how many closed.
    pub async fn retain(&self, keep: impl Fn(&str) -> bool) -> usize {
        let mut dropped = Vec::new();
        self.sessions.write().await.retain(|user_id, session| {
            let kept = keep(user_id);
            if !kept {
                dropped.push(Arc::clone(session));
            }
            kept
        });
        for session in &dropped {
            session.close();
        }
        dropped.len()
    }

    /// Close every session, e.g. at shutdown.
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in drained {
            session.close();
        }
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
