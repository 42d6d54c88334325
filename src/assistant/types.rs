//! Assistant types: run status, thread messages, errors, and the client trait.
//!
//! Provider-neutral shapes for a hosted assistant that works in threads and
//! runs. The chat service only talks to [`AssistantApi`], so tests swap in a
//! scripted fake.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by assistant client operations.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the assistant provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for AssistantError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// ASSISTANT CONFIGURATION
// =============================================================================

/// Remote assistant definition created once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    pub model: String,
    /// Built-in tool types, e.g. `code_interpreter`.
    pub tools: Vec<String>,
}

pub const ADVISOR_NAME: &str = "Business Advisor";
pub const ADVISOR_INSTRUCTIONS: &str = "You are a business advisor. You specialize in providing advice for MSMEs.";
pub const ADVISOR_TOOL: &str = "code_interpreter";

impl AssistantSpec {
    /// The MSME business advisor with a single code-interpreter tool.
    #[must_use]
    pub fn business_advisor(model: &str) -> Self {
        Self {
            name: ADVISOR_NAME.into(),
            instructions: ADVISOR_INSTRUCTIONS.into(),
            model: model.into(),
            tools: vec![ADVISOR_TOOL.into()],
        }
    }
}

// =============================================================================
// RUNS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Still waiting on the provider; keep polling.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress)
    }
}

/// One execution of the assistant against a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
}

/// A message read back from a thread. `text` is the first text content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    pub run_id: Option<String>,
    pub text: Option<String>,
}

impl ThreadMessage {
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == "assistant"
    }
}

// =============================================================================
// ASSISTANT API TRAIT
// =============================================================================

/// Hosted assistant operations. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create the assistant configuration, returning its id.
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, AssistantError>;

    /// Create an empty conversation thread, returning its id.
    async fn create_thread(&self) -> Result<String, AssistantError>;

    /// Post a user message to a thread.
    async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), AssistantError>;

    /// Start a run of `assistant_id` against `thread_id`.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AssistantError>;

    /// Fetch the current status of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError>;

    /// List thread messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
