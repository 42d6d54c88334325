//! Assistant: hosted business-advisor adapter.
//!
//! DESIGN
//! ======
//! Same layout as any vendor client in this crate: `config` parses the
//! environment, `types` holds the provider-neutral trait and wire-independent
//! shapes, and `openai` implements the trait over HTTP. The chat service only
//! ever sees `Arc<dyn AssistantApi>`.

pub mod config;
pub mod openai;
pub mod types;

use std::sync::Arc;

use config::AssistantConfig;
pub use types::AssistantApi;
use types::AssistantError;

/// A configured assistant client plus the settings the chat service needs.
#[derive(Clone)]
pub struct Assistant {
    pub api: Arc<dyn AssistantApi>,
    pub model: String,
    pub poll: config::PollPolicy,
}

impl Assistant {
    /// Build from `OPENAI_*` / `ASSISTANT_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, AssistantError> {
        Self::from_config(AssistantConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: AssistantConfig) -> Result<Self, AssistantError> {
        let client = openai::OpenAiAssistants::new(config.api_key, config.base_url, config.timeouts)?;
        Ok(Self { api: Arc::new(client), model: config.model, poll: config.poll })
    }
}
