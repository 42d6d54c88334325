//! `OpenAI` Assistants v2 client.
//!
//! Thin HTTP wrapper over `/assistants`, `/threads`, `/threads/{id}/messages`
//! and `/threads/{id}/runs`. Response parsing is pure so it can be tested
//! without a network.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::config::HttpTimeouts;
use super::types::{AssistantApi, AssistantError, AssistantSpec, Run, RunStatus, ThreadMessage};

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";
const MESSAGE_PAGE_LIMIT: u32 = 20;

pub struct OpenAiAssistants {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAssistants {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: String, timeouts: HttpTimeouts) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| AssistantError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url })
    }

    async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<String, AssistantError> {
        let request = self.http.post(format!("{}{}", self.base_url, path)).json(body);
        self.send(request).await
    }

    async fn get(&self, path: &str) -> Result<String, AssistantError> {
        let request = self.http.get(format!("{}{}", self.base_url, path));
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, AssistantError> {
        let response = request
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VALUE)
            .send()
            .await
            .map_err(|e| AssistantError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AssistantError::ApiRequest(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(AssistantError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl AssistantApi for OpenAiAssistants {
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, AssistantError> {
        let tools: Vec<ToolDef<'_>> = spec
            .tools
            .iter()
            .map(|t| ToolDef { tool_type: t })
            .collect();
        let body = CreateAssistant {
            name: &spec.name,
            instructions: &spec.instructions,
            model: &spec.model,
            tools: &tools,
        };
        let text = self.post_json("/assistants", &body).await?;
        parse_object_id(&text)
    }

    async fn create_thread(&self) -> Result<String, AssistantError> {
        let text = self.post_json("/threads", &serde_json::json!({})).await?;
        parse_object_id(&text)
    }

    async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), AssistantError> {
        let body = CreateMessage { role: "user", content };
        self.post_json(&format!("/threads/{thread_id}/messages"), &body)
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AssistantError> {
        let body = CreateRun { assistant_id };
        let text = self
            .post_json(&format!("/threads/{thread_id}/runs"), &body)
            .await?;
        parse_run(&text)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        let text = self
            .get(&format!("/threads/{thread_id}/runs/{run_id}"))
            .await?;
        parse_run(&text)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
        let text = self
            .get(&format!("/threads/{thread_id}/messages?order=desc&limit={MESSAGE_PAGE_LIMIT}"))
            .await?;
        parse_message_list(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CreateAssistant<'a> {
    name: &'a str,
    instructions: &'a str,
    model: &'a str,
    tools: &'a [ToolDef<'a>],
}

#[derive(Serialize)]
struct ToolDef<'a> {
    #[serde(rename = "type")]
    tool_type: &'a str,
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRun<'a> {
    assistant_id: &'a str,
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

fn parse_root(json_text: &str) -> Result<Value, AssistantError> {
    serde_json::from_str(json_text).map_err(|e| AssistantError::ApiParse(e.to_string()))
}

pub(crate) fn parse_object_id(json_text: &str) -> Result<String, AssistantError> {
    let root = parse_root(json_text)?;
    root.get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AssistantError::ApiParse("response missing id".into()))
}

pub(crate) fn parse_run(json_text: &str) -> Result<Run, AssistantError> {
    let root = parse_root(json_text)?;
    let id = root
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AssistantError::ApiParse("run missing id".into()))?;
    let thread_id = root
        .get("thread_id")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let status = root
        .get("status")
        .cloned()
        .ok_or_else(|| AssistantError::ApiParse("run missing status".into()))?;
    let status: RunStatus = serde_json::from_value(status).map_err(|e| AssistantError::ApiParse(e.to_string()))?;

    Ok(Run { id: id.to_owned(), thread_id: thread_id.to_owned(), status })
}

pub(crate) fn parse_message_list(json_text: &str) -> Result<Vec<ThreadMessage>, AssistantError> {
    let root = parse_root(json_text)?;
    let Some(data) = root.get("data").and_then(Value::as_array) else {
        return Err(AssistantError::ApiParse("message list missing data".into()));
    };

    let mut out = Vec::with_capacity(data.len());
    for item in data {
        let Some(id) = item.get("id").and_then(Value::as_str) else {
            continue;
        };
        let role = item
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let run_id = item
            .get("run_id")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let text = item
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            })
            .and_then(|b| b.get("text"))
            .and_then(|t| t.get("value"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        out.push(ThreadMessage { id: id.to_owned(), role: role.to_owned(), run_id, text });
    }
    Ok(out)
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
