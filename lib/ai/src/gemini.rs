//! Gemini HTTP client.
//!
//! Speaks the `generateContent` wire format: the history goes out as a
//! `contents` array, tool schemas ride along under `tools`, and the reply
//! is classified from the first part of the first candidate. Transient
//! failures are retried with exponential backoff.

use crate::backend::{BackendReply, GenerativeBackend};
use crate::error::BackendError;
use async_trait::async_trait;
use chatcal_conversation::{Message, MessageContent, MessageRole, ToolCallRequest};
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl GeminiClient {
    /// Creates a client for the given `generateContent` endpoint. The API
    /// key is carried as a query parameter, per the Gemini REST convention.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        endpoint: impl AsRef<str>,
        api_key: &str,
        max_retries: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            http,
            api_url: format!("{}?key={}", endpoint.as_ref(), api_key),
            max_retries,
            base_delay,
        }
    }

    async fn send_once(&self, body: &JsonValue) -> Result<BackendReply, BackendError> {
        let response = self
            .http
            .post(&self.api_url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Network {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let payload: JsonValue = response.json().await.map_err(|e| BackendError::Decode {
            reason: e.to_string(),
        })?;
        Ok(classify(&payload))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        history: &[Message],
        tools: &JsonValue,
    ) -> Result<BackendReply, BackendError> {
        let body = json!({
            "contents": encode_history(history),
            "tools": tools,
        });

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.base_delay * 2u32.pow(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "backend call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(attempt, error = %e, "backend call failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Renders a history in the Gemini `contents` shape. Tool calls become
/// model-role `functionCall` parts; tool results go back under the
/// `function` role as `functionResponse` parts.
fn encode_history(history: &[Message]) -> Vec<JsonValue> {
    history
        .iter()
        .map(|message| match &message.content {
            MessageContent::Text { text } => {
                let role = match message.role {
                    MessageRole::Model => "model",
                    _ => "user",
                };
                json!({ "role": role, "parts": [{ "text": text }] })
            }
            MessageContent::ToolCall(request) => json!({
                "role": "model",
                "parts": [{
                    "functionCall": {
                        "name": request.name,
                        "args": request.arguments,
                    }
                }]
            }),
            MessageContent::ToolResult(result) => json!({
                "role": "function",
                "parts": [{
                    "functionResponse": {
                        "name": result.name,
                        "response": { "content": result.output },
                    }
                }]
            }),
        })
        .collect()
}

/// Classifies a decoded `generateContent` response body.
fn classify(payload: &JsonValue) -> BackendReply {
    let part = &payload["candidates"][0]["content"]["parts"][0];

    if let Some(call) = part.get("functionCall") {
        if let Some(name) = call["name"].as_str() {
            let arguments: JsonMap<String, JsonValue> = call
                .get("args")
                .and_then(JsonValue::as_object)
                .cloned()
                .unwrap_or_default();
            return BackendReply::ToolCall(ToolCallRequest::new(name, arguments));
        }
    }
    if let Some(text) = part.get("text").and_then(JsonValue::as_str) {
        return BackendReply::Text(text.to_string());
    }

    warn!("backend response carried neither text nor a tool call");
    BackendReply::Malformed
}
