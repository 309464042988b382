//! Backend abstraction.

use crate::error::BackendError;
use async_trait::async_trait;
use chatcal_conversation::{Message, ToolCallRequest};
use serde_json::Value as JsonValue;

/// A backend response, classified for the conversation loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    /// A final textual answer for the user.
    Text(String),
    /// A request to run a tool and call back with its result.
    ToolCall(ToolCallRequest),
    /// A response that is neither text nor a tool call.
    Malformed,
}

/// A generative model backend.
///
/// `generate` receives the full conversation history and the exported tool
/// schema on every call; the backend itself holds no conversation state.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Produces the backend's next reply for the given history.
    async fn generate(
        &self,
        history: &[Message],
        tools: &JsonValue,
    ) -> Result<BackendReply, BackendError>;
}
