//! Message types for conversations.

use chatcal_core::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Model message (text reply or tool-call request).
    Model,
    /// Result of a tool invocation, fed back to the model.
    ToolResult,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The tool name.
    pub name: String,
    /// Arguments for the tool, keyed by parameter name.
    pub arguments: JsonMap<String, JsonValue>,
}

impl ToolCallRequest {
    /// Creates a new tool-call request.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: JsonMap<String, JsonValue>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The outcome of a tool invocation.
///
/// Tool failures are folded into `output` as textual error results before a
/// `ToolCallResult` is built, so there is no separate error field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The tool that produced this result.
    pub name: String,
    /// The textual result returned to the model, verbatim.
    pub output: String,
}

impl ToolCallResult {
    /// Creates a new tool-call result.
    #[must_use]
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
        }
    }
}

/// The content of a single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text.
    Text { text: String },
    /// A tool-call request from the model.
    ToolCall(ToolCallRequest),
    /// A tool-call result fed back to the model.
    ToolResult(ToolCallResult),
}

/// A message in a conversation. Immutable once created; the sequence of
/// messages is the authoritative context sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: MessageContent,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, content: MessageContent) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Creates a user text message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, MessageContent::Text { text: text.into() })
    }

    /// Creates a model text message.
    #[must_use]
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Model, MessageContent::Text { text: text.into() })
    }

    /// Creates a model-role tool-call message.
    #[must_use]
    pub fn tool_call(request: ToolCallRequest) -> Self {
        Self::new(MessageRole::Model, MessageContent::ToolCall(request))
    }

    /// Creates a tool-result message.
    #[must_use]
    pub fn tool_result(result: ToolCallResult) -> Self {
        Self::new(MessageRole::ToolResult, MessageContent::ToolResult(result))
    }

    /// Returns the text content, if this is a text message.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns true if this message is a tool-call request.
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self.content, MessageContent::ToolCall(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_creation() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.text(), Some("Hello!"));
    }

    #[test]
    fn tool_call_message_is_model_role() {
        let mut args = JsonMap::new();
        args.insert("event_id".to_string(), JsonValue::from("abc123"));
        let msg = Message::tool_call(ToolCallRequest::new("delete_calendar_event", args));

        assert_eq!(msg.role, MessageRole::Model);
        assert!(msg.is_tool_call());
        assert!(msg.text().is_none());
    }

    #[test]
    fn tool_result_message() {
        let msg = Message::tool_result(ToolCallResult::new("list_calendar_events", "No events."));
        assert_eq!(msg.role, MessageRole::ToolResult);
        match &msg.content {
            MessageContent::ToolResult(result) => assert_eq!(result.output, "No events."),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = Message::model("Done, I've added Standup.");
        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(msg.id, parsed.id);
        assert_eq!(msg.content, parsed.content);
    }
}
