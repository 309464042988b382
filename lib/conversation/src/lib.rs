//! Conversation state for the chatcal assistant.
//!
//! This crate provides:
//!
//! - **Message model**: Typed conversation turns (text, tool calls, tool results)
//! - **Prompt seeding**: The system-context message pair every fresh history starts with
//! - **Conversation store**: Per-user history with idle expiry and a background sweep

pub mod message;
pub mod prompt;
pub mod store;

pub use message::{Message, MessageContent, MessageRole, ToolCallRequest, ToolCallResult};
pub use store::{ConversationStore, HistorySnapshot, SessionDisposition, SweepTask};
