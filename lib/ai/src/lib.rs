//! Generative backend integration for the chatcal assistant.
//!
//! This crate provides:
//!
//! - **Backend abstraction**: The [`GenerativeBackend`] trait and its
//!   classified [`BackendReply`]
//! - **Gemini client**: An HTTP implementation with retry and backoff
//! - **Conversation engine**: The bounded tool-call loop that turns a
//!   history into a final textual reply

pub mod backend;
pub mod engine;
pub mod error;
pub mod gemini;

pub use backend::{BackendReply, GenerativeBackend};
pub use engine::ConversationEngine;
pub use error::BackendError;
pub use gemini::GeminiClient;
