//! Core domain types for the chatcal assistant.
//!
//! This crate provides the strongly-typed identifiers shared by the
//! conversation, tool, and AI crates.

pub mod id;

pub use id::{ChatId, MessageId, ParseIdError, UserId};
