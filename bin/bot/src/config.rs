//! Centralized bot configuration.
//!
//! This module provides strongly-typed configuration for the bot, loaded
//! via the `config` crate from environment variables. Only the two
//! credentials are required; everything else has a sensible default.

use serde::Deserialize;

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Telegram bot API token. Required.
    pub telegram_bot_token: String,

    /// Gemini API key. Required.
    pub gemini_api_key: String,

    /// Gemini `generateContent` endpoint.
    #[serde(default = "default_gemini_api_base_url")]
    pub gemini_api_base_url: String,

    /// Access token for the Google Calendar API. When absent the calendar
    /// tools stay registered but every invocation reports a missing
    /// credential to the model.
    #[serde(default)]
    pub google_calendar_access_token: Option<String>,

    /// Minutes of inactivity before a conversation starts over.
    #[serde(default = "default_conversation_lifetime_minutes")]
    pub conversation_lifetime_minutes: i64,

    /// Interval between conversation sweep runs, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,

    /// Retry budget for transient backend failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in seconds; doubles on each retry.
    #[serde(default = "default_base_delay_seconds")]
    pub base_delay_seconds: f64,

    /// Maximum backend round-trips within one user turn.
    #[serde(default = "default_max_tool_call_iterations")]
    pub max_tool_call_iterations: u32,
}

fn default_gemini_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        .to_string()
}

fn default_conversation_lifetime_minutes() -> i64 {
    30
}

fn default_cleanup_interval_seconds() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_seconds() -> f64 {
    1.0
}

fn default_max_tool_call_iterations() -> u32 {
    5
}

impl BotConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Idle lifetime of a conversation.
    #[must_use]
    pub fn conversation_lifetime(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.conversation_lifetime_minutes)
    }

    /// Interval between sweep runs.
    #[must_use]
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_seconds)
    }

    /// Base backoff delay for backend retries.
    #[must_use]
    pub fn base_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.base_delay_seconds)
    }
}
