//! Minimal Telegram Bot API client.
//!
//! Covers exactly the three calls the bot needs: long-polling `getUpdates`,
//! `sendMessage`, and the `typing` chat action.

use chatcal_core::ChatId;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

const TELEGRAM_API_BASE_URL: &str = "https://api.telegram.org";

/// Errors from the Telegram transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a usable response.
    Network { reason: String },
    /// Telegram answered with `ok: false` or a non-success status.
    Api { description: String },
    /// The response body could not be decoded.
    Decode { reason: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "telegram request failed: {reason}"),
            Self::Api { description } => write!(f, "telegram api error: {description}"),
            Self::Decode { reason } => {
                write!(f, "telegram response could not be decoded: {reason}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// One entry from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

/// An inbound chat message. Non-text updates arrive with `text: None` and
/// are ignored upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub from: Option<Sender>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Every Bot API response wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiEnvelope<T> {
    fn into_result(self) -> Result<T, TransportError> {
        if self.ok {
            self.result.ok_or(TransportError::Decode {
                reason: "ok response without a result".to_string(),
            })
        } else {
            Err(TransportError::Api {
                description: self.description.unwrap_or_default(),
            })
        }
    }
}

/// Telegram Bot API client bound to one bot token.
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramClient {
    /// Creates a client against the production Bot API.
    #[must_use]
    pub fn new(http: reqwest::Client, token: &str) -> Self {
        Self::with_base_url(http, token, TELEGRAM_API_BASE_URL)
    }

    /// Creates a client against an alternate endpoint (tests).
    #[must_use]
    pub fn with_base_url(http: reqwest::Client, token: &str, base_url: impl AsRef<str>) -> Self {
        Self {
            http,
            api_base: format!("{}/bot{token}", base_url.as_ref().trim_end_matches('/')),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network {
                reason: e.to_string(),
            })?;

        let envelope: ApiEnvelope<T> =
            response.json().await.map_err(|e| TransportError::Decode {
                reason: e.to_string(),
            })?;
        envelope.into_result()
    }

    /// Long-polls for new updates. `offset` acknowledges everything before
    /// it; `timeout_secs` is the server-side hold time.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        let mut body = json!({ "timeout": timeout_secs, "allowed_updates": ["message"] });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body).await
    }

    /// Sends a text reply to a chat.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), TransportError> {
        let body = json!({ "chat_id": chat_id.as_i64(), "text": text });
        self.call::<serde_json::Value>("sendMessage", &body)
            .await
            .map(|_| ())
    }

    /// Shows the "typing" indicator while a turn is in flight.
    pub async fn send_typing(&self, chat_id: ChatId) -> Result<(), TransportError> {
        let body = json!({ "chat_id": chat_id.as_i64(), "action": "typing" });
        self.call::<serde_json::Value>("sendChatAction", &body)
            .await
            .map(|_| ())
    }
}
