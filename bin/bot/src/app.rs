//! Update handling: command dispatch and the per-message conversation flow.

use crate::telegram::{TelegramClient, Update};
use chatcal_ai::ConversationEngine;
use chatcal_conversation::{ConversationStore, Message, SessionDisposition};
use chatcal_core::{ChatId, UserId};
use std::sync::Arc;
use tracing::{debug, warn};

const RESET_CONFIRMATION: &str = "Done, we're starting fresh. What can I help you with?";

const EXPIRED_NOTICE: &str =
    "It's been a while, so I've started a new conversation for you.";

/// The bot application: everything needed to turn one inbound update into
/// an outbound reply.
pub struct BotApp {
    telegram: Arc<TelegramClient>,
    engine: Arc<ConversationEngine>,
    store: Arc<ConversationStore>,
    lifetime_minutes: i64,
}

impl BotApp {
    /// Wires the application together.
    #[must_use]
    pub fn new(
        telegram: Arc<TelegramClient>,
        engine: Arc<ConversationEngine>,
        store: Arc<ConversationStore>,
        lifetime_minutes: i64,
    ) -> Self {
        Self {
            telegram,
            engine,
            store,
            lifetime_minutes,
        }
    }

    fn onboarding(&self) -> String {
        format!(
            "Hi! I'm your calendar assistant. Ask me to create, list, or delete \
             events in plain language. A conversation idle for more than \
             {} minutes starts over.",
            self.lifetime_minutes
        )
    }

    /// Handles one update end to end. Never fails; delivery problems are
    /// logged and the update is dropped.
    pub async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text else {
            debug!(update_id = update.update_id, "ignoring non-text update");
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(from) = message.from else {
            debug!(update_id = update.update_id, "ignoring update without a sender");
            return;
        };

        let user_id = UserId::new(from.id);
        let chat_id = ChatId::new(message.chat.id);
        match text {
            "/start" => {
                self.store.reset_history(user_id);
                self.send(chat_id, &self.onboarding()).await;
            }
            "/reset" => {
                self.store.reset_history(user_id);
                self.send(chat_id, RESET_CONFIRMATION).await;
            }
            _ => self.handle_text(user_id, chat_id, text).await,
        }
    }

    /// The conversation flow for a plain text message. The per-user gate is
    /// held for the whole turn so one user's messages are processed one at a
    /// time.
    async fn handle_text(&self, user_id: UserId, chat_id: ChatId, text: &str) {
        let gate = self.store.user_gate(user_id);
        let _guard = gate.lock().await;

        let snapshot = self.store.get_history(user_id);
        if snapshot.disposition == SessionDisposition::Expired {
            self.send(chat_id, EXPIRED_NOTICE).await;
        }

        self.store.update_history(user_id, Message::user(text));
        if let Err(e) = self.telegram.send_typing(chat_id).await {
            warn!(%chat_id, error = %e, "failed to send typing indicator");
        }

        let snapshot = self.store.get_history(user_id);
        let reply = self.engine.run(&snapshot.messages).await;
        self.store.update_history(user_id, Message::model(reply.clone()));
        self.send(chat_id, &reply).await;
    }

    async fn send(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.telegram.send_message(chat_id, text).await {
            warn!(%chat_id, error = %e, "failed to deliver reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::{Chat, IncomingMessage, Sender};
    use async_trait::async_trait;
    use chatcal_ai::{BackendError, BackendReply, GenerativeBackend};
    use chatcal_tools::{ToolInvoker, ToolRegistry};
    use serde_json::Value as JsonValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    struct CannedBackend {
        reply: String,
    }

    #[async_trait]
    impl GenerativeBackend for CannedBackend {
        async fn generate(
            &self,
            _history: &[Message],
            _tools: &JsonValue,
        ) -> Result<BackendReply, BackendError> {
            Ok(BackendReply::Text(self.reply.clone()))
        }
    }

    fn update(user: i64, chat: i64, text: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(IncomingMessage {
                from: Some(Sender { id: user }),
                chat: Chat { id: chat },
                text: Some(text.to_string()),
            }),
        }
    }

    async fn telegram_mock() -> MockServer {
        let server = MockServer::start().await;
        let ok = ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "ok": true, "result": {} }));
        Mock::given(method("POST"))
            .and(path("/bottok/sendMessage"))
            .respond_with(ok.clone())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bottok/sendChatAction"))
            .respond_with(ok)
            .mount(&server)
            .await;
        server
    }

    fn app(server: &MockServer, reply: &str, lifetime: chrono::Duration) -> (BotApp, Arc<ConversationStore>) {
        let telegram = Arc::new(TelegramClient::with_base_url(
            reqwest::Client::new(),
            "tok",
            server.uri(),
        ));
        let invoker = ToolInvoker::new(Arc::new(ToolRegistry::builder().build()));
        let engine = Arc::new(ConversationEngine::new(
            Arc::new(CannedBackend {
                reply: reply.to_string(),
            }),
            invoker,
            5,
        ));
        let store = Arc::new(ConversationStore::new(lifetime));
        (
            BotApp::new(telegram, engine, Arc::clone(&store), 30),
            store,
        )
    }

    fn sent_texts(requests: &[Request]) -> Vec<String> {
        requests
            .iter()
            .filter(|r| r.url.path().ends_with("/sendMessage"))
            .map(|r| {
                let body: JsonValue = serde_json::from_slice(&r.body).expect("body");
                body["text"].as_str().expect("text").to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn text_message_round_trip_persists_final_reply() {
        let server = telegram_mock().await;
        let (app, store) = app(&server, "You're free all afternoon.", chrono::Duration::minutes(30));

        app.handle_update(update(1, 10, "Am I free today?")).await;

        let texts = sent_texts(&server.received_requests().await.unwrap());
        assert_eq!(texts, vec!["You're free all afternoon.".to_string()]);

        // Seed pair, user message, final model reply.
        let history = store.get_history(UserId::new(1)).messages;
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].text(), Some("Am I free today?"));
        assert_eq!(history[3].text(), Some("You're free all afternoon."));
    }

    #[tokio::test]
    async fn reset_command_reinitializes_and_confirms() {
        let server = telegram_mock().await;
        let (app, store) = app(&server, "ignored", chrono::Duration::minutes(30));

        app.handle_update(update(1, 10, "Am I free today?")).await;
        app.handle_update(update(1, 10, "/reset")).await;

        let history = store.get_history(UserId::new(1)).messages;
        assert_eq!(history.len(), 2);

        let texts = sent_texts(&server.received_requests().await.unwrap());
        assert_eq!(texts.last().map(String::as_str), Some(RESET_CONFIRMATION));
    }

    #[tokio::test]
    async fn start_command_sends_onboarding_with_lifetime() {
        let server = telegram_mock().await;
        let (app, _store) = app(&server, "ignored", chrono::Duration::minutes(30));

        app.handle_update(update(1, 10, "/start")).await;

        let texts = sent_texts(&server.received_requests().await.unwrap());
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("30 minutes"));
    }

    #[tokio::test]
    async fn expired_session_gets_a_notice_before_the_reply() {
        let server = telegram_mock().await;
        let (app, _store) = app(&server, "Hello again!", chrono::Duration::zero());

        app.handle_update(update(1, 10, "hi")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        app.handle_update(update(1, 10, "are you there?")).await;

        let texts = sent_texts(&server.received_requests().await.unwrap());
        assert_eq!(
            texts,
            vec![
                "Hello again!".to_string(),
                EXPIRED_NOTICE.to_string(),
                "Hello again!".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn typing_indicator_precedes_the_reply() {
        let server = telegram_mock().await;
        let (app, _store) = app(&server, "Sure.", chrono::Duration::minutes(30));

        app.handle_update(update(1, 10, "add lunch tomorrow at noon"))
            .await;

        let requests = server.received_requests().await.unwrap();
        let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
        let typing = paths
            .iter()
            .position(|p| p.ends_with("/sendChatAction"))
            .expect("typing sent");
        let reply = paths
            .iter()
            .position(|p| p.ends_with("/sendMessage"))
            .expect("reply sent");
        assert!(typing < reply);
    }

    #[tokio::test]
    async fn updates_without_text_or_sender_are_ignored() {
        let server = telegram_mock().await;
        let (app, store) = app(&server, "ignored", chrono::Duration::minutes(30));

        app.handle_update(Update {
            update_id: 1,
            message: None,
        })
        .await;
        app.handle_update(Update {
            update_id: 2,
            message: Some(IncomingMessage {
                from: None,
                chat: Chat { id: 10 },
                text: Some("hi".to_string()),
            }),
        })
        .await;
        app.handle_update(update(1, 10, "   ")).await;

        assert!(store.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replies_target_the_originating_chat() {
        let server = telegram_mock().await;
        let (app, _store) = app(&server, "Sure.", chrono::Duration::minutes(30));

        app.handle_update(update(1, 77, "hello")).await;

        let requests = server.received_requests().await.unwrap();
        let reply = requests
            .iter()
            .find(|r| r.url.path().ends_with("/sendMessage"))
            .expect("reply sent");
        let body: JsonValue = serde_json::from_slice(&reply.body).expect("body");
        assert_eq!(body["chat_id"], 77);
    }
}
