mod app;
mod config;
mod telegram;

use app::BotApp;
use chatcal_ai::{ConversationEngine, GeminiClient};
use chatcal_conversation::ConversationStore;
use chatcal_tools::{
    AccessTokenProvider, CalendarApi, GoogleCalendarClient, StaticTokenProvider, ToolInvoker,
    calendar_registry,
};
use config::BotConfig;
use std::sync::Arc;
use telegram::TelegramClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Server-side hold time for `getUpdates` long polls.
const POLL_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = BotConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let http = reqwest::Client::new();

    // Calendar tools
    let tokens: Arc<dyn AccessTokenProvider> = Arc::new(StaticTokenProvider::new(
        config.google_calendar_access_token.clone(),
    ));
    if config.google_calendar_access_token.is_none() {
        tracing::warn!("no calendar access token configured, calendar tools will report errors");
    }
    let calendar: Arc<dyn CalendarApi> =
        Arc::new(GoogleCalendarClient::new(http.clone(), tokens));
    let invoker = ToolInvoker::new(Arc::new(calendar_registry(calendar)));

    // Backend and conversation loop
    let backend = Arc::new(GeminiClient::new(
        http.clone(),
        &config.gemini_api_base_url,
        &config.gemini_api_key,
        config.max_retries,
        config.base_delay(),
    ));
    let engine = Arc::new(ConversationEngine::new(
        backend,
        invoker,
        config.max_tool_call_iterations,
    ));

    // Conversation state and the periodic sweep
    let store = Arc::new(ConversationStore::new(config.conversation_lifetime()));
    let sweeper = store.spawn_sweeper(config.cleanup_interval());

    let telegram = Arc::new(TelegramClient::new(http, &config.telegram_bot_token));
    let app = Arc::new(BotApp::new(
        Arc::clone(&telegram),
        engine,
        Arc::clone(&store),
        config.conversation_lifetime_minutes,
    ));

    tracing::info!("polling for updates");
    let mut offset: Option<i64> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            updates = telegram.get_updates(offset, POLL_TIMEOUT_SECS) => match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        let app = Arc::clone(&app);
                        tokio::spawn(async move {
                            app.handle_update(update).await;
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "polling failed, backing off");
                    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                }
            },
        }
    }

    tracing::info!("shutting down");
    sweeper.shutdown().await;
}
