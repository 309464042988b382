//! System-context prompt seeding.
//!
//! Every fresh history starts with a system-context pair: an instruction
//! message carrying the assistant persona plus the current time, and a short
//! model acknowledgement so the first real user turn lands on an established
//! exchange. The embedded timestamp anchors relative-time reasoning
//! ("today", "tomorrow") in the backend.

use crate::message::Message;
use chrono::{SecondsFormat, Utc};

const PERSONA: &str = "You are a friendly and helpful assistant. Your goal is to answer the \
user's questions and keep a conversation going while preserving its context. You can also \
manage the user's calendar: creating, listing, and DELETING events. Use the available tools \
whenever appropriate. If the user asks to create an event, make sure you have a title, a \
start time, and an end time; if a time is missing, ask for it. If the user asks for a list \
of events, you may ask how many or for a time range. When asked to delete an event by name, \
first call `list_calendar_events` with the `summary_keyword` parameter to find matches, show \
them with their IDs, and ask the user to confirm which ID to delete; if exactly one matches, \
ask for confirmation of that ID. If nothing matches, say so. Always use ISO 8601 format for \
times, and always resolve relative times (such as \"today\" or \"tomorrow\") against the \
current date and time given in this prompt. Besides calendar work you can simply chat, give \
advice, or suggest activities; if the user agrees to a suggested activity, offer to add it \
to the calendar right away.";

const ACKNOWLEDGEMENT: &str = "Hi! I'm ready to chat.";

/// Generates the system-context message with the current time embedded.
#[must_use]
pub fn system_context_message() -> Message {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    Message::user(format!("Current date and time (UTC): {now}. {PERSONA}"))
}

/// Returns the fixed model acknowledgement of the system context.
#[must_use]
pub fn acknowledgement_message() -> Message {
    Message::model(ACKNOWLEDGEMENT)
}

/// Returns the initial history every fresh session starts with: the
/// system-context message and its acknowledgement.
#[must_use]
pub fn seed_history() -> Vec<Message> {
    vec![system_context_message(), acknowledgement_message()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRole;

    #[test]
    fn seed_is_a_context_pair() {
        let seed = seed_history();
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0].role, MessageRole::User);
        assert_eq!(seed[1].role, MessageRole::Model);
    }

    #[test]
    fn system_context_embeds_current_time() {
        let msg = system_context_message();
        let text = msg.text().expect("text content");
        assert!(text.starts_with("Current date and time (UTC): "));
        assert!(text.contains("list_calendar_events"));
    }

    #[test]
    fn regenerated_context_differs_by_timestamp() {
        let first = system_context_message();
        std::thread::sleep(std::time::Duration::from_micros(5));
        let second = system_context_message();
        // Microsecond precision in the embedded timestamp makes consecutive
        // generations distinct.
        assert_ne!(first.text(), second.text());
    }
}
