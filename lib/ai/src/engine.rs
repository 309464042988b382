//! The conversation orchestration loop.

use crate::backend::{BackendReply, GenerativeBackend};
use chatcal_conversation::{Message, ToolCallResult};
use chatcal_tools::ToolInvoker;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shown when the backend fails after retries are exhausted, or fails in a
/// way that is not worth retrying.
const BACKEND_FAILURE_REPLY: &str =
    "Sorry, I couldn't reach my language model right now. Please try again in a moment.";

/// Shown when the backend answers with something that is neither text nor
/// a tool call.
const MALFORMED_REPLY: &str =
    "Sorry, I received a response I couldn't make sense of. Please try again.";

/// Shown when a turn burns through the whole tool-call budget without the
/// backend settling on a textual answer.
const TOOL_BUDGET_REPLY: &str =
    "Sorry, I couldn't complete that after several tool attempts. Please try rephrasing.";

/// Drives one user turn to completion.
///
/// Each turn is a bounded loop: ask the backend, and while it keeps
/// requesting tools, execute them and feed the results back. Every failure
/// path resolves to a short fixed reply, so a turn always produces text for
/// the user. The tool-call and tool-result messages accumulated along the
/// way are scoped to the turn; the caller persists only the final reply.
pub struct ConversationEngine {
    backend: Arc<dyn GenerativeBackend>,
    invoker: ToolInvoker,
    max_iterations: u32,
}

impl ConversationEngine {
    /// Creates an engine with the given tool-call budget per turn.
    #[must_use]
    pub fn new(backend: Arc<dyn GenerativeBackend>, invoker: ToolInvoker, max_iterations: u32) -> Self {
        Self {
            backend,
            invoker,
            max_iterations,
        }
    }

    /// Runs one turn over the given history and returns the reply text.
    pub async fn run(&self, history: &[Message]) -> String {
        let tools = self.invoker.registry().schema();
        let mut working: Vec<Message> = history.to_vec();

        for iteration in 0..self.max_iterations {
            let reply = match self.backend.generate(&working, &tools).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(iteration, error = %e, "backend call failed, ending turn");
                    return BACKEND_FAILURE_REPLY.to_string();
                }
            };

            match reply {
                BackendReply::Text(text) => return text,
                BackendReply::Malformed => {
                    warn!(iteration, "backend reply was malformed, ending turn");
                    return MALFORMED_REPLY.to_string();
                }
                BackendReply::ToolCall(request) => {
                    info!(iteration, tool = %request.name, "backend requested a tool");
                    let output = self.invoker.execute(&request.name, &request.arguments).await;
                    let name = request.name.clone();
                    working.push(Message::tool_call(request));
                    working.push(Message::tool_result(ToolCallResult::new(name, output)));
                }
            }
        }

        warn!(
            budget = self.max_iterations,
            "tool-call budget exhausted without a textual reply"
        );
        TOOL_BUDGET_REPLY.to_string()
    }
}
