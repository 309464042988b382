//! The calendar tools exposed to the backend.
//!
//! Each tool renders its outcome as text for the model: confirmations,
//! listings with per-event identifiers, and "not found" notices. Argument
//! shapes match the exported schema exactly.

use crate::calendar::{CalendarApi, CreateEventRequest, DeleteOutcome, ListEventsQuery};
use crate::error::ToolError;
use crate::tool::{ParameterSpec, ParameterType, Tool, ToolDescriptor, ToolRegistry};
use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

/// Builds the standard registry with all three calendar tools.
#[must_use]
pub fn calendar_registry(api: Arc<dyn CalendarApi>) -> ToolRegistry {
    ToolRegistry::builder()
        .register(Arc::new(CreateEventTool::new(Arc::clone(&api))))
        .register(Arc::new(ListEventsTool::new(Arc::clone(&api))))
        .register(Arc::new(DeleteEventTool::new(api)))
        .build()
}

fn required_str<'a>(
    tool: &str,
    arguments: &'a JsonMap<String, JsonValue>,
    key: &str,
) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidInput {
            name: tool.to_string(),
            reason: format!("missing required argument '{key}'"),
        })
}

fn optional_str(arguments: &JsonMap<String, JsonValue>, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The `create_calendar_event` tool: creates an event on the user's calendar.
pub struct CreateEventTool {
    api: Arc<dyn CalendarApi>,
}

impl CreateEventTool {
    /// Creates the tool over a calendar backend.
    #[must_use]
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "create_calendar_event",
            "Creates a new event in the user's calendar. Requires a title, a start time, and \
             an end time. Times must be in ISO 8601 format (for example \
             '2025-07-15T10:00:00+03:00').",
            vec![
                ParameterSpec::required(
                    "summary",
                    ParameterType::String,
                    "Title or short description of the event.",
                ),
                ParameterSpec::required(
                    "start_time",
                    ParameterType::String,
                    "Event start time in ISO 8601 format.",
                ),
                ParameterSpec::required(
                    "end_time",
                    ParameterType::String,
                    "Event end time in ISO 8601 format.",
                ),
                ParameterSpec::optional(
                    "description",
                    ParameterType::String,
                    "Detailed description of the event.",
                ),
                ParameterSpec::optional(
                    "location",
                    ParameterType::String,
                    "Where the event takes place.",
                ),
            ],
        )
    }

    async fn invoke(&self, arguments: &JsonMap<String, JsonValue>) -> Result<String, ToolError> {
        let request = CreateEventRequest {
            summary: required_str("create_calendar_event", arguments, "summary")?.to_string(),
            start_time: required_str("create_calendar_event", arguments, "start_time")?
                .to_string(),
            end_time: required_str("create_calendar_event", arguments, "end_time")?.to_string(),
            description: optional_str(arguments, "description"),
            location: optional_str(arguments, "location"),
        };

        let created =
            self.api
                .create_event(&request)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    name: "create_calendar_event".to_string(),
                    reason: e.to_string(),
                })?;

        Ok(match created.html_link {
            Some(link) => format!(
                "Event '{}' has been created in the calendar. Link: {link}",
                request.summary
            ),
            None => format!("Event '{}' has been created in the calendar.", request.summary),
        })
    }
}

/// The `list_calendar_events` tool: lists upcoming events, one line per
/// event with its identifier so the model can reference it for deletion.
pub struct ListEventsTool {
    api: Arc<dyn CalendarApi>,
}

impl ListEventsTool {
    /// Creates the tool over a calendar backend.
    #[must_use]
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for ListEventsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "list_calendar_events",
            "Retrieves upcoming events from the user's calendar. You may limit the count, give \
             a time range, or filter by a keyword in the event title. Times must be in ISO 8601 \
             format (for example '2025-07-15T00:00:00Z'). Each listed event includes its ID, \
             which can be used for deletion.",
            vec![
                ParameterSpec::optional(
                    "max_results",
                    ParameterType::Integer,
                    "Maximum number of events to retrieve (default 10).",
                ),
                ParameterSpec::optional(
                    "time_min",
                    ParameterType::String,
                    "Earliest event start time in ISO 8601 format.",
                ),
                ParameterSpec::optional(
                    "time_max",
                    ParameterType::String,
                    "Latest event start time in ISO 8601 format.",
                ),
                ParameterSpec::optional(
                    "summary_keyword",
                    ParameterType::String,
                    "Keyword to filter events by title.",
                ),
            ],
        )
    }

    async fn invoke(&self, arguments: &JsonMap<String, JsonValue>) -> Result<String, ToolError> {
        let query = ListEventsQuery {
            max_results: arguments
                .get("max_results")
                .and_then(JsonValue::as_u64)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX)),
            time_min: optional_str(arguments, "time_min"),
            time_max: optional_str(arguments, "time_max"),
            summary_keyword: optional_str(arguments, "summary_keyword"),
        };

        let events =
            self.api
                .list_events(&query)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    name: "list_calendar_events".to_string(),
                    reason: e.to_string(),
                })?;

        if events.is_empty() {
            return Ok(match query.summary_keyword {
                Some(keyword) => format!("No events matching '{keyword}' were found."),
                None => "No upcoming events were found.".to_string(),
            });
        }

        let mut listing = String::from("Here are the upcoming events:\n");
        for event in events {
            listing.push_str(&format!(
                "- {} (from {} to {}) ID: {}\n",
                event.summary, event.start, event.end, event.id
            ));
        }
        Ok(listing)
    }
}

/// The `delete_calendar_event` tool: deletes an event by its identifier.
pub struct DeleteEventTool {
    api: Arc<dyn CalendarApi>,
}

impl DeleteEventTool {
    /// Creates the tool over a calendar backend.
    #[must_use]
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for DeleteEventTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "delete_calendar_event",
            "Deletes an event from the user's calendar by its unique identifier (ID). Event IDs \
             come from list_calendar_events. If the user asks to delete an event by name, first \
             call list_calendar_events with the summary_keyword parameter to find the ID, then \
             confirm with the user which event to delete if several match, or ask for \
             confirmation if exactly one matches.",
            vec![ParameterSpec::required(
                "event_id",
                ParameterType::String,
                "Unique identifier of the event to delete.",
            )],
        )
    }

    async fn invoke(&self, arguments: &JsonMap<String, JsonValue>) -> Result<String, ToolError> {
        let event_id = required_str("delete_calendar_event", arguments, "event_id")?;

        let outcome =
            self.api
                .delete_event(event_id)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    name: "delete_calendar_event".to_string(),
                    reason: e.to_string(),
                })?;

        Ok(match outcome {
            DeleteOutcome::Deleted => {
                format!("Event with ID '{event_id}' has been deleted from the calendar.")
            }
            DeleteOutcome::NotFound => {
                format!("Event with ID '{event_id}' was not found or is already deleted.")
            }
        })
    }
}
