//! Callable tools for the chatcal assistant.
//!
//! This crate provides:
//!
//! - **Tool interface**: The [`Tool`] capability trait with schema-described
//!   parameters, and the [`ToolRegistry`] built once at startup
//! - **Tool invoker**: Dispatch by name with failures normalized into text
//! - **Calendar tools**: create/list/delete backed by a [`CalendarApi`]
//!   implementation against the Google Calendar REST surface

pub mod calendar;
pub mod calendar_tools;
pub mod error;
pub mod invoker;
pub mod tool;

pub use calendar::{
    AccessTokenProvider, CalendarApi, CalendarEvent, CreateEventRequest, CreatedEvent,
    DeleteOutcome, GoogleCalendarClient, ListEventsQuery, StaticTokenProvider,
};
pub use calendar_tools::{CreateEventTool, DeleteEventTool, ListEventsTool, calendar_registry};
pub use error::{CalendarError, ToolError};
pub use invoker::ToolInvoker;
pub use tool::{ParameterSpec, ParameterType, Tool, ToolDescriptor, ToolRegistry};
