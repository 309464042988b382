//! Error types for the tools crate.

use std::fmt;

/// Errors from tool execution.
///
/// These never escape the [`crate::ToolInvoker`] boundary; it converts them
/// into textual results so a tool failure cannot abort the conversation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool registered under this name.
    NotFound { name: String },
    /// The tool ran and failed.
    ExecutionFailed { name: String, reason: String },
    /// The arguments did not match the tool's schema.
    InvalidInput { name: String, reason: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "tool not found: {name}"),
            Self::ExecutionFailed { name, reason } => {
                write!(f, "tool '{name}' execution failed: {reason}")
            }
            Self::InvalidInput { name, reason } => {
                write!(f, "invalid input for tool '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Errors from the calendar backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// No access token is configured for the calendar backend.
    MissingCredential,
    /// The calendar service rejected the request.
    Api { status: u16, message: String },
    /// The request never produced a response.
    Network { reason: String },
    /// The response body could not be decoded.
    Decode { reason: String },
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => {
                write!(f, "no calendar access token is configured")
            }
            Self::Api { status, message } => {
                write!(f, "calendar API error ({status}): {message}")
            }
            Self::Network { reason } => write!(f, "calendar request failed: {reason}"),
            Self::Decode { reason } => {
                write!(f, "failed to decode calendar response: {reason}")
            }
        }
    }
}

impl std::error::Error for CalendarError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_display() {
        let err = ToolError::ExecutionFailed {
            name: "create_calendar_event".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(err.to_string().contains("create_calendar_event"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn calendar_error_display() {
        let err = CalendarError::Api {
            status: 403,
            message: "insufficient permissions".to_string(),
        };
        assert!(err.to_string().contains("403"));
    }
}
