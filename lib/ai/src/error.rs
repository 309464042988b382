//! Backend error types.

use std::fmt;

/// Errors from a generative backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend answered with a non-success HTTP status.
    Status { status: u16, message: String },
    /// The request never produced a usable response.
    Network { reason: String },
    /// The response body could not be decoded.
    Decode { reason: String },
}

impl BackendError {
    /// Whether retrying the same request may succeed. Server-side failures
    /// and rate limiting are transient; client errors and decode failures
    /// are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Network { .. } => true,
            Self::Decode { .. } => false,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, message } => {
                write!(f, "backend returned status {status}: {message}")
            }
            Self::Network { reason } => write!(f, "backend request failed: {reason}"),
            Self::Decode { reason } => write!(f, "backend response could not be decoded: {reason}"),
        }
    }
}

impl std::error::Error for BackendError {}
