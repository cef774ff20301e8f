//! Client error taxonomy
//!
//! Every variant is caught by the component that issued the request and
//! turned into text for the user; nothing here is meant to bubble up to a
//! global handler.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Required input missing or malformed; raised before any request is sent
    #[error("{0}")]
    Validation(String),

    /// Auth endpoint answered non-2xx
    #[error("Authentication failed ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Auth {
        status: u16,
        message: Option<String>,
        lockout_until: Option<DateTime<Utc>>,
    },

    /// Analyze endpoint answered non-2xx
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// Interpretation endpoint answered non-2xx
    #[error("Interpretation failed: {0}")]
    Interpretation(String),

    /// Read-only endpoint answered non-2xx
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// Request never got an HTTP answer
    #[error("Network error: {0}")]
    Network(String),

    /// Answer arrived but the body was not what the endpoint promises
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status for server answers, `None` for local and transport errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Auth { status, .. } | ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// Server-supplied message, if the error carries one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Auth { message, .. } => message.as_deref(),
            ClientError::Analysis(m) | ClientError::Interpretation(m) => Some(m),
            ClientError::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display_falls_back_without_message() {
        let err = ClientError::Auth {
            status: 401,
            message: None,
            lockout_until: None,
        };
        assert_eq!(err.to_string(), "Authentication failed (401): no message");
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_validation_displays_bare_message() {
        let err = ClientError::Validation("Please select a file".to_string());
        assert_eq!(err.to_string(), "Please select a file");
        assert!(!err.is_network());
    }
}
