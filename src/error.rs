//! Error taxonomy for the auth client and session store.
//!
//! Remote failures are classified by status so callers can branch on intent
//! (bad input, conflict, rejected credentials, server fault) instead of raw
//! codes. Every variant maps to one human-readable message via
//! [`Error::user_message`]; raw transport errors never reach the UI
//! uncategorized.

use serde_json::Value;
use thiserror::Error;

/// Maximum number of server-provided characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("response error: {0}")]
    Parse(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Classifies a non-success HTTP response.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body);

        match status {
            400 | 422 => Self::Validation(message.unwrap_or_else(|| "Invalid request.".into())),
            409 => Self::Conflict(
                message.unwrap_or_else(|| "An account with this email already exists.".into()),
            ),
            500..=599 => Self::Server {
                status,
                message: message.unwrap_or_else(|| "Request failed.".into()),
            },
            _ => Self::Auth {
                status,
                message: message.unwrap_or_else(|| "Request failed.".into()),
            },
        }
    }

    /// Shorthand for a local authentication failure that never hit the network.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Auth {
            status: 401,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Single message suitable for a form's error slot.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Conflict(message) | Self::Config(message) => {
                message.clone()
            }
            Self::Auth { message, .. } => message.clone(),
            Self::Network(_) => "Unable to reach the server. Please check your connection.".into(),
            Self::Timeout(_) => "Request timed out. Please try again.".into(),
            Self::Server { .. } => "The server encountered an error. Please try again later.".into(),
            Self::Parse(_) => "Unexpected response from the server.".into(),
            Self::Storage(_) => "Unable to save your session on this device.".into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout("Request timed out. Please try again.".into())
        } else if err.is_decode() {
            Self::Parse(format!("Failed to decode response: {err}"))
        } else if err.is_builder() {
            Self::Config(format!("Failed to build request: {err}"))
        } else {
            Self::Network(format!("Unable to reach the server: {err}"))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("Failed to decode response: {err}"))
    }
}

/// Prefers the server's `error` then `message` field, falling back to the raw body.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        for key in ["error", "message"] {
            if let Some(text) = map.get(key).and_then(Value::as_str) {
                return sanitize(text);
            }
        }
        return None;
    }

    sanitize(trimmed)
}

fn sanitize(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_CHARS).collect())
    }
}
