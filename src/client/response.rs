//! Job service response types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for job service calls
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("server returned {status}{}", message_suffix(.message))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {}", m),
        None => String::new(),
    }
}

impl ServiceError {
    /// Text the server sent along with a failure status, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ServiceError::Status {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    /// Message fit for showing to an operator: the server's own text when
    /// it sent one, otherwise the error itself
    pub fn user_message(&self) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}

/// Result of the duplicate step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRunResponse {
    #[serde(default)]
    pub duplicates_removed: u64,
}

/// Result of the envelope, extras and box steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    #[serde(default)]
    pub message: String,
}

/// Result of a report existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportExists {
    pub exists: bool,
}

/// Error body shapes the job service is known to send
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Pull a readable message out of an error body: JSON `message` or
/// `title` first, then short plain text
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let readable = |m: &String| !m.trim().is_empty();
        return parsed
            .message
            .filter(readable)
            .or_else(|| parsed.title.filter(readable));
    }

    if body.starts_with('{') || body.starts_with('<') || body.len() > 500 {
        return None;
    }
    Some(body.to_string())
}
