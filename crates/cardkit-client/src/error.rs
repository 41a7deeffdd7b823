//! Error types for the card registry transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error payload returned by the card registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u32,
    #[serde(default)]
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Errors that can occur talking to the card registry.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The registry answered with an error payload.
    #[error("service error: {0}")]
    Service(ErrorResponse),

    /// The request never got a usable answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer could not be decoded.
    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, ClientError>;
