//! Error types for the card core.

use thiserror::Error;

/// Errors that can occur while building, signing or decoding cards.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The crypto capability rejected a signing key or input.
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("hash too short for card id: need {needed} bytes, got {got}")]
    InvalidHash { needed: usize, got: usize },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("whitelist must contain at least one credential")]
    EmptyWhitelist,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
