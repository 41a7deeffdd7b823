//! Error types for token operations.

use thiserror::Error;

/// Errors that can occur while issuing, parsing or obtaining tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token string is not a well-formed JWT.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Token could not be encoded.
    #[error("token encoding error: {0}")]
    Encoding(String),

    /// The token signer rejected the key or input.
    #[error("token signing failed: {0}")]
    Signing(#[from] cardkit_core::CoreError),

    /// A token was requested for an empty identity.
    #[error("no identity available for token")]
    MissingIdentity,

    /// A token callback failed.
    #[error("token callback failed: {0}")]
    Callback(String),
}

/// Result type for token operations.
pub type Result<T> = std::result::Result<T, AuthError>;
