//! Error types for card management.

use cardkit_auth::AuthError;
use cardkit_client::{ClientError, ErrorResponse};
use cardkit_core::CoreError;
use thiserror::Error;

/// Errors that can occur during card manager operations.
#[derive(Debug, Error)]
pub enum CardError {
    /// The registry rejected the request.
    #[error("card service error: {0}")]
    Client(ErrorResponse),

    /// A card failed the trust policy or does not match what was asked for.
    #[error("card verification failed: {0}")]
    Verification(String),

    /// The registry could not be reached or answered garbage.
    #[error("transport error: {0}")]
    Transport(String),

    /// Envelope, snapshot or crypto error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Token could not be obtained.
    #[error("access token error: {0}")]
    Auth(#[from] AuthError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A sign hook returned an error; holds its message.
    #[error("sign hook failed: {0}")]
    SignHook(String),
}

impl From<ClientError> for CardError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Service(response) => CardError::Client(response),
            ClientError::Transport(msg) => CardError::Transport(msg),
            ClientError::Decoding(msg) => CardError::Transport(format!("bad response: {msg}")),
        }
    }
}

/// Result type for card manager operations.
pub type Result<T> = std::result::Result<T, CardError>;
