//! Access-token providers.
//!
//! The card manager asks a provider for a token scoped to an identity and an
//! operation, then uses only the token's identity and its bearer string.

use async_trait::async_trait;
use std::fmt;

use crate::error::{AuthError, Result};
use crate::jwt::{AdditionalData, Jwt, JwtGenerator};

pub const OPERATION_PUBLISH: &str = "publish";
pub const OPERATION_GET: &str = "get";
pub const OPERATION_SEARCH: &str = "search";

/// A bearer credential for the card registry.
pub trait AccessToken: Send + Sync + fmt::Debug {
    /// Identity the token was issued for. Authoritative over caller input.
    fn identity(&self) -> &str;

    /// Bearer string sent to the registry.
    fn as_str(&self) -> &str;
}

impl AccessToken for Jwt {
    fn identity(&self) -> &str {
        Jwt::identity(self)
    }

    fn as_str(&self) -> &str {
        Jwt::as_str(self)
    }
}

/// What a token is requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContext {
    pub identity: Option<String>,
    pub operation: String,
}

impl TokenContext {
    pub fn new(identity: Option<String>, operation: impl Into<String>) -> Self {
        Self {
            identity,
            operation: operation.into(),
        }
    }

    pub fn publish(identity: impl Into<String>) -> Self {
        Self::new(Some(identity.into()), OPERATION_PUBLISH)
    }

    pub fn get() -> Self {
        Self::new(None, OPERATION_GET)
    }

    pub fn search(identity: impl Into<String>) -> Self {
        Self::new(Some(identity.into()), OPERATION_SEARCH)
    }
}

/// Source of access tokens.
///
/// Implementations may call out to a remote token service.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn get_token(&self, context: &TokenContext) -> Result<Box<dyn AccessToken>>;
}

/// Issues tokens locally with a [`JwtGenerator`] for one identity.
///
/// Every token names the provider's identity, whatever the request context
/// asks for, so identity-less requests such as fetching a card by id work.
#[derive(Debug, Clone)]
pub struct GeneratorJwtProvider {
    generator: JwtGenerator,
    identity: String,
    additional_data: Option<AdditionalData>,
}

impl GeneratorJwtProvider {
    pub fn new(generator: JwtGenerator, identity: impl Into<String>) -> Self {
        Self {
            generator,
            identity: identity.into(),
            additional_data: None,
        }
    }

    pub fn with_additional_data(mut self, data: AdditionalData) -> Self {
        self.additional_data = Some(data);
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

#[async_trait]
impl AccessTokenProvider for GeneratorJwtProvider {
    async fn get_token(&self, context: &TokenContext) -> Result<Box<dyn AccessToken>> {
        if let Some(asked) = context.identity.as_deref().filter(|a| *a != self.identity) {
            tracing::debug!(
                asked,
                issued = %self.identity,
                "issuing token for provider identity"
            );
        }
        let token = self
            .generator
            .generate_token(&self.identity, self.additional_data.clone())?;
        Ok(Box::new(token))
    }
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct ConstAccessTokenProvider {
    token: Jwt,
}

impl ConstAccessTokenProvider {
    pub fn new(token: Jwt) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AccessTokenProvider for ConstAccessTokenProvider {
    async fn get_token(&self, _context: &TokenContext) -> Result<Box<dyn AccessToken>> {
        Ok(Box::new(self.token.clone()))
    }
}

/// Callback returning a compact JWT for a request context.
pub type TokenCallback = dyn Fn(&TokenContext) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>
    + Send
    + Sync;

/// Obtains tokens from an application callback, typically one that asks the
/// application's own backend.
pub struct CallbackJwtProvider {
    callback: Box<TokenCallback>,
}

impl CallbackJwtProvider {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&TokenContext) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for CallbackJwtProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackJwtProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl AccessTokenProvider for CallbackJwtProvider {
    async fn get_token(&self, context: &TokenContext) -> Result<Box<dyn AccessToken>> {
        let compact =
            (self.callback)(context).map_err(|e| AuthError::Callback(e.to_string()))?;
        let token: Jwt = compact.parse()?;
        Ok(Box::new(token))
    }
}
