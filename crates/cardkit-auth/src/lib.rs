//! # Cardkit Auth
//!
//! Access tokens for talking to the card registry.
//!
//! ## Overview
//!
//! - [`JwtGenerator`] issues short-lived signed tokens for an application key
//! - [`AccessTokenSigner`] abstracts the token signature; [`CryptoTokenSigner`]
//!   routes it through the card crypto capability
//! - [`AccessTokenProvider`] is what the card manager consumes: generator,
//!   constant and callback implementations are provided
//!
//! The identity inside a token is authoritative. A card manager publishing
//! with a token uses the token's identity, not the caller's.

pub mod error;
pub mod jwt;
pub mod provider;
pub mod signer;

pub use error::{AuthError, Result};
pub use jwt::{
    AdditionalData, Jwt, JwtBody, JwtGenerator, JwtGeneratorConfig, JwtHeader, JwtVerifier,
    DEFAULT_TOKEN_TTL_SECS,
};
pub use provider::{
    AccessToken, AccessTokenProvider, CallbackJwtProvider, ConstAccessTokenProvider,
    GeneratorJwtProvider, TokenContext, OPERATION_GET, OPERATION_PUBLISH, OPERATION_SEARCH,
};
pub use signer::{AccessTokenSigner, CryptoTokenSigner, CRYPTO_TOKEN_ALGORITHM};
