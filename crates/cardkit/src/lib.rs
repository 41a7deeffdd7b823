//! # Cardkit
//!
//! Identity cards: signed bindings between an identity string and a public
//! key, published to and fetched from a card registry.
//!
//! ## Overview
//!
//! - **Generate**: build a card's content snapshot and self-sign it
//! - **Publish**: submit it with an access token; the registry countersigns
//! - **Fetch**: get by id or search by identity
//! - **Verify**: every card handed out has passed the configured trust policy
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cardkit::auth::{CryptoTokenSigner, GeneratorJwtProvider, JwtGenerator};
//! use cardkit::{CardKitConfig, CardManager, CardParams, Ed25519CardCrypto, KeyPair};
//!
//! async fn example() -> cardkit::Result<()> {
//!     let crypto = Arc::new(Ed25519CardCrypto::new());
//!     let app_key = KeyPair::generate();
//!     let generator = JwtGenerator::new(
//!         app_key.private_key(),
//!         "app-key-id",
//!         Arc::new(CryptoTokenSigner::new(crypto.clone())),
//!         "app-id",
//!         Duration::from_secs(3600),
//!     );
//!
//!     let manager = CardManager::from_config(
//!         &CardKitConfig::default(),
//!         crypto,
//!         Arc::new(GeneratorJwtProvider::new(generator, "alice")),
//!     )?;
//!
//!     let owner = KeyPair::generate();
//!     let params = CardParams::new("alice", owner.public_key(), owner.private_key());
//!     let card = manager.publish_card(&params).await?;
//!     println!("published {}", card.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cardkit::core` - Snapshots, envelopes, signing, verification
//! - `cardkit::auth` - Access tokens and token providers
//! - `cardkit::client` - Registry transport

pub mod config;
pub mod error;
pub mod hook;
pub mod manager;

pub use cardkit_auth as auth;
pub use cardkit_client as client;
pub use cardkit_core as core;

pub use config::{
    CardKitConfig, ClientConfig, CredentialsConfig, VerifierConfig, DEFAULT_AUTHORITY_PUBLIC_KEY,
    DEFAULT_AUTHORITY_SIGNER, DEFAULT_SERVICE_URL,
};
pub use error::{CardError, Result};
pub use hook::{HookError, SignHook};
pub use manager::{CardManager, CardParams};

pub use cardkit_core::{
    Card, CardCrypto, CardId, CardSignature, CardVerifier, ContentSnapshot, Ed25519CardCrypto,
    ExtraFields, ExtraSnapshot, ExtraValue, KeyPair, PrivateKey, PublicKey, RawSignature,
    RawSignedModel, TrustPolicy, TrustPolicyVerifier, SELF_SIGNER,
};
