//! # Cardkit Core
//!
//! Pure primitives for identity cards: content snapshots, signature
//! envelopes, signing, and trust-policy verification.
//!
//! This crate contains no I/O and no networking. Signature algorithms are
//! reached only through the [`CardCrypto`] capability.
//!
//! ## Key Types
//!
//! - [`ContentSnapshot`] - Canonical, immutable card content
//! - [`RawSignedModel`] - Envelope: snapshot bytes plus detached signatures
//! - [`Card`] - Materialized view of an envelope
//! - [`CardId`] - First 32 bytes of SHA-512(content snapshot)
//! - [`ModelSigner`] - Appends self, authority or co-signer signatures
//! - [`TrustPolicyVerifier`] - Evaluates cards against a [`TrustPolicy`]
//!
//! ## Signed payload
//!
//! Every signature covers `content_snapshot || extra_snapshot`. See the
//! [`canonical`] module.

pub mod canonical;
pub mod card;
pub mod crypto;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod signer;
pub mod snapshot;
pub mod types;
pub mod verifier;

pub use canonical::{canonical_extra_bytes, canonical_snapshot_bytes, signed_payload};
pub use card::{Card, CardSignature};
pub use crypto::{CardCrypto, Ed25519CardCrypto, KeyPair, PrivateKey, PublicKey};
pub use envelope::{RawSignature, RawSignedModel, SELF_SIGNER};
pub use error::{CoreError, Result};
pub use signer::ModelSigner;
pub use snapshot::{
    extra_snapshot, ContentSnapshot, ExtraFields, ExtraSnapshot, ExtraValue, CARD_VERSION,
};
pub use types::{now_secs, CardId};
pub use verifier::{CardVerifier, TrustPolicy, TrustPolicyVerifier, VerifierCredentials, Whitelist};
