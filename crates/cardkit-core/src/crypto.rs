//! Crypto capability used by the card protocol.
//!
//! The protocol never calls a signature algorithm directly: everything goes
//! through [`CardCrypto`]. [`Ed25519CardCrypto`] binds the capability to
//! ed25519-dalek and SHA-512.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::{CoreError, Result};

/// DER prefix of an Ed25519 SubjectPublicKeyInfo (RFC 8410).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// A public key as understood by the crypto capability.
///
/// For [`Ed25519CardCrypto`] this is the raw 32-byte point.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Wrap raw key bytes. No validation happens here.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PublicKey({})", &hex[..hex.len().min(16)])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Private key material handed to a signing call.
///
/// Never logged: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    /// Wrap raw key bytes. For Ed25519 this is the 32-byte seed.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// The crypto capability consumed by signer, verifier and card manager.
pub trait CardCrypto: Send + Sync {
    /// Export a public key to its transferable byte form.
    fn export_public_key(&self, key: &PublicKey) -> Result<Vec<u8>>;

    /// Import a public key from its transferable byte form.
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey>;

    /// SHA-512 digest of `data`.
    fn generate_sha512(&self, data: &[u8]) -> Vec<u8>;

    /// Sign `data`. Fails with [`CoreError::Signing`] if the key or input is rejected.
    fn generate_signature(&self, data: &[u8], key: &PrivateKey) -> Result<Vec<u8>>;

    /// Check `signature` over `data`. Malformed inputs are simply `false`.
    fn verify_signature(&self, signature: &[u8], data: &[u8], key: &PublicKey) -> bool;
}

/// [`CardCrypto`] over Ed25519 keys.
///
/// Public keys export as DER SubjectPublicKeyInfo and import from either DER
/// or the raw 32-byte form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519CardCrypto;

impl Ed25519CardCrypto {
    pub fn new() -> Self {
        Self
    }

    fn verifying_key(key: &PublicKey) -> Result<VerifyingKey> {
        let bytes: &[u8; 32] = key.as_bytes().try_into().map_err(|_| {
            CoreError::InvalidPublicKey(format!("expected 32 bytes, got {}", key.as_bytes().len()))
        })?;
        VerifyingKey::from_bytes(bytes)
            .map_err(|_| CoreError::InvalidPublicKey("not a valid Ed25519 point".into()))
    }

    fn signing_key(key: &PrivateKey) -> Result<SigningKey> {
        let seed: &[u8; 32] = key.as_bytes().try_into().map_err(|_| {
            CoreError::Signing(format!(
                "private key must be a 32-byte seed, got {} bytes",
                key.as_bytes().len()
            ))
        })?;
        Ok(SigningKey::from_bytes(seed))
    }
}

impl CardCrypto for Ed25519CardCrypto {
    fn export_public_key(&self, key: &PublicKey) -> Result<Vec<u8>> {
        let verifying_key = Self::verifying_key(key)?;
        let mut der = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + 32);
        der.extend_from_slice(&ED25519_SPKI_PREFIX);
        der.extend_from_slice(verifying_key.as_bytes());
        Ok(der)
    }

    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey> {
        let raw = match bytes.len() {
            32 => bytes,
            44 if bytes.starts_with(&ED25519_SPKI_PREFIX) => &bytes[ED25519_SPKI_PREFIX.len()..],
            n => {
                return Err(CoreError::InvalidPublicKey(format!(
                    "expected 32 raw or 44 DER bytes, got {n}"
                )))
            }
        };
        let key = PublicKey::from_bytes(raw);
        Self::verifying_key(&key)?;
        Ok(key)
    }

    fn generate_sha512(&self, data: &[u8]) -> Vec<u8> {
        Sha512::digest(data).to_vec()
    }

    fn generate_signature(&self, data: &[u8], key: &PrivateKey) -> Result<Vec<u8>> {
        let signing_key = Self::signing_key(key)?;
        Ok(signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify_signature(&self, signature: &[u8], data: &[u8], key: &PublicKey) -> bool {
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(verifying_key) = Self::verifying_key(key) else {
            return false;
        };
        verifying_key
            .verify(data, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

/// An Ed25519 key pair.
///
/// Convenience for callers that hold a raw seed; the card core does not
/// persist or manage keys.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    pub fn private_key(&self) -> PrivateKey {
        PrivateKey::from_bytes(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}
