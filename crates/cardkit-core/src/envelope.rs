//! Signature envelope: a content snapshot plus its detached signatures.
//!
//! The envelope is a carrier only. It validates nothing; trust decisions
//! belong to the verifier.
//!
//! Wire form:
//!
//! ```text
//! {
//!   "content_snapshot": base64(canonical snapshot),
//!   "signatures": [ { "signer": "...", "signature": base64, "snapshot": base64? } ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::canonical::parse_snapshot_bytes;
use crate::encoding;
use crate::error::{CoreError, Result};
use crate::snapshot::ContentSnapshot;

/// Signer id of the card owner.
pub const SELF_SIGNER: &str = "self";

/// One detached signature in an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    /// Who signed. Case-sensitive.
    pub signer: String,

    /// Signature over `content_snapshot || snapshot`.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub signature: Vec<u8>,

    /// The signer's extra-data snapshot; empty when the signer added none.
    #[serde(
        default,
        with = "crate::encoding::base64_or_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub snapshot: Vec<u8>,
}

/// A content snapshot and an ordered list of signatures over it.
///
/// Signatures are only ever appended. Their order carries no meaning for
/// verification but is kept for wire round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignedModel {
    #[serde(with = "crate::encoding::base64_bytes")]
    content_snapshot: Vec<u8>,

    #[serde(default)]
    signatures: Vec<RawSignature>,
}

impl RawSignedModel {
    pub fn new(content_snapshot: Vec<u8>, signatures: Vec<RawSignature>) -> Self {
        Self {
            content_snapshot,
            signatures,
        }
    }

    /// An envelope with no signatures yet.
    pub fn unsigned(content_snapshot: Vec<u8>) -> Self {
        Self::new(content_snapshot, Vec::new())
    }

    /// The canonical snapshot bytes.
    pub fn content_snapshot(&self) -> &[u8] {
        &self.content_snapshot
    }

    pub fn signatures(&self) -> &[RawSignature] {
        &self.signatures
    }

    /// First signature by `signer`, if any.
    pub fn signature_for(&self, signer: &str) -> Option<&RawSignature> {
        self.signatures.iter().find(|s| s.signer == signer)
    }

    /// Decode the content snapshot.
    pub fn content(&self) -> Result<ContentSnapshot> {
        parse_snapshot_bytes(&self.content_snapshot)
    }

    /// A copy of this envelope with `signature` appended.
    pub fn with_signature(&self, signature: RawSignature) -> Self {
        let mut signatures = self.signatures.clone();
        signatures.push(signature);
        Self::new(self.content_snapshot.clone(), signatures)
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<RawSignature>) {
        (self.content_snapshot, self.signatures)
    }

    /// Serialize to wire JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Deserialize from wire JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::DecodingError(format!("signed model: {e}")))
    }

    /// Base64 of the wire JSON, the portable string form of a card.
    pub fn to_base64_string(&self) -> Result<String> {
        Ok(encoding::encode(self.to_json()?.as_bytes()))
    }

    /// Parse the portable string form produced by [`Self::to_base64_string`].
    pub fn from_base64_string(s: &str) -> Result<Self> {
        let bytes = encoding::decode(s)?;
        let json = String::from_utf8(bytes)
            .map_err(|e| CoreError::DecodingError(format!("signed model is not utf-8: {e}")))?;
        Self::from_json(&json)
    }
}
