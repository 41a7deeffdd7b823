//! Card: the materialized view of a signed envelope.

use crate::canonical::parse_extra_bytes;
use crate::crypto::{CardCrypto, PublicKey};
use crate::envelope::{RawSignature, RawSignedModel};
use crate::error::Result;
use crate::snapshot::ExtraSnapshot;
use crate::types::CardId;

/// A signature as seen on a materialized card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSignature {
    pub signer: String,
    pub signature: Vec<u8>,
    /// Raw extra snapshot bytes, exactly as signed.
    pub snapshot: Vec<u8>,
    /// Decoded extra fields; `None` when the snapshot is empty or not a
    /// JSON object.
    pub extra_fields: Option<ExtraSnapshot>,
}

impl CardSignature {
    /// Decode a wire signature, parsing its extra snapshot.
    pub fn from_raw(raw: &RawSignature) -> Self {
        Self {
            signer: raw.signer.clone(),
            signature: raw.signature.clone(),
            snapshot: raw.snapshot.clone(),
            extra_fields: parse_extra_bytes(&raw.snapshot),
        }
    }

    pub fn to_raw(&self) -> RawSignature {
        RawSignature {
            signer: self.signer.clone(),
            signature: self.signature.clone(),
            snapshot: self.snapshot.clone(),
        }
    }
}

/// A card: an identity bound to a public key, with its signatures.
///
/// `is_outdated` is set by whoever knows a newer card supersedes this one;
/// nothing here resolves `previous_card_id` chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub identity: String,
    pub public_key: PublicKey,
    pub version: String,
    /// Unix timestamp, seconds.
    pub created_at: i64,
    pub is_outdated: bool,
    pub signatures: Vec<CardSignature>,
    pub content_snapshot: Vec<u8>,
    pub previous_card_id: Option<CardId>,
}

impl Card {
    /// Materialize a card from a signed model.
    ///
    /// All content fields come from the model's own snapshot and the id is
    /// recomputed from its bytes. Signatures are not checked here.
    pub fn parse(crypto: &dyn CardCrypto, model: &RawSignedModel) -> Result<Self> {
        let content = model.content()?;
        let public_key = crypto.import_public_key(&content.public_key)?;
        let id = CardId::from_snapshot(crypto, model.content_snapshot())?;

        let signatures = model
            .signatures()
            .iter()
            .map(CardSignature::from_raw)
            .collect();

        Ok(Self {
            id,
            identity: content.identity,
            public_key,
            version: content.version,
            created_at: content.created_at,
            is_outdated: false,
            signatures,
            content_snapshot: model.content_snapshot().to_vec(),
            previous_card_id: content.previous_card_id,
        })
    }

    /// Rebuild the signed model this card was parsed from.
    pub fn to_raw_signed_model(&self) -> RawSignedModel {
        RawSignedModel::new(
            self.content_snapshot.clone(),
            self.signatures.iter().map(CardSignature::to_raw).collect(),
        )
    }

    /// First signature by `signer`, if any.
    pub fn signature_for(&self, signer: &str) -> Option<&CardSignature> {
        self.signatures.iter().find(|s| s.signer == signer)
    }
}
