//! Model signer: appends signatures to envelopes.
//!
//! Every signature covers `content_snapshot || extra_snapshot`, where the
//! extra snapshot is the canonical encoding of the signer's own extra fields.

use std::sync::Arc;

use crate::canonical::{canonical_extra_bytes, signed_payload};
use crate::crypto::{CardCrypto, PrivateKey};
use crate::envelope::{RawSignature, RawSignedModel, SELF_SIGNER};
use crate::error::Result;
use crate::snapshot::ExtraFields;

/// Signs envelopes through a [`CardCrypto`] capability.
///
/// Each call returns a new envelope with exactly one signature appended.
/// Signer ids are not checked for uniqueness.
#[derive(Clone)]
pub struct ModelSigner {
    crypto: Arc<dyn CardCrypto>,
}

impl ModelSigner {
    pub fn new(crypto: Arc<dyn CardCrypto>) -> Self {
        Self { crypto }
    }

    /// Sign as the card owner (`"self"`).
    pub fn self_sign(
        &self,
        model: &RawSignedModel,
        private_key: &PrivateKey,
        extra_fields: Option<&ExtraFields>,
    ) -> Result<RawSignedModel> {
        self.sign(model, SELF_SIGNER, private_key, extra_fields)
    }

    /// Sign as the issuing authority. Authorities add no extra fields.
    pub fn authority_sign(
        &self,
        model: &RawSignedModel,
        signer_id: &str,
        private_key: &PrivateKey,
    ) -> Result<RawSignedModel> {
        self.sign(model, signer_id, private_key, None)
    }

    /// Sign under an arbitrary signer id, e.g. a whitelisted co-signer.
    pub fn sign(
        &self,
        model: &RawSignedModel,
        signer_id: &str,
        private_key: &PrivateKey,
        extra_fields: Option<&ExtraFields>,
    ) -> Result<RawSignedModel> {
        let extra_snapshot = canonical_extra_bytes(extra_fields)?;
        let payload = signed_payload(model.content_snapshot(), &extra_snapshot);
        let signature = self.crypto.generate_signature(&payload, private_key)?;

        Ok(model.with_signature(RawSignature {
            signer: signer_id.to_string(),
            signature,
            snapshot: extra_snapshot,
        }))
    }
}

impl std::fmt::Debug for ModelSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSigner").finish_non_exhaustive()
    }
}
