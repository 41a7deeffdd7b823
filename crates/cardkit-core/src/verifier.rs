//! Card verification against a trust policy.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. the owner's self-signature, against the card's own public key
//! 2. the authority signature, against the configured authority key
//! 3. each whitelist in declaration order; one valid credential satisfies it
//!
//! A missing signature is a `false` result, not an error.

use std::sync::Arc;

use crate::canonical::signed_payload;
use crate::card::Card;
use crate::crypto::{CardCrypto, PublicKey};
use crate::envelope::SELF_SIGNER;
use crate::error::{CoreError, Result};

/// Decides whether a card is acceptable.
pub trait CardVerifier: Send + Sync {
    fn verify_card(&self, card: &Card) -> bool;
}

/// A signer id and the key its signatures must verify under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierCredentials {
    pub signer: String,
    pub public_key: PublicKey,
}

impl VerifierCredentials {
    pub fn new(signer: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            signer: signer.into(),
            public_key,
        }
    }
}

/// A set of acceptable co-signers. At least one must have signed the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Whitelist {
    credentials: Vec<VerifierCredentials>,
}

impl Whitelist {
    /// Create a whitelist. Fails if `credentials` is empty.
    pub fn new(credentials: Vec<VerifierCredentials>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(CoreError::EmptyWhitelist);
        }
        Ok(Self { credentials })
    }

    pub fn credentials(&self) -> &[VerifierCredentials] {
        &self.credentials
    }
}

/// What a card must carry to be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    pub require_self_signature: bool,
    pub require_authority_signature: bool,
    /// Signer id the authority signs under.
    pub authority_signer: String,
    pub authority_public_key: PublicKey,
    pub whitelists: Vec<Whitelist>,
}

impl TrustPolicy {
    /// A policy requiring both self and authority signatures, no whitelists.
    pub fn new(authority_signer: impl Into<String>, authority_public_key: PublicKey) -> Self {
        Self {
            require_self_signature: true,
            require_authority_signature: true,
            authority_signer: authority_signer.into(),
            authority_public_key,
            whitelists: Vec::new(),
        }
    }

    pub fn require_self_signature(mut self, required: bool) -> Self {
        self.require_self_signature = required;
        self
    }

    pub fn require_authority_signature(mut self, required: bool) -> Self {
        self.require_authority_signature = required;
        self
    }

    pub fn with_whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelists.push(whitelist);
        self
    }
}

/// [`CardVerifier`] that enforces a [`TrustPolicy`].
#[derive(Clone)]
pub struct TrustPolicyVerifier {
    crypto: Arc<dyn CardCrypto>,
    policy: TrustPolicy,
}

impl TrustPolicyVerifier {
    pub fn new(crypto: Arc<dyn CardCrypto>, policy: TrustPolicy) -> Self {
        Self { crypto, policy }
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Check the first signature by `signer` against `public_key`.
    fn validate_signer_signature(&self, card: &Card, signer: &str, public_key: &PublicKey) -> bool {
        let Some(signature) = card.signature_for(signer) else {
            return false;
        };
        let payload = signed_payload(&card.content_snapshot, &signature.snapshot);
        self.crypto
            .verify_signature(&signature.signature, &payload, public_key)
    }
}

impl CardVerifier for TrustPolicyVerifier {
    fn verify_card(&self, card: &Card) -> bool {
        if self.policy.require_self_signature
            && !self.validate_signer_signature(card, SELF_SIGNER, &card.public_key)
        {
            tracing::debug!(card_id = %card.id, "rejected: self signature missing or invalid");
            return false;
        }

        if self.policy.require_authority_signature
            && !self.validate_signer_signature(
                card,
                &self.policy.authority_signer,
                &self.policy.authority_public_key,
            )
        {
            tracing::debug!(
                card_id = %card.id,
                signer = %self.policy.authority_signer,
                "rejected: authority signature missing or invalid"
            );
            return false;
        }

        for (index, whitelist) in self.policy.whitelists.iter().enumerate() {
            let satisfied = whitelist.credentials().iter().any(|cred| {
                self.validate_signer_signature(card, &cred.signer, &cred.public_key)
            });
            if !satisfied {
                tracing::debug!(card_id = %card.id, whitelist = index, "rejected: whitelist not satisfied");
                return false;
            }
        }

        true
    }
}

impl std::fmt::Debug for TrustPolicyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustPolicyVerifier")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
