//! Test fixtures and helpers.
//!
//! Deterministic parties for integration tests: a card owner, the registry
//! authority, a whitelisted partner and an application token key.

use std::sync::Arc;
use std::time::Duration;

use cardkit::{CardManager, CardParams, DEFAULT_AUTHORITY_SIGNER};
use cardkit_auth::{CryptoTokenSigner, GeneratorJwtProvider, JwtGenerator, JwtVerifier};
use cardkit_client::memory::InMemoryCardService;
use cardkit_core::{
    canonical_snapshot_bytes, CardCrypto, ContentSnapshot, Ed25519CardCrypto, KeyPair,
    ModelSigner, RawSignedModel, TrustPolicy, TrustPolicyVerifier, VerifierCredentials, Whitelist,
};

pub const APP_ID: &str = "test-app";
pub const APP_KEY_ID: &str = "test-app-key";
pub const PARTNER_SIGNER: &str = "partner";
/// Identity the default token provider issues for.
pub const OWNER_IDENTITY: &str = "alice";

/// Keys for every party in a card exchange.
pub struct TestFixture {
    pub crypto: Arc<dyn CardCrypto>,
    pub owner: KeyPair,
    pub authority: KeyPair,
    pub partner: KeyPair,
    pub app_key: KeyPair,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_seed(0x01)
    }

    /// Parties keyed from consecutive seeds starting at `seed`.
    pub fn with_seed(seed: u8) -> Self {
        let key = |offset: u8| KeyPair::from_seed(&[seed.wrapping_add(offset); 32]);
        Self {
            crypto: Arc::new(Ed25519CardCrypto::new()),
            owner: key(0),
            authority: key(1),
            partner: key(2),
            app_key: key(3),
        }
    }

    pub fn signer(&self) -> ModelSigner {
        ModelSigner::new(Arc::clone(&self.crypto))
    }

    /// Card parameters for the owner's key.
    pub fn owner_params(&self, identity: &str) -> CardParams {
        CardParams::new(identity, self.owner.public_key(), self.owner.private_key())
    }

    /// The owner's content snapshot for `identity`, unsigned.
    pub fn unsigned_model(&self, identity: &str, created_at: i64) -> RawSignedModel {
        let exported = self
            .crypto
            .export_public_key(&self.owner.public_key())
            .expect("fixture key exports");
        let content = ContentSnapshot::new(identity, exported, created_at);
        RawSignedModel::unsigned(canonical_snapshot_bytes(&content).expect("snapshot encodes"))
    }

    /// The owner's card for `identity`, self-signed.
    pub fn self_signed_model(&self, identity: &str, created_at: i64) -> RawSignedModel {
        self.signer()
            .self_sign(
                &self.unsigned_model(identity, created_at),
                &self.owner.private_key(),
                None,
            )
            .expect("fixture key signs")
    }

    pub fn token_generator(&self) -> JwtGenerator {
        JwtGenerator::new(
            self.app_key.private_key(),
            APP_KEY_ID,
            Arc::new(CryptoTokenSigner::new(Arc::clone(&self.crypto))),
            APP_ID,
            Duration::from_secs(600),
        )
    }

    /// Tokens for [`OWNER_IDENTITY`].
    pub fn token_provider(&self) -> GeneratorJwtProvider {
        self.token_provider_for(OWNER_IDENTITY)
    }

    pub fn token_provider_for(&self, identity: &str) -> GeneratorJwtProvider {
        GeneratorJwtProvider::new(self.token_generator(), identity)
    }

    pub fn token_verifier(&self) -> JwtVerifier {
        JwtVerifier::new(
            self.app_key.public_key(),
            APP_KEY_ID,
            Arc::new(CryptoTokenSigner::new(Arc::clone(&self.crypto))),
        )
    }

    /// Self and authority signatures required, no whitelists.
    pub fn trust_policy(&self) -> TrustPolicy {
        TrustPolicy::new(DEFAULT_AUTHORITY_SIGNER, self.authority.public_key())
    }

    /// A whitelist holding only the partner.
    pub fn partner_whitelist(&self) -> Whitelist {
        Whitelist::new(vec![VerifierCredentials::new(
            PARTNER_SIGNER,
            self.partner.public_key(),
        )])
        .expect("non-empty whitelist")
    }

    pub fn verifier(&self, policy: TrustPolicy) -> TrustPolicyVerifier {
        TrustPolicyVerifier::new(Arc::clone(&self.crypto), policy)
    }

    /// An in-memory registry countersigning with the authority key and
    /// checking tokens against the app key.
    pub fn registry(&self) -> InMemoryCardService {
        InMemoryCardService::new(
            Arc::clone(&self.crypto),
            DEFAULT_AUTHORITY_SIGNER,
            self.authority.private_key(),
        )
        .with_token_verifier(self.token_verifier())
    }

    /// A manager for [`OWNER_IDENTITY`] wired to `registry` with the default
    /// trust policy.
    pub fn manager(&self, registry: Arc<InMemoryCardService>) -> CardManager {
        self.manager_with(
            registry,
            Arc::new(self.token_provider()),
            self.trust_policy(),
        )
    }

    pub fn manager_with(
        &self,
        registry: Arc<InMemoryCardService>,
        provider: Arc<dyn cardkit_auth::AccessTokenProvider>,
        policy: TrustPolicy,
    ) -> CardManager {
        CardManager::new(
            Arc::clone(&self.crypto),
            provider,
            Arc::new(self.verifier(policy)),
            registry,
        )
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures whose owners all hold different keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::with_seed((i as u8).wrapping_mul(8).wrapping_add(1)))
        .collect()
}
