//! An in-memory card registry for tests and offline use.
//!
//! Behaves like the real registry on the points callers depend on: the
//! bearer token names the identity, the owner's self signature is required,
//! accepted cards come back countersigned by the authority, and publishing a
//! card with a `previous_card_id` marks the earlier card as superseded.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use cardkit_auth::{Jwt, JwtVerifier};
use cardkit_core::{
    canonical_snapshot_bytes, now_secs, signed_payload, CardCrypto, CardId, ContentSnapshot,
    ModelSigner, PrivateKey, RawSignedModel, SELF_SIGNER,
};

use crate::client::{CardClient, GetCardResponse};
use crate::error::{ClientError, ErrorResponse, Result};

pub const ERROR_INVALID_SNAPSHOT: u32 = 40000;
pub const ERROR_SELF_SIGNATURE: u32 = 40001;
pub const ERROR_INVALID_TOKEN: u32 = 40100;
pub const ERROR_IDENTITY_MISMATCH: u32 = 40300;
pub const ERROR_CARD_NOT_FOUND: u32 = 40400;
pub const ERROR_CARD_EXISTS: u32 = 40900;

fn rejected(code: u32, message: impl Into<String>) -> ClientError {
    ClientError::Service(ErrorResponse::new(code, message))
}

#[derive(Debug, Clone)]
struct StoredCard {
    id: CardId,
    identity: String,
    model: RawSignedModel,
    superseded: bool,
}

/// Card registry held in process memory.
pub struct InMemoryCardService {
    crypto: Arc<dyn CardCrypto>,
    signer: ModelSigner,
    authority_signer: String,
    authority_key: PrivateKey,
    token_verifier: Option<JwtVerifier>,
    rewrite_identity: bool,
    failure: Option<ErrorResponse>,
    cards: RwLock<Vec<StoredCard>>,
}

impl InMemoryCardService {
    /// A registry countersigning as `authority_signer` with `authority_key`.
    pub fn new(
        crypto: Arc<dyn CardCrypto>,
        authority_signer: impl Into<String>,
        authority_key: PrivateKey,
    ) -> Self {
        Self {
            signer: ModelSigner::new(Arc::clone(&crypto)),
            crypto,
            authority_signer: authority_signer.into(),
            authority_key,
            token_verifier: None,
            rewrite_identity: false,
            failure: None,
            cards: RwLock::new(Vec::new()),
        }
    }

    /// Also check token signatures and expiry.
    pub fn with_token_verifier(mut self, verifier: JwtVerifier) -> Self {
        self.token_verifier = Some(verifier);
        self
    }

    /// Replace a mismatching snapshot identity with the token's identity
    /// instead of rejecting the card.
    pub fn rewrite_identity_from_token(mut self, enabled: bool) -> Self {
        self.rewrite_identity = enabled;
        self
    }

    /// Answer every publish with `error`.
    pub fn fail_publish_with(mut self, error: ErrorResponse) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of cards stored.
    pub async fn card_count(&self) -> usize {
        self.cards.read().await.len()
    }

    fn authenticate(&self, token: &str) -> Result<Jwt> {
        let jwt: Jwt = token
            .parse()
            .map_err(|e: cardkit_auth::AuthError| rejected(ERROR_INVALID_TOKEN, e.to_string()))?;

        if let Some(verifier) = &self.token_verifier {
            if !verifier.verify_token(&jwt) {
                return Err(rejected(ERROR_INVALID_TOKEN, "token signature is invalid"));
            }
            if jwt.is_expired(now_secs()) {
                return Err(rejected(ERROR_INVALID_TOKEN, "token has expired"));
            }
        }
        Ok(jwt)
    }

    fn check_self_signature(&self, model: &RawSignedModel, content: &ContentSnapshot) -> Result<()> {
        let signature = model
            .signature_for(SELF_SIGNER)
            .ok_or_else(|| rejected(ERROR_SELF_SIGNATURE, "self signature is missing"))?;
        let public_key = self
            .crypto
            .import_public_key(&content.public_key)
            .map_err(|e| rejected(ERROR_INVALID_SNAPSHOT, e.to_string()))?;

        let payload = signed_payload(model.content_snapshot(), &signature.snapshot);
        if self
            .crypto
            .verify_signature(&signature.signature, &payload, &public_key)
        {
            Ok(())
        } else {
            Err(rejected(ERROR_SELF_SIGNATURE, "self signature is invalid"))
        }
    }

    /// Bring the snapshot identity in line with the token.
    fn assert_identity(
        &self,
        model: &RawSignedModel,
        mut content: ContentSnapshot,
        token: &Jwt,
    ) -> Result<RawSignedModel> {
        if content.identity == token.identity() {
            return Ok(model.clone());
        }
        if !self.rewrite_identity {
            return Err(rejected(
                ERROR_IDENTITY_MISMATCH,
                format!("token is not valid for identity {}", content.identity),
            ));
        }

        tracing::debug!(from = %content.identity, to = %token.identity(), "rewriting card identity");
        content.identity = token.identity().to_string();
        let snapshot = canonical_snapshot_bytes(&content)
            .map_err(|e| rejected(ERROR_INVALID_SNAPSHOT, e.to_string()))?;
        Ok(RawSignedModel::new(snapshot, model.signatures().to_vec()))
    }
}

#[async_trait]
impl CardClient for InMemoryCardService {
    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel> {
        if let Some(error) = &self.failure {
            return Err(ClientError::Service(error.clone()));
        }

        let token = self.authenticate(token)?;
        let content = model
            .content()
            .map_err(|e| rejected(ERROR_INVALID_SNAPSHOT, e.to_string()))?;
        self.check_self_signature(model, &content)?;

        let previous = content.previous_card_id;
        let accepted = self.assert_identity(model, content, &token)?;
        let signed = self
            .signer
            .authority_sign(&accepted, &self.authority_signer, &self.authority_key)
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let id = CardId::from_snapshot(self.crypto.as_ref(), signed.content_snapshot())
            .map_err(|e| rejected(ERROR_INVALID_SNAPSHOT, e.to_string()))?;

        let mut cards = self.cards.write().await;
        if cards.iter().any(|c| c.id == id) {
            return Err(rejected(ERROR_CARD_EXISTS, "card with this id already exists"));
        }
        if let Some(previous) = previous {
            if let Some(old) = cards.iter_mut().find(|c| c.id == previous) {
                old.superseded = true;
            }
        }
        cards.push(StoredCard {
            id,
            identity: token.identity().to_string(),
            model: signed.clone(),
            superseded: false,
        });

        tracing::debug!(card_id = %id, "card stored");
        Ok(signed)
    }

    async fn get_card(&self, card_id: &str, token: &str) -> Result<GetCardResponse> {
        self.authenticate(token)?;
        let id: CardId = card_id
            .parse()
            .map_err(|_| rejected(ERROR_CARD_NOT_FOUND, "card not found"))?;

        let cards = self.cards.read().await;
        cards
            .iter()
            .find(|c| c.id == id)
            .map(|c| GetCardResponse {
                model: c.model.clone(),
                is_outdated: c.superseded,
            })
            .ok_or_else(|| rejected(ERROR_CARD_NOT_FOUND, "card not found"))
    }

    async fn search_cards(&self, identity: &str, token: &str) -> Result<Vec<RawSignedModel>> {
        self.authenticate(token)?;
        let cards = self.cards.read().await;
        Ok(cards
            .iter()
            .filter(|c| c.identity == identity)
            .map(|c| c.model.clone())
            .collect())
    }
}

impl std::fmt::Debug for InMemoryCardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCardService")
            .field("authority_signer", &self.authority_signer)
            .field("rewrite_identity", &self.rewrite_identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardkit_auth::{CryptoTokenSigner, JwtGenerator};
    use cardkit_core::{Ed25519CardCrypto, KeyPair};
    use std::time::Duration;

    struct Setup {
        crypto: Arc<dyn CardCrypto>,
        owner: KeyPair,
        authority: KeyPair,
        generator: JwtGenerator,
        app_key: KeyPair,
    }

    fn setup() -> Setup {
        let crypto: Arc<dyn CardCrypto> = Arc::new(Ed25519CardCrypto::new());
        let app_key = KeyPair::from_seed(&[0x44; 32]);
        let generator = JwtGenerator::new(
            app_key.private_key(),
            "app-key",
            Arc::new(CryptoTokenSigner::new(Arc::clone(&crypto))),
            "app",
            Duration::from_secs(600),
        );
        Setup {
            crypto,
            owner: KeyPair::from_seed(&[0x11; 32]),
            authority: KeyPair::from_seed(&[0x22; 32]),
            generator,
            app_key,
        }
    }

    fn service(s: &Setup) -> InMemoryCardService {
        InMemoryCardService::new(Arc::clone(&s.crypto), "virgil", s.authority.private_key())
    }

    fn self_signed(s: &Setup, identity: &str, previous: Option<CardId>) -> RawSignedModel {
        let exported = s.crypto.export_public_key(&s.owner.public_key()).unwrap();
        let content =
            ContentSnapshot::new(identity, exported, 1_700_000_000).previous_card_id(previous);
        let model = RawSignedModel::unsigned(canonical_snapshot_bytes(&content).unwrap());
        ModelSigner::new(Arc::clone(&s.crypto))
            .self_sign(&model, &s.owner.private_key(), None)
            .unwrap()
    }

    fn token(s: &Setup, identity: &str) -> String {
        s.generator.generate_token(identity, None).unwrap().to_string()
    }

    fn service_code(err: ClientError) -> u32 {
        match err {
            ClientError::Service(e) => e.code,
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_countersigns() {
        let s = setup();
        let registry = service(&s);

        let published = registry
            .publish_card(&self_signed(&s, "alice", None), &token(&s, "alice"))
            .await
            .unwrap();

        assert_eq!(published.signatures().len(), 2);
        let authority = published.signature_for("virgil").unwrap();
        let payload = signed_payload(published.content_snapshot(), &authority.snapshot);
        assert!(s
            .crypto
            .verify_signature(&authority.signature, &payload, &s.authority.public_key()));
        assert_eq!(registry.card_count().await, 1);
    }

    #[tokio::test]
    async fn test_publish_requires_self_signature() {
        let s = setup();
        let registry = service(&s);
        let signed = self_signed(&s, "alice", None);
        let unsigned = RawSignedModel::unsigned(signed.content_snapshot().to_vec());

        let err = registry
            .publish_card(&unsigned, &token(&s, "alice"))
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ERROR_SELF_SIGNATURE);
    }

    #[tokio::test]
    async fn test_identity_mismatch_rejected() {
        let s = setup();
        let registry = service(&s);

        let err = registry
            .publish_card(&self_signed(&s, "alice", None), &token(&s, "bob"))
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ERROR_IDENTITY_MISMATCH);
    }

    #[tokio::test]
    async fn test_identity_rewritten_from_token() {
        let s = setup();
        let registry = service(&s).rewrite_identity_from_token(true);

        let published = registry
            .publish_card(&self_signed(&s, "alice", None), &token(&s, "bob"))
            .await
            .unwrap();
        assert_eq!(published.content().unwrap().identity, "bob");
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let s = setup();
        let registry = service(&s);
        let model = self_signed(&s, "alice", None);

        registry.publish_card(&model, &token(&s, "alice")).await.unwrap();
        let err = registry
            .publish_card(&model, &token(&s, "alice"))
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ERROR_CARD_EXISTS);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let s = setup();
        let registry = service(&s).fail_publish_with(ErrorResponse::new(50000, "maintenance"));

        let err = registry
            .publish_card(&self_signed(&s, "alice", None), &token(&s, "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Service(e) if e.message == "maintenance"));
    }

    #[tokio::test]
    async fn test_get_marks_superseded() {
        let s = setup();
        let registry = service(&s);
        let first = registry
            .publish_card(&self_signed(&s, "alice", None), &token(&s, "alice"))
            .await
            .unwrap();
        let first_id = CardId::from_snapshot(s.crypto.as_ref(), first.content_snapshot()).unwrap();

        let fetched = registry
            .get_card(&first_id.to_hex(), &token(&s, "alice"))
            .await
            .unwrap();
        assert!(!fetched.is_outdated);
        assert_eq!(fetched.model, first);

        registry
            .publish_card(&self_signed(&s, "alice", Some(first_id)), &token(&s, "alice"))
            .await
            .unwrap();

        let fetched = registry
            .get_card(&first_id.to_hex(), &token(&s, "alice"))
            .await
            .unwrap();
        assert!(fetched.is_outdated);
    }

    #[tokio::test]
    async fn test_get_unknown_card() {
        let s = setup();
        let registry = service(&s);
        let err = registry
            .get_card(&"ab".repeat(32), &token(&s, "alice"))
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ERROR_CARD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_by_identity() {
        let s = setup();
        let registry = service(&s);
        registry
            .publish_card(&self_signed(&s, "alice", None), &token(&s, "alice"))
            .await
            .unwrap();
        registry
            .publish_card(&self_signed(&s, "bob", None), &token(&s, "bob"))
            .await
            .unwrap();

        let found = registry.search_cards("alice", &token(&s, "alice")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content().unwrap().identity, "alice");

        let none = registry.search_cards("carol", &token(&s, "alice")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_token_verifier() {
        let s = setup();
        let verifier = JwtVerifier::new(
            s.app_key.public_key(),
            "app-key",
            Arc::new(CryptoTokenSigner::new(Arc::clone(&s.crypto))),
        );
        let registry = service(&s).with_token_verifier(verifier);

        let expired = s.generator.generate_token_at("alice", None, 10).unwrap();
        let err = registry
            .publish_card(&self_signed(&s, "alice", None), expired.as_str())
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ERROR_INVALID_TOKEN);

        let err = registry
            .search_cards("alice", "not-a-token")
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ERROR_INVALID_TOKEN);

        registry
            .publish_card(&self_signed(&s, "alice", None), &token(&s, "alice"))
            .await
            .unwrap();
    }
}
