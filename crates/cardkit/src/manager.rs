//! The card manager: generate, publish, fetch and verify cards.
//!
//! Every network call runs at most one token request and one registry round
//! trip, then verifies what came back before handing it out.

use std::sync::Arc;

use cardkit_auth::{AccessToken, AccessTokenProvider, TokenContext};
use cardkit_client::CardClient;
use cardkit_core::{
    canonical_snapshot_bytes, now_secs, Card, CardCrypto, CardId, CardVerifier,
    ContentSnapshot, ExtraFields, ModelSigner, PrivateKey, PublicKey, RawSignedModel,
};

use crate::config::CardKitConfig;
use crate::error::{CardError, Result};
use crate::hook::SignHook;

/// Inputs for a new card.
#[derive(Debug, Clone)]
pub struct CardParams {
    pub identity: String,
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
    pub extra_fields: Option<ExtraFields>,
    pub previous_card_id: Option<CardId>,
}

impl CardParams {
    pub fn new(identity: impl Into<String>, public_key: PublicKey, private_key: PrivateKey) -> Self {
        Self {
            identity: identity.into(),
            public_key,
            private_key,
            extra_fields: None,
            previous_card_id: None,
        }
    }

    /// Extra fields covered by the owner's self signature.
    pub fn extra_fields(mut self, fields: ExtraFields) -> Self {
        self.extra_fields = Some(fields);
        self
    }

    /// The card this one replaces.
    pub fn previous_card_id(mut self, id: CardId) -> Self {
        self.previous_card_id = Some(id);
        self
    }
}

/// Issues and consumes cards against a registry.
pub struct CardManager {
    crypto: Arc<dyn CardCrypto>,
    signer: ModelSigner,
    token_provider: Arc<dyn AccessTokenProvider>,
    verifier: Arc<dyn CardVerifier>,
    client: Arc<dyn CardClient>,
    sign_hook: Option<Arc<dyn SignHook>>,
}

impl CardManager {
    pub fn new(
        crypto: Arc<dyn CardCrypto>,
        token_provider: Arc<dyn AccessTokenProvider>,
        verifier: Arc<dyn CardVerifier>,
        client: Arc<dyn CardClient>,
    ) -> Self {
        Self {
            signer: ModelSigner::new(Arc::clone(&crypto)),
            crypto,
            token_provider,
            verifier,
            client,
            sign_hook: None,
        }
    }

    /// Build a manager talking HTTP to the configured registry.
    pub fn from_config(
        config: &CardKitConfig,
        crypto: Arc<dyn CardCrypto>,
        token_provider: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self> {
        let verifier = config.verifier.build(Arc::clone(&crypto))?;
        let client = config.client.build();
        Ok(Self::new(
            crypto,
            token_provider,
            Arc::new(verifier),
            Arc::new(client),
        ))
    }

    /// Run `hook` on every model right before it is submitted.
    pub fn with_sign_hook(mut self, hook: impl SignHook + 'static) -> Self {
        self.sign_hook = Some(Arc::new(hook));
        self
    }

    pub fn crypto(&self) -> &dyn CardCrypto {
        self.crypto.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generation
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a card envelope and self-sign it.
    ///
    /// If self-signing fails the envelope is returned unsigned; check
    /// `signature_for(SELF_SIGNER)` when that matters.
    pub fn generate_raw_card(&self, params: &CardParams) -> Result<RawSignedModel> {
        self.build_raw_card(&params.identity, params)
    }

    fn build_raw_card(&self, identity: &str, params: &CardParams) -> Result<RawSignedModel> {
        let public_key = self.crypto.export_public_key(&params.public_key)?;
        let content = ContentSnapshot::new(identity, public_key, now_secs())
            .previous_card_id(params.previous_card_id);
        let model = RawSignedModel::unsigned(canonical_snapshot_bytes(&content)?);

        match self
            .signer
            .self_sign(&model, &params.private_key, params.extra_fields.as_ref())
        {
            Ok(signed) => Ok(signed),
            Err(err) => {
                tracing::warn!(identity, error = %err, "self signing failed; card left unsigned");
                Ok(model)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publishing
    // ─────────────────────────────────────────────────────────────────────────

    /// Generate and publish a card.
    ///
    /// The card is issued for the identity in the access token, which may
    /// differ from `params.identity`.
    pub async fn publish_card(&self, params: &CardParams) -> Result<Card> {
        let token = self
            .token_provider
            .get_token(&TokenContext::publish(params.identity.as_str()))
            .await?;
        let model = self.build_raw_card(token.identity(), params)?;
        self.publish_with_token(model, &*token).await
    }

    /// Publish an envelope built elsewhere, e.g. by [`generate_raw_card`].
    ///
    /// [`generate_raw_card`]: CardManager::generate_raw_card
    pub async fn publish_raw_signed_model(&self, model: RawSignedModel) -> Result<Card> {
        let content = model.content()?;
        let token = self
            .token_provider
            .get_token(&TokenContext::publish(content.identity))
            .await?;
        self.publish_with_token(model, &*token).await
    }

    async fn publish_with_token(
        &self,
        model: RawSignedModel,
        token: &dyn AccessToken,
    ) -> Result<Card> {
        let model = match &self.sign_hook {
            Some(hook) => hook.apply(model).map_err(|e| {
                tracing::warn!(error = %e, "sign hook failed; card not submitted");
                CardError::SignHook(e.to_string())
            })?,
            None => model,
        };

        let response = self.client.publish_card(&model, token.as_str()).await?;
        let card = Card::parse(self.crypto.as_ref(), &response)?;
        self.verify(&card)?;

        tracing::info!(card_id = %card.id, identity = %card.identity, "card published");
        Ok(card)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a card by id.
    pub async fn get_card(&self, card_id: &CardId) -> Result<Card> {
        let token = self.token_provider.get_token(&TokenContext::get()).await?;
        let response = self
            .client
            .get_card(&card_id.to_hex(), token.as_str())
            .await?;

        let mut card = Card::parse(self.crypto.as_ref(), &response.model)?;
        if card.id != *card_id {
            return Err(CardError::Verification(format!(
                "asked for card {card_id}, registry returned {}",
                card.id
            )));
        }
        card.is_outdated = response.is_outdated;
        self.verify(&card)?;
        Ok(card)
    }

    /// Fetch every card published for `identity`.
    pub async fn search_cards(&self, identity: &str) -> Result<Vec<Card>> {
        let token = self
            .token_provider
            .get_token(&TokenContext::search(identity))
            .await?;
        let models = self.client.search_cards(identity, token.as_str()).await?;
        tracing::debug!(identity, found = models.len(), "search returned");

        models.iter().map(|model| self.import_card(model)).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Import / export
    // ─────────────────────────────────────────────────────────────────────────

    /// Materialize and verify a card received out of band.
    pub fn import_card(&self, model: &RawSignedModel) -> Result<Card> {
        let card = Card::parse(self.crypto.as_ref(), model)?;
        self.verify(&card)?;
        Ok(card)
    }

    pub fn import_card_from_json(&self, json: &str) -> Result<Card> {
        self.import_card(&RawSignedModel::from_json(json)?)
    }

    pub fn import_card_from_string(&self, encoded: &str) -> Result<Card> {
        self.import_card(&RawSignedModel::from_base64_string(encoded)?)
    }

    pub fn export_card_as_raw_card(&self, card: &Card) -> RawSignedModel {
        card.to_raw_signed_model()
    }

    pub fn export_card_as_json(&self, card: &Card) -> Result<String> {
        Ok(card.to_raw_signed_model().to_json()?)
    }

    pub fn export_card_as_string(&self, card: &Card) -> Result<String> {
        Ok(card.to_raw_signed_model().to_base64_string()?)
    }

    fn verify(&self, card: &Card) -> Result<()> {
        if self.verifier.verify_card(card) {
            Ok(())
        } else {
            Err(CardError::Verification(format!(
                "card {} does not satisfy the trust policy",
                card.id
            )))
        }
    }
}

impl std::fmt::Debug for CardManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardManager")
            .field("sign_hook", &self.sign_hook.is_some())
            .finish_non_exhaustive()
    }
}
