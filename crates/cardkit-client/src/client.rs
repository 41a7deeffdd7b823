//! Card registry transport abstraction.
//!
//! Implementations own timeouts and cancellation; callers get exactly one
//! round trip per call and no retries.

use async_trait::async_trait;

use cardkit_core::RawSignedModel;

use crate::error::Result;

/// A card fetched by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCardResponse {
    pub model: RawSignedModel,
    /// The registry knows a newer card that supersedes this one.
    pub is_outdated: bool,
}

/// Transport to the card registry.
#[async_trait]
pub trait CardClient: Send + Sync {
    /// Submit a signed model. Returns the registry's version of it.
    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel>;

    /// Fetch a card by its hex id.
    async fn get_card(&self, card_id: &str, token: &str) -> Result<GetCardResponse>;

    /// Fetch every card published for `identity`.
    async fn search_cards(&self, identity: &str, token: &str) -> Result<Vec<RawSignedModel>>;
}
