//! Proptest generators for property-based testing.

use proptest::prelude::*;

use cardkit_core::{
    canonical_snapshot_bytes, CardCrypto, CardId, ContentSnapshot, ExtraFields, ExtraValue,
    KeyPair, ModelSigner, RawSignedModel,
};

/// Generate a random key pair.
pub fn key_pair() -> impl Strategy<Value = KeyPair> {
    any::<[u8; 32]>().prop_map(|seed| KeyPair::from_seed(&seed))
}

/// Generate a random CardId.
pub fn card_id() -> impl Strategy<Value = CardId> {
    any::<[u8; 32]>().prop_map(CardId::from_bytes)
}

/// Identity strings, including ones JSON has to escape.
pub fn identity() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9._-]{0,23}@[a-z]{1,10}\\.[a-z]{2,3}",
        "[a-zA-Z0-9 \"\\\\/]{1,32}",
        "\\PC{1,16}",
    ]
}

/// Unix seconds between 1970 and 2100.
pub fn created_at() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800i64
}

pub fn extra_value() -> impl Strategy<Value = ExtraValue> {
    prop_oneof![
        any::<bool>().prop_map(ExtraValue::Bool),
        any::<i64>().prop_map(ExtraValue::Integer),
        "[ -~]{0,24}".prop_map(ExtraValue::Text),
    ]
}

/// Up to four extra fields.
pub fn extra_fields() -> impl Strategy<Value = ExtraFields> {
    prop::collection::btree_map("[a-z_]{1,12}", extra_value(), 0..4)
}

/// Everything needed to build a self-signed card.
#[derive(Debug, Clone)]
pub struct CardSeed {
    pub key_pair: KeyPair,
    pub identity: String,
    pub created_at: i64,
    pub previous_card_id: Option<CardId>,
    pub extra_fields: ExtraFields,
}

impl Arbitrary for CardSeed {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            key_pair(),
            identity(),
            created_at(),
            proptest::option::of(card_id()),
            extra_fields(),
        )
            .prop_map(
                |(key_pair, identity, created_at, previous_card_id, extra_fields)| CardSeed {
                    key_pair,
                    identity,
                    created_at,
                    previous_card_id,
                    extra_fields,
                },
            )
            .boxed()
    }
}

impl CardSeed {
    pub fn snapshot(&self, crypto: &dyn CardCrypto) -> ContentSnapshot {
        let exported = crypto
            .export_public_key(&self.key_pair.public_key())
            .expect("generated keys export");
        ContentSnapshot::new(self.identity.clone(), exported, self.created_at)
            .previous_card_id(self.previous_card_id)
    }

    pub fn unsigned_model(&self, crypto: &dyn CardCrypto) -> RawSignedModel {
        let bytes = canonical_snapshot_bytes(&self.snapshot(crypto)).expect("snapshot encodes");
        RawSignedModel::unsigned(bytes)
    }

    /// Self-signed, with this seed's extra fields bound into the signature.
    pub fn self_signed_model(&self, signer: &ModelSigner, crypto: &dyn CardCrypto) -> RawSignedModel {
        signer
            .self_sign(
                &self.unsigned_model(crypto),
                &self.key_pair.private_key(),
                Some(&self.extra_fields),
            )
            .expect("generated keys sign")
    }
}
