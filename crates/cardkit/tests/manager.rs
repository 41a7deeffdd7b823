//! Card manager against the in-memory registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cardkit::auth::{CallbackJwtProvider, GeneratorJwtProvider};
use cardkit::client::memory::{InMemoryCardService, ERROR_IDENTITY_MISMATCH};
use cardkit::client::ErrorResponse;
use cardkit::core::extra_snapshot;
use cardkit::{
    CardCrypto, CardError, CardId, CardVerifier, ExtraFields, ExtraValue, HookError, RawSignature,
    RawSignedModel, SELF_SIGNER,
};
use cardkit_testkit::fixtures::{OWNER_IDENTITY, PARTNER_SIGNER};
use cardkit_testkit::TestFixture;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn registry(f: &TestFixture) -> Arc<InMemoryCardService> {
    Arc::new(f.registry())
}

#[tokio::test]
async fn publish_card_is_countersigned() {
    init_tracing();
    let f = TestFixture::new();
    let manager = f.manager(registry(&f));

    let card = manager.publish_card(&f.owner_params("alice")).await.unwrap();

    assert_eq!(card.identity, "alice");
    assert_eq!(card.public_key, f.owner.public_key());
    assert_eq!(card.version, "5.0");
    assert!(!card.is_outdated);
    assert!(card.signature_for(SELF_SIGNER).is_some());
    assert!(card.signature_for("virgil").is_some());
    assert_eq!(
        card.id,
        CardId::from_snapshot(f.crypto.as_ref(), &card.content_snapshot).unwrap()
    );
}

#[tokio::test]
async fn generate_raw_card_self_signs_alice() {
    let f = TestFixture::new();
    let manager = f.manager_with(
        registry(&f),
        Arc::new(f.token_provider()),
        f.trust_policy().require_authority_signature(false),
    );

    let model = manager.generate_raw_card(&f.owner_params("alice")).unwrap();
    assert_eq!(model.signatures().len(), 1);
    assert_eq!(model.signatures()[0].signer, "self");

    let card = manager.import_card(&model).unwrap();
    assert_eq!(card.identity, "alice");
}

#[tokio::test]
async fn token_identity_wins_over_params() {
    let f = TestFixture::new();
    let provider = f.token_provider_for("alice");
    let manager = f.manager_with(registry(&f), Arc::new(provider), f.trust_policy());

    let card = manager.publish_card(&f.owner_params("mallory")).await.unwrap();
    assert_eq!(card.identity, "alice");
}

#[tokio::test]
async fn response_identity_wins_over_request() {
    let f = TestFixture::new();
    let service = Arc::new(f.registry().rewrite_identity_from_token(true));
    let provider = f.token_provider_for("server-alice");
    // The registry rewrites the snapshot, so the owner's signature no longer covers it.
    let manager = f.manager_with(
        service,
        Arc::new(provider),
        f.trust_policy().require_self_signature(false),
    );

    let request = f.self_signed_model("alice", 1_700_000_000);
    let request_id = CardId::from_snapshot(f.crypto.as_ref(), request.content_snapshot()).unwrap();

    let card = manager.publish_raw_signed_model(request).await.unwrap();
    assert_eq!(card.identity, "server-alice");
    assert_ne!(card.id, request_id);
    assert_eq!(card.created_at, 1_700_000_000);
}

#[tokio::test]
async fn identity_mismatch_is_a_client_error() {
    let f = TestFixture::new();
    let provider = f.token_provider_for("bob");
    let manager = f.manager_with(registry(&f), Arc::new(provider), f.trust_policy());

    let err = manager
        .publish_raw_signed_model(f.self_signed_model("alice", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::Client(e) if e.code == ERROR_IDENTITY_MISMATCH));
}

#[tokio::test]
async fn service_error_is_returned_as_is() {
    let f = TestFixture::new();
    let service = f
        .registry()
        .fail_publish_with(ErrorResponse::new(20303, "card already exists"));
    let manager = f.manager(Arc::new(service));

    let err = manager.publish_card(&f.owner_params("alice")).await.unwrap_err();
    match err {
        CardError::Client(response) => {
            assert_eq!(response, ErrorResponse::new(20303, "card already exists"));
        }
        other => panic!("expected client error, got {other:?}"),
    }
}

#[tokio::test]
async fn untrusted_authority_fails_verification() {
    let f = TestFixture::new();
    let other = TestFixture::with_seed(0x70);
    // Verifier trusts a different authority key than the registry signs with.
    let manager = f.manager_with(
        registry(&f),
        Arc::new(f.token_provider()),
        other.trust_policy(),
    );

    let err = manager.publish_card(&f.owner_params("alice")).await.unwrap_err();
    assert!(matches!(err, CardError::Verification(_)));
}

#[tokio::test]
async fn sign_hook_adds_partner_signature() {
    let f = TestFixture::new();
    let partner_key = f.partner.private_key();
    let signer = f.signer();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let manager = f
        .manager_with(
            registry(&f),
            Arc::new(f.token_provider()),
            f.trust_policy().with_whitelist(f.partner_whitelist()),
        )
        .with_sign_hook(move |model: RawSignedModel| -> Result<RawSignedModel, HookError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(signer.sign(&model, PARTNER_SIGNER, &partner_key, None)?)
        });

    let card = manager.publish_card(&f.owner_params("alice")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(card.signature_for(PARTNER_SIGNER).is_some());
    assert_eq!(card.signatures.len(), 3);
}

#[tokio::test]
async fn missing_whitelisted_signer_fails_verification() {
    let f = TestFixture::new();
    let manager = f.manager_with(
        registry(&f),
        Arc::new(f.token_provider()),
        f.trust_policy().with_whitelist(f.partner_whitelist()),
    );

    let err = manager.publish_card(&f.owner_params("alice")).await.unwrap_err();
    assert!(matches!(err, CardError::Verification(_)));
}

#[tokio::test]
async fn sign_hook_errors_propagate() {
    let f = TestFixture::new();
    let service = registry(&f);
    let manager = f
        .manager(Arc::clone(&service))
        .with_sign_hook(|_: RawSignedModel| -> Result<RawSignedModel, HookError> {
            Err("hsm offline".into())
        });

    let err = manager.publish_card(&f.owner_params("alice")).await.unwrap_err();
    assert!(matches!(err, CardError::SignHook(msg) if msg == "hsm offline"));
    assert_eq!(service.card_count().await, 0);
}

#[tokio::test]
async fn extra_fields_survive_publish() {
    let f = TestFixture::new();
    let manager = f.manager(registry(&f));
    let mut extra = ExtraFields::new();
    extra.insert("device".into(), ExtraValue::from("phone"));
    extra.insert("primary".into(), ExtraValue::from(true));

    let card = manager
        .publish_card(&f.owner_params("alice").extra_fields(extra.clone()))
        .await
        .unwrap();
    let own = card.signature_for(SELF_SIGNER).unwrap();
    assert_eq!(own.extra_fields, Some(extra_snapshot(&extra)));
    assert!(card.signature_for("virgil").unwrap().extra_fields.is_none());
}

#[tokio::test]
async fn unsigned_card_is_rejected_by_registry() {
    let f = TestFixture::new();
    let manager = f.manager(registry(&f));

    let model = f.unsigned_model("alice", 1);
    let err = manager.publish_raw_signed_model(model).await.unwrap_err();
    assert!(matches!(err, CardError::Client(_)));
}

#[tokio::test]
async fn get_card_reports_outdated() {
    let f = TestFixture::new();
    let service = registry(&f);
    let provider = f.token_provider_for("alice");
    let manager = f.manager_with(Arc::clone(&service), Arc::new(provider), f.trust_policy());

    let first = manager.publish_card(&f.owner_params("alice")).await.unwrap();
    let fetched = manager.get_card(&first.id).await.unwrap();
    assert_eq!(fetched.id, first.id);
    assert!(!fetched.is_outdated);

    let second = manager
        .publish_card(&f.owner_params("alice").previous_card_id(first.id))
        .await
        .unwrap();
    assert_eq!(second.previous_card_id, Some(first.id));

    let fetched = manager.get_card(&first.id).await.unwrap();
    assert!(fetched.is_outdated);
    assert!(!manager.get_card(&second.id).await.unwrap().is_outdated);
}

#[tokio::test]
async fn get_card_with_plain_generator_provider() {
    let f = TestFixture::new();
    let provider = GeneratorJwtProvider::new(f.token_generator(), OWNER_IDENTITY);
    let manager = f.manager_with(registry(&f), Arc::new(provider), f.trust_policy());

    let card = manager.publish_card(&f.owner_params(OWNER_IDENTITY)).await.unwrap();
    let fetched = manager.get_card(&card.id).await.unwrap();
    assert_eq!(fetched, card);
}

#[tokio::test]
async fn get_unknown_card_is_a_client_error() {
    let f = TestFixture::new();
    let manager = f.manager(registry(&f));

    let err = manager
        .get_card(&CardId::from_bytes([0x5a; 32]))
        .await
        .unwrap_err();
    assert!(matches!(err, CardError::Client(_)));
}

#[tokio::test]
async fn search_returns_only_that_identity() {
    let f = TestFixture::new();
    let service = registry(&f);
    let manager = f.manager(Arc::clone(&service));
    let bob = f.manager_with(
        Arc::clone(&service),
        Arc::new(f.token_provider_for("bob")),
        f.trust_policy(),
    );

    manager.publish_card(&f.owner_params("alice")).await.unwrap();
    bob.publish_card(&f.owner_params("bob")).await.unwrap();

    let found = manager.search_cards("alice").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].identity, "alice");
    assert!(manager.search_cards("carol").await.unwrap().is_empty());
}

#[tokio::test]
async fn callback_provider_tokens_are_used() {
    let f = TestFixture::new();
    let generator = f.token_generator();
    let provider = CallbackJwtProvider::new(move |ctx| {
        let identity = ctx.identity.clone().unwrap_or_else(|| "anonymous".into());
        Ok(generator.generate_token(&identity, None)?.to_string())
    });
    let manager = f.manager_with(registry(&f), Arc::new(provider), f.trust_policy());

    let card = manager.publish_card(&f.owner_params("dave")).await.unwrap();
    assert_eq!(card.identity, "dave");
}

#[tokio::test]
async fn export_import_round_trip() {
    let f = TestFixture::new();
    let manager = f.manager(registry(&f));
    let card = manager.publish_card(&f.owner_params("alice")).await.unwrap();

    let raw = manager.export_card_as_raw_card(&card);
    assert_eq!(manager.import_card(&raw).unwrap(), card);

    let json = manager.export_card_as_json(&card).unwrap();
    assert_eq!(manager.import_card_from_json(&json).unwrap(), card);

    let encoded = manager.export_card_as_string(&card).unwrap();
    assert_eq!(manager.import_card_from_string(&encoded).unwrap(), card);
}

#[tokio::test]
async fn import_checks_trust_policy() {
    let f = TestFixture::new();
    let manager = f.manager(registry(&f));

    // Self-signed only: no authority signature.
    let err = manager
        .import_card(&f.self_signed_model("alice", 1))
        .unwrap_err();
    assert!(matches!(err, CardError::Verification(_)));

    let err = manager.import_card_from_string("%%%").unwrap_err();
    assert!(matches!(err, CardError::Core(_)));
}

#[tokio::test]
async fn import_keeps_cosigner_snapshot_it_cannot_type() {
    let f = TestFixture::new();
    let manager = f.manager_with(
        registry(&f),
        Arc::new(f.token_provider()),
        f.trust_policy().require_authority_signature(false),
    );

    let own = f.self_signed_model("alice", 1);
    let snapshot = br#"{"ratio":1.5}"#.to_vec();
    let payload = [own.content_snapshot(), snapshot.as_slice()].concat();
    let signature = f
        .crypto
        .generate_signature(&payload, &f.partner.private_key())
        .unwrap();
    let model = own.with_signature(RawSignature {
        signer: PARTNER_SIGNER.into(),
        signature,
        snapshot: snapshot.clone(),
    });

    let card = manager.import_card(&model).unwrap();
    let partner = card.signature_for(PARTNER_SIGNER).unwrap();
    assert_eq!(partner.snapshot, snapshot);
    assert_eq!(
        partner.extra_fields.as_ref().unwrap()["ratio"],
        serde_json::json!(1.5)
    );
    assert_eq!(manager.export_card_as_raw_card(&card), model);
}

#[tokio::test]
async fn verifier_agrees_with_manager() {
    let f = TestFixture::new();
    let manager = f.manager(registry(&f));
    let card = manager.publish_card(&f.owner_params("alice")).await.unwrap();

    assert!(f.verifier(f.trust_policy()).verify_card(&card));
    assert!(!f
        .verifier(f.trust_policy().with_whitelist(f.partner_whitelist()))
        .verify_card(&card));
}
