//! Golden test vectors for card snapshots.
//!
//! Snapshot bytes, card ids and self signatures are fixed here so any
//! implementation can check it produces byte-identical cards.

use cardkit_core::{
    canonical_snapshot_bytes, CardCrypto, CardId, ContentSnapshot, Ed25519CardCrypto, KeyPair,
};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    pub name: &'static str,
    /// Ed25519 seed of the card owner.
    pub seed: [u8; 32],
    pub identity: &'static str,
    pub created_at: i64,
    /// Hex card id the new card replaces.
    pub previous_card_id: Option<&'static str>,
    /// Raw owner public key (hex).
    pub expected_public_key: &'static str,
    /// Canonical content snapshot.
    pub expected_snapshot: &'static str,
    /// Card id (hex).
    pub expected_card_id: &'static str,
    /// Self signature with no extra fields (hex).
    pub expected_self_signature: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "alice",
            seed: [0x42; 32],
            identity: "alice",
            created_at: 1_700_000_000,
            previous_card_id: None,
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_snapshot: r#"{"identity":"alice","public_key":"MCowBQYDK2VwAyEAIVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=","version":"5.0","created_at":1700000000}"#,
            expected_card_id: "c4637444082660468c96c867eb1eef350068f5bd16d7fd0cc720a424ddba2d12",
            expected_self_signature: "41cf4fd7aa10752bfcdb1e1ccc36a9d8b4ab752b7602ffa343b7652e828f1bcceb932f1ee9e87331661800dd455a07cf68fe825c55114d6b4668d1241e08da09",
        },
        GoldenVector {
            name: "email identity at epoch",
            seed: [0x00; 32],
            identity: "bob@example.com",
            created_at: 0,
            previous_card_id: None,
            expected_public_key: "3b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
            expected_snapshot: r#"{"identity":"bob@example.com","public_key":"MCowBQYDK2VwAyEAO2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik=","version":"5.0","created_at":0}"#,
            expected_card_id: "d314c72bd64a03a91a3cc44eff91f6c6d0287faf0521cc575e0da401246093a0",
            expected_self_signature: "ffe7b40484cbd5cfde9d727910194bbc84a3e10d069858fd806a1b7ecfa7e75123f589ca87887c7f94c3b44067d6db28cfc9895cb05b8b30f50448f677f2a20d",
        },
        GoldenVector {
            name: "alice replacing a card",
            seed: [0x42; 32],
            identity: "alice",
            created_at: 1_700_000_600,
            previous_card_id: Some("abababababababababababababababababababababababababababababababab"),
            expected_public_key: "2152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_snapshot: r#"{"identity":"alice","public_key":"MCowBQYDK2VwAyEAIVL40Zt5HSRFMkLhXy6rbLfP+ntqXtMAl5YOBpiB2xI=","version":"5.0","created_at":1700000600,"previous_card_id":"abababababababababababababababababababababababababababababababab"}"#,
            expected_card_id: "d7e9432dff842b7fe3b6e7ee85907aabca9fe82dbb093c083f7d7f80760c1bde",
            expected_self_signature: "ca08d6e838396ec439f6eb4b96195cc0f2a0f0e02846395f179d450b67d3073a45bd10550e65a7befc1aee864970bcd4304ae927ea92fea9fc88828bc12d4f0d",
        },
    ]
}

/// What an implementation produced for a vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorOutput {
    pub public_key: String,
    pub snapshot: String,
    pub card_id: String,
    pub self_signature: String,
}

/// Build the snapshot, id and self signature described by `vector`.
pub fn generate_from_vector(vector: &GoldenVector) -> VectorOutput {
    let crypto = Ed25519CardCrypto::new();
    let owner = KeyPair::from_seed(&vector.seed);

    let exported = crypto
        .export_public_key(&owner.public_key())
        .expect("vector key exports");
    let previous = vector
        .previous_card_id
        .map(|hex| CardId::from_hex(hex).expect("vector card id is hex"));
    let content = ContentSnapshot::new(vector.identity, exported, vector.created_at)
        .previous_card_id(previous);

    let snapshot = canonical_snapshot_bytes(&content).expect("vector snapshot encodes");
    let card_id = CardId::from_snapshot(&crypto, &snapshot).expect("sha-512 is 64 bytes");
    let signature = crypto
        .generate_signature(&snapshot, &owner.private_key())
        .expect("vector key signs");

    VectorOutput {
        public_key: owner.public_key().to_hex(),
        snapshot: String::from_utf8_lossy(&snapshot).into_owned(),
        card_id: card_id.to_hex(),
        self_signature: hex::encode(signature),
    }
}

/// Check every vector. Returns `(name, matches, produced card id)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let out = generate_from_vector(v);
            let matches = out.public_key == v.expected_public_key
                && out.snapshot == v.expected_snapshot
                && out.card_id == v.expected_card_id
                && out.self_signature == v.expected_self_signature;
            (v.name.to_string(), matches, out.card_id)
        })
        .collect()
}
