//! Card content snapshots and signer extra fields.
//!
//! A content snapshot is the canonical record of a card's identity-bearing
//! fields. Once its bytes are signed they must never change: any edit
//! invalidates every signature over them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::CardId;

/// The card format version written into new snapshots.
pub const CARD_VERSION: &str = "5.0";

/// Canonical card content.
///
/// Field order here is the canonical field order of the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    /// The identity this card binds.
    pub identity: String,

    /// Exported public key bytes (base64 on the wire).
    #[serde(with = "crate::encoding::base64_bytes")]
    pub public_key: Vec<u8>,

    /// Card format version.
    pub version: String,

    /// Unix timestamp, seconds.
    pub created_at: i64,

    /// The card this one replaces, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_card_id: Option<CardId>,
}

impl ContentSnapshot {
    /// Create a snapshot at the current [`CARD_VERSION`].
    pub fn new(identity: impl Into<String>, public_key: Vec<u8>, created_at: i64) -> Self {
        Self {
            identity: identity.into(),
            public_key,
            version: CARD_VERSION.to_string(),
            created_at,
            previous_card_id: None,
        }
    }

    /// Set the card this snapshot supersedes.
    pub fn previous_card_id(mut self, id: Option<CardId>) -> Self {
        self.previous_card_id = id;
        self
    }
}

/// A JSON scalar allowed as an extra-field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl From<&str> for ExtraValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for ExtraValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for ExtraValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<ExtraValue> for Value {
    fn from(v: ExtraValue) -> Self {
        match v {
            ExtraValue::Bool(b) => Value::Bool(b),
            ExtraValue::Integer(n) => Value::from(n),
            ExtraValue::Text(s) => Value::String(s),
        }
    }
}

/// Extra data a signer binds into its own signature.
///
/// Ordered by key, so the encoded snapshot is deterministic.
pub type ExtraFields = BTreeMap<String, ExtraValue>;

/// Extra fields decoded from a received signature.
///
/// Other signers are not held to [`ExtraValue`]; any JSON value is kept.
pub type ExtraSnapshot = serde_json::Map<String, Value>;

/// The decoded form of fields this side would sign.
pub fn extra_snapshot(fields: &ExtraFields) -> ExtraSnapshot {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), Value::from(value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_snapshot_uses_current_version() {
        let snapshot = ContentSnapshot::new("alice", vec![1, 2, 3], 1_700_000_000);
        assert_eq!(snapshot.version, CARD_VERSION);
        assert!(snapshot.previous_card_id.is_none());
    }

    #[test]
    fn test_extra_value_untagged_json() {
        let mut fields = ExtraFields::new();
        fields.insert("device".into(), "laptop".into());
        fields.insert("slot".into(), 3i64.into());
        fields.insert("primary".into(), true.into());

        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"device":"laptop","primary":true,"slot":3}"#);

        let back: ExtraFields = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
    }

    #[test]
    fn test_extra_snapshot_widens_values() {
        let mut fields = ExtraFields::new();
        fields.insert("slot".into(), 3i64.into());
        fields.insert("name".into(), "a".into());

        let widened = extra_snapshot(&fields);
        assert_eq!(widened.get("slot"), Some(&Value::from(3)));
        assert_eq!(widened.get("name"), Some(&Value::from("a")));
    }

    #[test]
    fn test_extra_value_rejects_nested() {
        let parsed: Result<ExtraFields, _> = serde_json::from_str(r#"{"a":{"b":1}}"#);
        assert!(parsed.is_err());
    }
}
