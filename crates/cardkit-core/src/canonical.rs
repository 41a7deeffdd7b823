//! Canonical encoding of snapshots and signed payloads.
//!
//! Signatures are computed over exact bytes, so these encodings must be
//! deterministic:
//! - content snapshot: compact JSON, fields in declaration order,
//!   `previous_card_id` omitted when absent
//! - extra fields: compact JSON, keys sorted; absent or empty fields encode
//!   to zero bytes
//! - signed payload: `content_snapshot || extra_snapshot`

use crate::error::{CoreError, Result};
use crate::snapshot::{ContentSnapshot, ExtraFields, ExtraSnapshot};

/// Encode a content snapshot to canonical bytes.
pub fn canonical_snapshot_bytes(snapshot: &ContentSnapshot) -> Result<Vec<u8>> {
    serde_json::to_vec(snapshot).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Decode canonical snapshot bytes.
pub fn parse_snapshot_bytes(bytes: &[u8]) -> Result<ContentSnapshot> {
    serde_json::from_slice(bytes)
        .map_err(|e| CoreError::DecodingError(format!("content snapshot: {e}")))
}

/// Encode a signer's extra fields. `None` and empty maps give an empty snapshot.
pub fn canonical_extra_bytes(fields: Option<&ExtraFields>) -> Result<Vec<u8>> {
    match fields {
        Some(fields) if !fields.is_empty() => {
            serde_json::to_vec(fields).map_err(|e| CoreError::EncodingError(e.to_string()))
        }
        _ => Ok(Vec::new()),
    }
}

/// Decode a signer's extra snapshot.
///
/// Empty bytes, or bytes that are not a JSON object, give `None`. The raw
/// snapshot is still what the signature covers, so this never fails.
pub fn parse_extra_bytes(bytes: &[u8]) -> Option<ExtraSnapshot> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(fields) => Some(fields),
        Err(e) => {
            tracing::debug!(error = %e, "extra snapshot is not a JSON object");
            None
        }
    }
}

/// Construct the signed payload from a content snapshot and an extra snapshot.
pub fn signed_payload(content_snapshot: &[u8], extra_snapshot: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(content_snapshot.len() + extra_snapshot.len());
    buf.extend_from_slice(content_snapshot);
    buf.extend_from_slice(extra_snapshot);
    buf
}
