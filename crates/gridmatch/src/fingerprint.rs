//! Move fingerprints, exposed to callers as ETags.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Move;

/// Uppercase hex SHA-256 over a move's immutable fields.
///
/// Recomputable from a stored move alone; two fingerprints are equal only
/// when every hashed field is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a move.
    pub fn of(record: &Move) -> Self {
        let canonical = format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}",
            record.id(),
            record.match_id(),
            record.player_id(),
            record.mark(),
            record.x(),
            record.y(),
            record.sequence(),
            record.created_at().timestamp_micros(),
            record.mark_overridden(),
        );
        let digest = Sha256::digest(canonical.as_bytes());
        Self(hex::encode_upper(digest))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted form for an `ETag` header.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }
}
