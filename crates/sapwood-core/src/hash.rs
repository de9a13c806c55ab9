//! Stable content hashing

use crate::model::Entity;
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of an entity's whitespace-normalized content, kind and name.
///
/// Reformatting (indentation, trailing spaces, blank lines) does not change
/// the hash; renaming or changing the kind does.
pub fn content_hash(entity: &Entity) -> String {
    let mut hasher = Sha256::new();
    for (i, token) in entity.content.split_whitespace().enumerate() {
        if i > 0 {
            hasher.update(b" ");
        }
        hasher.update(token.as_bytes());
    }
    hasher.update([0u8]);
    hasher.update(entity.kind().as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(entity.name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Combine several hashes into one, independent of input order.
pub fn combined_hash<'a>(hashes: impl IntoIterator<Item = &'a str>) -> String {
    let mut sorted: Vec<&str> = hashes.into_iter().collect();
    sorted.sort_unstable();
    let mut hasher = Sha256::new();
    for h in sorted {
        hasher.update(h.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Flat file name for an entity's cache artifact.
pub fn id_digest(id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    format!("{:x}", hasher.finalize())
}
