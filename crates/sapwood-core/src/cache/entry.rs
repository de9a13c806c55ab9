//! Cache index records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bump when the index or artifact layout changes. A mismatch on load
/// discards the whole index.
pub const FORMAT_VERSION: u32 = 2;

/// Validity record for one cached summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub entity_id: String,
    pub content_hash: String,
    pub produced_at: DateTime<Utc>,
    pub model_identity: String,
    pub format_version: u32,
    /// Ids the summary was built against, as they stood when it was written.
    /// Removals cascade over these edges since the current store no longer
    /// has them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl CacheEntry {
    pub fn new(entity_id: impl Into<String>, content_hash: impl Into<String>, model_identity: impl Into<String>) -> Self {
        CacheEntry {
            entity_id: entity_id.into(),
            content_hash: content_hash.into(),
            produced_at: Utc::now(),
            model_identity: model_identity.into(),
            format_version: FORMAT_VERSION,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// An entry is expired once its age reaches the TTL. No TTL means never.
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        ttl.is_some_and(|ttl| now.signed_duration_since(self.produced_at) >= ttl)
    }
}

/// The on-disk index: one file holding every entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheIndex {
    pub format_version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheIndex {
    pub fn empty() -> Self {
        CacheIndex {
            format_version: FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self::empty()
    }
}

/// Only the version field, read before trusting the rest of the file.
#[derive(Debug, Deserialize)]
pub(crate) struct IndexHeader {
    pub format_version: u32,
}
