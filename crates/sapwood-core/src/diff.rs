//! Change detection between the current store and the cache

use crate::aggregation::is_aggregate_id;
use crate::cache::{DependentsLookup, IncrementalCache};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How the current entities relate to what the cache last saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Present now, no cache entry.
    pub added: Vec<String>,
    /// Present now, cached under a different hash.
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    /// Cached, but no longer present. Module and architecture entries are
    /// never reported here; their hashes change with their members.
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Compare current `id -> hash` pairs against the cached ones.
    pub fn detect(current: &HashMap<String, String>, cached: &HashMap<String, String>) -> Self {
        let mut change = ChangeSet::default();
        let ids: BTreeSet<&String> = current.keys().collect();
        for id in ids {
            match cached.get(id) {
                None => change.added.push(id.clone()),
                Some(hash) if *hash != current[id] => change.modified.push(id.clone()),
                Some(_) => change.unchanged.push(id.clone()),
            }
        }
        change.removed = cached
            .keys()
            .filter(|id| !current.contains_key(*id) && !is_aggregate_id(id))
            .cloned()
            .collect();
        change.removed.sort();
        change
    }

    /// True when nothing was added, modified or removed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn changed_count(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Cascade-invalidate from every added, modified and removed entity.
    ///
    /// Dependents come from `lookup` (the current edges) and from the
    /// dependencies recorded on cache entries (the edges at write time), so
    /// consumers of a removed entity are dropped too. Returns the
    /// invalidated ids, sorted.
    pub fn apply(&self, cache: &IncrementalCache, lookup: &impl DependentsLookup) -> Vec<String> {
        let recorded = cache.recorded_dependents();
        let both = (lookup, &recorded);
        let mut invalidated = BTreeSet::new();
        for id in self.modified.iter().chain(&self.added).chain(&self.removed) {
            invalidated.extend(cache.invalidate_cascade(id, &both));
        }

        tracing::info!(
            "Changes: {} added, {} modified, {} removed; {} cache entries invalidated",
            self.added.len(),
            self.modified.len(),
            self.removed.len(),
            invalidated.len()
        );
        invalidated.into_iter().collect()
    }
}
