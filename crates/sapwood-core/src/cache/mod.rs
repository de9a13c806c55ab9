//! Incremental summary cache
//!
//! A hit requires the entry's content hash, format version and (when
//! configured) model identity to match, and the entry to be younger than
//! the TTL. The summary artifact carries its own content hash and is checked
//! again on read.
//!
//! Mutations update the in-memory view immediately and write artifacts
//! straight away; the index is written by [`IncrementalCache::flush`]. The
//! orchestrator flushes once per level. Disk failures are logged and the
//! in-memory view stays authoritative for the rest of the run.

pub mod entry;
pub mod persist;

pub use entry::{CacheEntry, CacheIndex, FORMAT_VERSION};

use crate::model::Summary;
use crate::store::EntityStore;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Anything that can answer "who depends on this id?".
pub trait DependentsLookup {
    fn dependent_ids_of(&self, id: &str) -> Vec<String>;
}

impl DependentsLookup for EntityStore {
    fn dependent_ids_of(&self, id: &str) -> Vec<String> {
        self.dependents_of(id).into_iter().map(|(id, _)| id).collect()
    }
}

impl DependentsLookup for HashMap<String, Vec<String>> {
    fn dependent_ids_of(&self, id: &str) -> Vec<String> {
        self.get(id).cloned().unwrap_or_default()
    }
}

impl<T: DependentsLookup + ?Sized> DependentsLookup for &T {
    fn dependent_ids_of(&self, id: &str) -> Vec<String> {
        (**self).dependent_ids_of(id)
    }
}

/// Union of two lookups, first one's answers first, without repeats.
impl<A: DependentsLookup, B: DependentsLookup> DependentsLookup for (A, B) {
    fn dependent_ids_of(&self, id: &str) -> Vec<String> {
        let mut ids = self.0.dependent_ids_of(id);
        for other in self.1.dependent_ids_of(id) {
            if !ids.contains(&other) {
                ids.push(other);
            }
        }
        ids
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Entries older than this are misses. `None` disables expiry.
    pub ttl: Option<Duration>,
    /// When set, entries produced by another model are misses and new
    /// entries are stamped with this identity.
    pub model_identity: Option<String>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub by_model: BTreeMap<String, usize>,
    pub format_version: u32,
}

/// Persisted map from entity id to its last summary.
pub struct IncrementalCache {
    dir: Option<PathBuf>,
    options: CacheOptions,
    index: RwLock<CacheIndex>,
    artifacts: DashMap<String, Summary>,
    dirty: AtomicBool,
    flush_lock: Mutex<()>,
}

impl std::fmt::Debug for IncrementalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalCache")
            .field("dir", &self.dir)
            .field("entries", &self.len())
            .finish()
    }
}

impl IncrementalCache {
    /// Open (or start) a cache in `dir`. Never fails: an unreadable index
    /// starts empty.
    pub fn open(dir: impl Into<PathBuf>, options: CacheOptions) -> Self {
        let dir = dir.into();
        let index = persist::read_index(&dir);
        tracing::debug!("Opened cache at {} with {} entries", dir.display(), index.entries.len());
        Self::with_index(Some(dir), index, options)
    }

    /// A cache that never touches the filesystem.
    pub fn in_memory(options: CacheOptions) -> Self {
        Self::with_index(None, CacheIndex::empty(), options)
    }

    fn with_index(dir: Option<PathBuf>, index: CacheIndex, options: CacheOptions) -> Self {
        IncrementalCache {
            dir,
            options,
            index: RwLock::new(index),
            artifacts: DashMap::new(),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.index.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, entity_id: &str) -> Option<CacheEntry> {
        self.index.read().entries.get(entity_id).cloned()
    }

    /// Current content hash per cached id.
    pub fn entry_hashes(&self) -> HashMap<String, String> {
        self.index
            .read()
            .entries
            .iter()
            .map(|(id, e)| (id.clone(), e.content_hash.clone()))
            .collect()
    }

    /// Reverse of the recorded dependencies: id to the cached entries that
    /// were built against it.
    pub fn recorded_dependents(&self) -> HashMap<String, Vec<String>> {
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for entry in self.index.read().entries.values() {
            for dependency in &entry.dependencies {
                dependents
                    .entry(dependency.clone())
                    .or_default()
                    .push(entry.entity_id.clone());
            }
        }
        dependents
    }

    /// Cached summary for `entity_id`, if still valid for `current_hash`.
    pub fn lookup(&self, entity_id: &str, current_hash: &str) -> Option<Summary> {
        let entry = self.entry(entity_id)?;
        if entry.format_version != FORMAT_VERSION {
            tracing::debug!("Cache miss for {}: format {}", entity_id, entry.format_version);
            return None;
        }
        if entry.content_hash != current_hash {
            tracing::debug!("Cache miss for {}: content changed", entity_id);
            return None;
        }
        if entry.is_expired(self.options.ttl, Utc::now()) {
            tracing::debug!("Cache miss for {}: expired", entity_id);
            return None;
        }
        if let Some(model) = &self.options.model_identity {
            if entry.model_identity != *model {
                tracing::debug!("Cache miss for {}: produced by {}", entity_id, entry.model_identity);
                return None;
            }
        }
        let summary = self.load_artifact(entity_id)?;
        if summary.entity_id != entity_id || summary.content_hash != current_hash {
            tracing::debug!("Cache miss for {}: artifact does not match entry", entity_id);
            return None;
        }
        Some(summary)
    }

    /// Record a freshly produced summary under `content_hash`.
    pub fn store(&self, summary: &Summary, content_hash: &str) {
        self.store_with_dependencies(summary, content_hash, Vec::new());
    }

    /// Like [`store`](Self::store), remembering the ids the summary was
    /// built against.
    pub fn store_with_dependencies(&self, summary: &Summary, content_hash: &str, dependencies: Vec<String>) {
        let model_identity = self
            .options
            .model_identity
            .clone()
            .unwrap_or_else(|| summary.model_identity.clone());
        let mut artifact = summary.clone();
        artifact.content_hash = content_hash.to_string();

        if let Some(dir) = &self.dir {
            if let Err(e) = persist::write_artifact(dir, &artifact) {
                tracing::warn!("Failed to write cache artifact for {}: {}", artifact.entity_id, e);
            }
        }

        let entry =
            CacheEntry::new(artifact.entity_id.clone(), content_hash, model_identity).with_dependencies(dependencies);
        self.artifacts.insert(artifact.entity_id.clone(), artifact);
        self.index.write().entries.insert(entry.entity_id.clone(), entry);
        self.dirty.store(true, Ordering::Release);
    }

    /// Remove one entry and its artifact. Returns whether an entry existed.
    pub fn invalidate(&self, entity_id: &str) -> bool {
        let existed = self.index.write().entries.remove(entity_id).is_some();
        self.artifacts.remove(entity_id);
        if existed {
            self.dirty.store(true, Ordering::Release);
            if let Some(dir) = &self.dir {
                if let Err(e) = persist::remove_artifact(dir, entity_id) {
                    tracing::warn!("Failed to remove cache artifact for {}: {}", entity_id, e);
                }
            }
        }
        existed
    }

    /// Invalidate the direct dependents of `entity_id` (not the id itself,
    /// and not transitively). Returns the ids that had entries.
    pub fn invalidate_dependents(&self, entity_id: &str, lookup: &impl DependentsLookup) -> Vec<String> {
        let mut seen = HashSet::new();
        lookup
            .dependent_ids_of(entity_id)
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .filter(|id| self.invalidate(id))
            .collect()
    }

    /// Invalidate `entity_id` and everything that transitively depends on it.
    ///
    /// Walks the whole dependent closure with an explicit work list, so ids
    /// without an entry still propagate, and each id is visited once even
    /// on diamonds or cycles. Returns the ids that had entries.
    pub fn invalidate_cascade(&self, entity_id: &str, lookup: &impl DependentsLookup) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut work = vec![entity_id.to_string()];
        let mut invalidated = Vec::new();
        visited.insert(entity_id.to_string());

        while let Some(current) = work.pop() {
            for dependent in lookup.dependent_ids_of(&current) {
                if visited.insert(dependent.clone()) {
                    work.push(dependent);
                }
            }
            if self.invalidate(&current) {
                invalidated.push(current);
            }
        }

        if !invalidated.is_empty() {
            tracing::debug!("Cascade from {} invalidated {} entries", entity_id, invalidated.len());
        }
        invalidated
    }

    /// Drop every entry for which `keep` returns false. Returns the dropped ids.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let doomed: Vec<String> = self
            .index
            .read()
            .entries
            .keys()
            .filter(|id| !keep(id))
            .cloned()
            .collect();
        doomed.into_iter().filter(|id| self.invalidate(id)).collect()
    }

    /// Drop entries for entities that no longer exist.
    pub fn prune_missing<'a>(&self, known_ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let known: HashSet<&str> = known_ids.into_iter().collect();
        let pruned = self.retain(|id| known.contains(id));
        if !pruned.is_empty() {
            tracing::debug!("Pruned {} cache entries for removed entities", pruned.len());
        }
        pruned
    }

    /// Remove expired entries. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let ttl = self.options.ttl;
        let expired: HashSet<String> = self
            .index
            .read()
            .entries
            .values()
            .filter(|e| e.is_expired(ttl, now))
            .map(|e| e.entity_id.clone())
            .collect();
        self.retain(|id| !expired.contains(id)).len()
    }

    /// Drop everything, in memory and on disk.
    pub fn clear(&self) {
        *self.index.write() = CacheIndex::empty();
        self.artifacts.clear();
        self.dirty.store(false, Ordering::Release);
        if let Some(dir) = &self.dir {
            if let Err(e) = persist::clear_dir(dir) {
                tracing::warn!("Failed to clear cache directory {}: {}", dir.display(), e);
            }
        }
    }

    /// Persist the index if anything changed since the last flush.
    /// Returns false only when a write was attempted and failed.
    pub fn flush(&self) -> bool {
        let Some(dir) = &self.dir else {
            self.dirty.store(false, Ordering::Release);
            return true;
        };
        let _guard = self.flush_lock.lock();
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return true;
        }
        let snapshot = self.index.read().clone();
        match persist::write_index(dir, &snapshot) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist cache index: {}", e);
                self.dirty.store(true, Ordering::Release);
                false
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let index = self.index.read();
        let mut by_model = BTreeMap::new();
        for entry in index.entries.values() {
            *by_model.entry(entry.model_identity.clone()).or_insert(0) += 1;
        }
        CacheStats {
            total_entries: index.entries.len(),
            expired_entries: index
                .entries
                .values()
                .filter(|e| e.is_expired(self.options.ttl, now))
                .count(),
            by_model,
            format_version: index.format_version,
        }
    }

    fn load_artifact(&self, entity_id: &str) -> Option<Summary> {
        if let Some(summary) = self.artifacts.get(entity_id) {
            return Some(summary.clone());
        }
        let dir = self.dir.as_ref()?;
        match persist::read_artifact(dir, entity_id) {
            Ok(Some(summary)) => {
                self.artifacts.insert(entity_id.to_string(), summary.clone());
                Some(summary)
            }
            Ok(None) => {
                tracing::debug!("Cache entry for {} has no artifact", entity_id);
                None
            }
            Err(e) => {
                tracing::warn!("Unreadable cache artifact for {}: {}", entity_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
