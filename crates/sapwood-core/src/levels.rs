//! Partition entities into dependency-ordered processing levels

use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A batch of entities that can be processed in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingLevel {
    pub index: usize,
    /// Sorted for deterministic output; members are mutually unordered.
    pub entity_ids: Vec<String>,
    /// Set when leftover cycles forced the remaining entities into one batch.
    pub forced: bool,
}

impl ProcessingLevel {
    pub fn len(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }
}

/// Ordered levels whose union is every entity in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSchedule {
    levels: Vec<ProcessingLevel>,
}

impl LevelSchedule {
    pub fn levels(&self) -> &[ProcessingLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.levels.iter().map(ProcessingLevel::len).sum()
    }

    /// True when the safety net had to batch a residual cycle.
    pub fn has_forced_batch(&self) -> bool {
        self.levels.iter().any(|l| l.forced)
    }

    /// Map of entity id to level index.
    pub fn level_index(&self) -> HashMap<&str, usize> {
        self.levels
            .iter()
            .flat_map(|l| l.entity_ids.iter().map(move |id| (id.as_str(), l.index)))
            .collect()
    }

    /// Plain id lists, mostly for display and tests.
    pub fn as_id_lists(&self) -> Vec<Vec<&str>> {
        self.levels
            .iter()
            .map(|l| l.entity_ids.iter().map(String::as_str).collect())
            .collect()
    }
}

/// Compute processing levels over the store's current relations.
///
/// An entity joins the current level once none of its dependencies (other
/// than itself) remain unscheduled. If no entity qualifies while some are
/// left, those entities still sit on a cycle; they are emitted together as
/// one forced level and a warning is logged.
pub fn schedule_levels(store: &EntityStore) -> LevelSchedule {
    let mut remaining: BTreeSet<&str> = store.ids().collect();
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|&id| {
                store
                    .dependency_ids(id)
                    .all(|dep| dep == id || !remaining.contains(dep))
            })
            .collect();

        let (members, forced) = if ready.is_empty() {
            tracing::warn!(
                "{} entities remain on unresolved cycles; scheduling them as one unordered batch",
                remaining.len()
            );
            (remaining.iter().copied().collect::<Vec<_>>(), true)
        } else {
            (ready, false)
        };

        for id in &members {
            remaining.remove(id);
        }
        levels.push(ProcessingLevel {
            index: levels.len(),
            entity_ids: members.into_iter().map(str::to_string).collect(),
            forced,
        });
    }

    tracing::debug!("Scheduled {} entities into {} levels", store.len(), levels.len());
    LevelSchedule { levels }
}
