//! Entity/relation store backed by petgraph::StableDiGraph
//!
//! Nodes are entities, edges are relations pointing from the dependent to
//! its dependency. Entities are never removed, so node indices stay valid
//! for the lifetime of the store; relations may be removed by the cycle
//! resolver.

use crate::error::{CoreError, CoreResult};
use crate::model::{Entity, EntityKind, Relation, RelationKind};
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Code entities and the directed relations between them.
pub struct EntityStore {
    inner: StableDiGraph<Entity, Relation>,
    ids: HashMap<String, NodeIndex>,
    by_file: HashMap<PathBuf, Vec<NodeIndex>>,
    by_kind: HashMap<EntityKind, Vec<NodeIndex>>,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity_count", &self.inner.node_count())
            .field("relation_count", &self.inner.edge_count())
            .finish()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        EntityStore {
            inner: StableDiGraph::new(),
            ids: HashMap::new(),
            by_file: HashMap::new(),
            by_kind: HashMap::new(),
        }
    }

    /// Add an entity. Fails if its id is already present.
    pub fn add_entity(&mut self, entity: Entity) -> CoreResult<()> {
        if self.ids.contains_key(&entity.id) {
            return Err(CoreError::DuplicateId(entity.id));
        }
        let id = entity.id.clone();
        let file = entity.location.file.clone();
        let kind = entity.kind();
        let idx = self.inner.add_node(entity);
        self.ids.insert(id, idx);
        self.by_file.entry(file).or_default().push(idx);
        self.by_kind.entry(kind).or_default().push(idx);
        Ok(())
    }

    /// Add a relation. Relations with an unknown endpoint are dropped and
    /// `false` is returned.
    pub fn add_relation(&mut self, relation: Relation) -> bool {
        let (Some(&source), Some(&target)) = (
            self.ids.get(&relation.source_id),
            self.ids.get(&relation.target_id),
        ) else {
            tracing::debug!(
                "Dropping {} relation {} -> {}: unknown endpoint",
                relation.kind.as_str(),
                relation.source_id,
                relation.target_id
            );
            return false;
        };
        self.inner.add_edge(source, target, relation);
        true
    }

    /// Get an entity by id.
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.ids.get(id).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Total number of entities.
    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Total number of relations.
    pub fn relation_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Iterate over all entity ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities().map(|e| e.id.as_str())
    }

    /// Iterate over all relations in insertion order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
    }

    /// What `id` depends on. Empty for unknown ids.
    pub fn dependencies_of(&self, id: &str) -> Vec<(String, RelationKind)> {
        self.neighbours(id, Direction::Outgoing)
            .map(|(other, relation)| (other.id.clone(), relation.kind))
            .collect()
    }

    /// What depends on `id`. Empty for unknown ids.
    pub fn dependents_of(&self, id: &str) -> Vec<(String, RelationKind)> {
        self.neighbours(id, Direction::Incoming)
            .map(|(other, relation)| (other.id.clone(), relation.kind))
            .collect()
    }

    /// Borrowing variant of [`dependencies_of`](Self::dependencies_of) that
    /// yields only target ids. May repeat an id when several relations exist.
    pub fn dependency_ids<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.neighbours(id, Direction::Outgoing)
            .map(|(other, _)| other.id.as_str())
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<&Entity> {
        self.collect_indices(self.by_kind.get(&kind))
    }

    pub fn entities_in_file(&self, path: &Path) -> Vec<&Entity> {
        self.collect_indices(self.by_file.get(path))
    }

    /// Remove the first relation `source_id -> target_id` of `kind`.
    pub fn remove_relation(&mut self, source_id: &str, target_id: &str, kind: RelationKind) -> bool {
        let (Some(&source), Some(&target)) = (self.ids.get(source_id), self.ids.get(target_id)) else {
            return false;
        };
        let edge = self
            .inner
            .edges_directed(source, Direction::Outgoing)
            .find(|e| e.target() == target && e.weight().kind == kind)
            .map(|e| e.id());
        edge.and_then(|e| self.inner.remove_edge(e)).is_some()
    }

    pub(crate) fn graph(&self) -> &StableDiGraph<Entity, Relation> {
        &self.inner
    }

    pub(crate) fn remove_edge(&mut self, edge: EdgeIndex) -> Option<Relation> {
        self.inner.remove_edge(edge)
    }

    fn neighbours<'a>(
        &'a self,
        id: &str,
        direction: Direction,
    ) -> impl Iterator<Item = (&'a Entity, &'a Relation)> + use<'a> {
        let idx = self.ids.get(id).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner.edges_directed(idx, direction).filter_map(move |edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                self.inner.node_weight(other).map(|e| (e, edge.weight()))
            })
        })
    }

    fn collect_indices(&self, indices: Option<&Vec<NodeIndex>>) -> Vec<&Entity> {
        indices
            .map(|v| v.iter().filter_map(|&idx| self.inner.node_weight(idx)).collect())
            .unwrap_or_default()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDetail, Location};

    fn function(id: &str, file: &str) -> Entity {
        Entity::new(id, id, EntityDetail::function(), Location::new(file, 1, 3))
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = EntityStore::new();
        store.add_entity(function("a", "src/a.rs")).unwrap();
        let err = store.add_entity(function("a", "src/b.rs")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId(id) if id == "a"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.entities_in_file(Path::new("src/b.rs")).len(), 0);
    }

    #[test]
    fn test_dangling_relation_dropped() {
        let mut store = EntityStore::new();
        store.add_entity(function("a", "src/a.rs")).unwrap();
        assert!(!store.add_relation(Relation::new("a", "missing", RelationKind::Calls)));
        assert!(!store.add_relation(Relation::new("missing", "a", RelationKind::Calls)));
        assert_eq!(store.relation_count(), 0);
    }

    #[test]
    fn test_adjacency_queries() {
        let mut store = EntityStore::new();
        store.add_entity(function("a", "src/a.rs")).unwrap();
        store.add_entity(function("b", "src/a.rs")).unwrap();
        assert!(store.add_relation(Relation::new("a", "b", RelationKind::Calls)));

        assert_eq!(store.dependencies_of("a"), vec![("b".to_string(), RelationKind::Calls)]);
        assert_eq!(store.dependents_of("b"), vec![("a".to_string(), RelationKind::Calls)]);
        assert!(store.dependencies_of("b").is_empty());
        assert!(store.dependencies_of("nope").is_empty());
        assert!(store.dependents_of("nope").is_empty());
        assert_eq!(store.entities_in_file(Path::new("src/a.rs")).len(), 2);
        assert_eq!(store.entities_of_kind(EntityKind::Function).len(), 2);
        assert!(store.entities_of_kind(EntityKind::Type).is_empty());
    }

    #[test]
    fn test_remove_relation() {
        let mut store = EntityStore::new();
        store.add_entity(function("a", "src/a.rs")).unwrap();
        store.add_entity(function("b", "src/a.rs")).unwrap();
        store.add_relation(Relation::new("a", "b", RelationKind::Calls));

        assert!(!store.remove_relation("a", "b", RelationKind::Imports));
        assert!(store.remove_relation("a", "b", RelationKind::Calls));
        assert!(!store.remove_relation("a", "b", RelationKind::Calls));
        assert_eq!(store.relation_count(), 0);
    }
}
