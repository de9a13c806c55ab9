//! Test utilities for Sapwood

use crate::model::{Entity, EntityDetail, Location, Relation, RelationKind, Summary, SummaryScope, TokenUsage};
use crate::store::EntityStore;

/// A function entity named after its id, living in `file`.
pub fn function(id: &str, file: &str) -> Entity {
    Entity::new(id, id, EntityDetail::function(), Location::new(file, 1, 3))
        .with_content(format!("fn {}() {{}}", id))
}

/// Build a store of functions in `src/lib.rs` with `calls` relations of
/// the given weights.
pub fn weighted_store(ids: &[&str], edges: &[(&str, &str, f32)]) -> EntityStore {
    let mut store = EntityStore::new();
    for id in ids {
        store.add_entity(function(id, "src/lib.rs")).unwrap();
    }
    for (source, target, weight) in edges {
        store.add_relation(Relation::new(*source, *target, RelationKind::Calls).with_weight(*weight));
    }
    store
}

/// Like [`weighted_store`] with every weight at 1.0.
pub fn store_from_edges(ids: &[&str], edges: &[(&str, &str)]) -> EntityStore {
    let weighted: Vec<(&str, &str, f32)> = edges.iter().map(|&(s, t)| (s, t, 1.0)).collect();
    weighted_store(ids, &weighted)
}

/// A generated entity summary.
pub fn summary(id: &str, text: &str) -> Summary {
    Summary {
        entity_id: id.to_string(),
        scope: SummaryScope::Entity,
        summary: text.to_string(),
        description: text.to_string(),
        responsibilities: Vec::new(),
        usage: TokenUsage::new(1, 1),
        model_identity: "test-model".to_string(),
        content_hash: String::new(),
        fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_from_edges() {
        let store = store_from_edges(&["a", "b"], &[("a", "b"), ("a", "missing")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.relation_count(), 1);
        assert_eq!(store.entity("a").unwrap().content, "fn a() {}");
    }
}
