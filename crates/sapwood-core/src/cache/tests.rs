use super::*;
use crate::model::{SummaryScope, TokenUsage};
use chrono::Duration;
use tempfile::TempDir;

fn summary(id: &str, text: &str) -> Summary {
    Summary {
        entity_id: id.to_string(),
        scope: SummaryScope::Entity,
        summary: text.to_string(),
        description: format!("{} in detail", text),
        responsibilities: vec!["one thing".to_string()],
        usage: TokenUsage::new(10, 5),
        model_identity: "test-model".to_string(),
        content_hash: String::new(),
        fallback: false,
    }
}

fn options(model: &str) -> CacheOptions {
    CacheOptions {
        ttl: None,
        model_identity: Some(model.to_string()),
    }
}

fn chain() -> HashMap<String, Vec<String>> {
    // C depends on B depends on A
    let mut dependents = HashMap::new();
    dependents.insert("A".to_string(), vec!["B".to_string()]);
    dependents.insert("B".to_string(), vec!["C".to_string()]);
    dependents
}

#[test]
fn test_hash_change_misses_then_restore_hits() {
    let cache = IncrementalCache::in_memory(CacheOptions::default());
    cache.store(&summary("e", "first"), "h1");
    assert_eq!(cache.lookup("e", "h1").map(|s| s.summary), Some("first".to_string()));
    assert!(cache.lookup("e", "h2").is_none());

    cache.store(&summary("e", "second"), "h2");
    let hit = cache.lookup("e", "h2").unwrap();
    assert_eq!(hit.summary, "second");
    assert_eq!(hit.content_hash, "h2");
    assert!(cache.lookup("e", "h1").is_none());
}

#[test]
fn test_unknown_id_misses() {
    let cache = IncrementalCache::in_memory(CacheOptions::default());
    assert!(cache.lookup("nope", "h").is_none());
}

#[test]
fn test_zero_ttl_expires_immediately() {
    let cache = IncrementalCache::in_memory(CacheOptions {
        ttl: Some(Duration::zero()),
        model_identity: None,
    });
    cache.store(&summary("e", "s"), "h1");
    assert!(cache.lookup("e", "h1").is_none());
    assert_eq!(cache.stats().expired_entries, 1);
    assert_eq!(cache.cleanup_expired(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_long_ttl_still_hits() {
    let cache = IncrementalCache::in_memory(CacheOptions {
        ttl: Some(Duration::hours(1)),
        model_identity: None,
    });
    cache.store(&summary("e", "s"), "h1");
    assert!(cache.lookup("e", "h1").is_some());
    assert_eq!(cache.cleanup_expired(), 0);
}

#[test]
fn test_model_change_misses() {
    let dir = TempDir::new().unwrap();
    let first = IncrementalCache::open(dir.path(), options("model-a"));
    first.store(&summary("e", "s"), "h1");
    assert!(first.flush());
    assert_eq!(first.entry("e").unwrap().model_identity, "model-a");

    let same = IncrementalCache::open(dir.path(), options("model-a"));
    assert!(same.lookup("e", "h1").is_some());

    let other = IncrementalCache::open(dir.path(), options("model-b"));
    assert!(other.lookup("e", "h1").is_none());
}

#[test]
fn test_unconfigured_model_stamps_summary_identity() {
    let cache = IncrementalCache::in_memory(CacheOptions::default());
    cache.store(&summary("e", "s"), "h1");
    assert_eq!(cache.entry("e").unwrap().model_identity, "test-model");
}

#[test]
fn test_cascade_is_transitive_and_idempotent() {
    let cache = IncrementalCache::in_memory(CacheOptions::default());
    for id in ["A", "B", "C"] {
        cache.store(&summary(id, id), "h");
    }

    let mut removed = cache.invalidate_cascade("A", &chain());
    removed.sort();
    assert_eq!(removed, vec!["A", "B", "C"]);
    assert!(cache.is_empty());
    assert!(cache.invalidate_cascade("A", &chain()).is_empty());
}

#[test]
fn test_cascade_walks_through_uncached_ids() {
    let cache = IncrementalCache::in_memory(CacheOptions::default());
    cache.store(&summary("A", "a"), "h");
    cache.store(&summary("C", "c"), "h");

    let mut removed = cache.invalidate_cascade("A", &chain());
    removed.sort();
    assert_eq!(removed, vec!["A", "C"]);
}

#[test]
fn test_cascade_terminates_on_cycle() {
    let cache = IncrementalCache::in_memory(CacheOptions::default());
    cache.store(&summary("X", "x"), "h");
    cache.store(&summary("Y", "y"), "h");
    let mut dependents = HashMap::new();
    dependents.insert("X".to_string(), vec!["Y".to_string()]);
    dependents.insert("Y".to_string(), vec!["X".to_string()]);

    assert_eq!(cache.invalidate_cascade("X", &dependents).len(), 2);
}

#[test]
fn test_invalidate_dependents_is_one_hop() {
    let cache = IncrementalCache::in_memory(CacheOptions::default());
    for id in ["A", "B", "C"] {
        cache.store(&summary(id, id), "h");
    }

    assert_eq!(cache.invalidate_dependents("A", &chain()), vec!["B"]);
    assert!(cache.entry("A").is_some());
    assert!(cache.entry("C").is_some());
}

#[test]
fn test_cascade_over_entity_store() {
    use crate::model::{Entity, EntityDetail, Location, Relation, RelationKind};

    let mut store = EntityStore::new();
    for id in ["a", "b", "c"] {
        store
            .add_entity(Entity::new(id, id, EntityDetail::function(), Location::new("src/lib.rs", 1, 1)))
            .unwrap();
    }
    store.add_relation(Relation::new("b", "a", RelationKind::Calls));
    store.add_relation(Relation::new("c", "b", RelationKind::Calls));

    let cache = IncrementalCache::in_memory(CacheOptions::default());
    for id in ["a", "b", "c"] {
        cache.store(&summary(id, id), "h");
    }
    assert_eq!(cache.invalidate_cascade("a", &store).len(), 3);
}

#[test]
fn test_persistence_round_trip() {
    let dir = TempDir::new().unwrap();
    {
        let cache = IncrementalCache::open(dir.path(), CacheOptions::default());
        cache.store(&summary("src/lib.rs::f", "does f"), "h1");
        assert!(cache.flush());
    }
    assert!(persist::index_path(dir.path()).exists());
    assert!(persist::artifact_path(dir.path(), "src/lib.rs::f").exists());

    let reopened = IncrementalCache::open(dir.path(), CacheOptions::default());
    assert_eq!(reopened.len(), 1);
    let hit = reopened.lookup("src/lib.rs::f", "h1").unwrap();
    assert_eq!(hit.summary, "does f");
    assert_eq!(hit.usage, TokenUsage::new(10, 5));
}

#[test]
fn test_unflushed_entries_are_not_persisted() {
    let dir = TempDir::new().unwrap();
    let cache = IncrementalCache::open(dir.path(), CacheOptions::default());
    cache.store(&summary("e", "s"), "h1");

    let reopened = IncrementalCache::open(dir.path(), CacheOptions::default());
    assert!(reopened.is_empty());
}

#[test]
fn test_format_mismatch_resets_index() {
    let dir = TempDir::new().unwrap();
    {
        let cache = IncrementalCache::open(dir.path(), CacheOptions::default());
        cache.store(&summary("e", "s"), "h1");
        cache.flush();
    }
    let path = persist::index_path(dir.path());
    let raw = std::fs::read_to_string(&path).unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    json["format_version"] = serde_json::json!(FORMAT_VERSION + 1);
    std::fs::write(&path, json.to_string()).unwrap();

    let reopened = IncrementalCache::open(dir.path(), CacheOptions::default());
    assert!(reopened.is_empty());
    assert!(reopened.lookup("e", "h1").is_none());
    assert_eq!(reopened.stats().format_version, FORMAT_VERSION);
}

#[test]
fn test_corrupt_index_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(persist::index_path(dir.path()), "{not json").unwrap();
    let cache = IncrementalCache::open(dir.path(), CacheOptions::default());
    assert!(cache.is_empty());
}

#[test]
fn test_missing_artifact_is_a_miss() {
    let dir = TempDir::new().unwrap();
    {
        let cache = IncrementalCache::open(dir.path(), CacheOptions::default());
        cache.store(&summary("e", "s"), "h1");
        cache.flush();
    }
    std::fs::remove_file(persist::artifact_path(dir.path(), "e")).unwrap();

    let reopened = IncrementalCache::open(dir.path(), CacheOptions::default());
    assert!(reopened.entry("e").is_some());
    assert!(reopened.lookup("e", "h1").is_none());
}

#[test]
fn test_prune_missing_and_stats() {
    let cache = IncrementalCache::in_memory(options("m"));
    for id in ["a", "b", "c"] {
        cache.store(&summary(id, id), "h");
    }
    assert_eq!(cache.prune_missing(["a", "c"]), vec!["b"]);

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.expired_entries, 0);
    assert_eq!(stats.by_model.get("m"), Some(&2));
}

#[test]
fn test_clear_removes_directory() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let cache = IncrementalCache::open(&cache_dir, CacheOptions::default());
    cache.store(&summary("e", "s"), "h1");
    cache.flush();
    assert!(cache_dir.exists());

    cache.clear();
    assert!(cache.is_empty());
    assert!(!cache_dir.exists());
}
