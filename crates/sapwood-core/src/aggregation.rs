//! Grouping of entity summaries into modules

use crate::hash::combined_hash;
use crate::model::EntityKind;
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Cache id prefix for module summaries.
pub const MODULE_PREFIX: &str = "module:";

/// Cache id of the architecture summary.
pub const ARCHITECTURE_ID: &str = "architecture";

/// True for ids that name an aggregate rather than an entity.
pub fn is_aggregate_id(id: &str) -> bool {
    id.starts_with(MODULE_PREFIX) || id == ARCHITECTURE_ID
}

/// Cache id for the module rooted at `dir`.
pub fn module_id(dir: &Path) -> String {
    format!("{}{}", MODULE_PREFIX, display_dir(dir))
}

fn display_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        dir.to_string_lossy().replace('\\', "/")
    }
}

/// Entities sharing a containing directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleGroup {
    pub id: String,
    pub dir: PathBuf,
    /// Sorted member entity ids.
    pub members: Vec<String>,
}

impl ModuleGroup {
    pub fn label(&self) -> String {
        display_dir(&self.dir)
    }

    /// Hash over one key per member plus the module id. The orchestrator
    /// keys on each member's summary text, which also moves when a member is
    /// regenerated because one of its dependencies changed.
    pub fn hash<'a>(&self, member_key: impl Fn(&str) -> Option<&'a str>) -> String {
        let mut keys: Vec<&str> = self.members.iter().filter_map(|id| member_key(id.as_str())).collect();
        keys.push(&self.id);
        combined_hash(keys)
    }
}

/// Group `ids` by the directory of their file, dropping groups smaller than
/// `min_entities`. Imports never count as members. Groups come out sorted by
/// directory.
pub fn group_by_directory<'a>(
    store: &EntityStore,
    ids: impl IntoIterator<Item = &'a str>,
    min_entities: usize,
) -> Vec<ModuleGroup> {
    let mut groups: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
    for id in ids {
        let Some(entity) = store.entity(id) else {
            continue;
        };
        if entity.kind() == EntityKind::Import {
            continue;
        }
        let dir = entity.file_path().parent().map(Path::to_path_buf).unwrap_or_default();
        groups.entry(dir).or_default().push(entity.id.clone());
    }

    let total = groups.len();
    let kept: Vec<ModuleGroup> = groups
        .into_iter()
        .filter(|(_, members)| members.len() >= min_entities)
        .map(|(dir, mut members)| {
            members.sort();
            members.dedup();
            ModuleGroup {
                id: module_id(&dir),
                dir,
                members,
            }
        })
        .collect();
    tracing::debug!("Grouped entities into {} modules ({} below threshold)", kept.len(), total - kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityDetail, Location};

    fn store() -> EntityStore {
        let mut store = EntityStore::new();
        let items = [
            ("src/a.rs::f", "src/a.rs", EntityDetail::function()),
            ("src/b.rs::g", "src/b.rs", EntityDetail::function()),
            ("src/b.rs::use", "src/b.rs", EntityDetail::Import { module: "std".into() }),
            ("src/util/c.rs::h", "src/util/c.rs", EntityDetail::function()),
            ("main.rs::main", "main.rs", EntityDetail::function()),
        ];
        for (id, file, detail) in items {
            store.add_entity(Entity::new(id, id, detail, Location::new(file, 1, 1))).unwrap();
        }
        store
    }

    #[test]
    fn test_groups_by_directory() {
        let store = store();
        let groups = group_by_directory(&store, store.ids(), 1);
        let ids: Vec<&str> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["module:.", "module:src", "module:src/util"]);
        assert_eq!(groups[1].members, vec!["src/a.rs::f", "src/b.rs::g"]);
        assert_eq!(groups[0].label(), ".");
    }

    #[test]
    fn test_small_groups_dropped() {
        let store = store();
        let groups = group_by_directory(&store, store.ids(), 2);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "module:src");
    }

    #[test]
    fn test_hash_tracks_members() {
        let store = store();
        let group = group_by_directory(&store, store.ids(), 2).remove(0);
        let before = group.hash(|id| if id == "src/a.rs::f" { Some("1") } else { Some("2") });
        let same = group.hash(|id| if id == "src/a.rs::f" { Some("1") } else { Some("2") });
        let after = group.hash(|id| if id == "src/a.rs::f" { Some("changed") } else { Some("2") });
        assert_eq!(before, same);
        assert_ne!(before, after);
    }

    #[test]
    fn test_aggregate_ids() {
        assert!(is_aggregate_id("module:src"));
        assert!(is_aggregate_id(ARCHITECTURE_ID));
        assert!(!is_aggregate_id("src/lib.rs::module"));
    }
}
