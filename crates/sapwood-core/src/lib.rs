//! Sapwood Core: Entity store, cycle breaking, level scheduling and incremental cache

pub mod aggregation;
pub mod cache;
pub mod cycles;
pub mod diff;
pub mod error;
pub mod hash;
pub mod levels;
pub mod model;
pub mod parser;
pub mod plan;
pub mod store;
pub mod symbols;
pub mod workspace;


#[cfg(test)]
pub mod test_utils;

pub use aggregation::{ARCHITECTURE_ID, MODULE_PREFIX, ModuleGroup, group_by_directory, is_aggregate_id, module_id};
pub use cache::{CacheEntry, CacheOptions, CacheStats, DependentsLookup, FORMAT_VERSION, IncrementalCache};
pub use cycles::{CycleReport, RemovedEdge, cyclic_components, resolve_cycles};
pub use diff::ChangeSet;
pub use error::{CoreError, CoreResult};
pub use hash::{combined_hash, content_hash};
pub use levels::{LevelSchedule, ProcessingLevel, schedule_levels};
pub use model::{
    Entity, EntityDetail, EntityKind, FALLBACK_MODEL, Language, Location, Relation, RelationKind, Summary,
    SummaryScope, TokenUsage, TypeKind,
};
pub use parser::{ParsedFile, RawReference, SourceParser};
pub use plan::AnalysisPlan;
pub use store::EntityStore;
pub use symbols::{ResolutionStats, SymbolTable};
pub use workspace::{WorkspaceType, detect_workspace, project_name};
