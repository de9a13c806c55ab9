//! Cycle resolution followed by level scheduling

use crate::cycles::{CycleReport, resolve_cycles};
use crate::levels::{LevelSchedule, schedule_levels};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};

/// Everything the orchestrator needs to know about processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPlan {
    pub schedule: LevelSchedule,
    pub cycles: CycleReport,
}

impl AnalysisPlan {
    /// Break cycles in `store`, then level it. The scheduler's forced batch
    /// stays armed even though the resolver ran first.
    pub fn build(store: &mut EntityStore) -> Self {
        let cycles = resolve_cycles(store);
        let schedule = schedule_levels(store);
        tracing::info!(
            "Planned {} entities into {} levels ({} edges cut)",
            schedule.entity_count(),
            schedule.len(),
            cycles.removed.len()
        );
        AnalysisPlan { schedule, cycles }
    }
}
