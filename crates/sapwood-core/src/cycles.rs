//! Cycle detection and breaking
//!
//! Strongly-connected components are found with Tarjan's algorithm. Inside
//! every component with two or more members the lightest edge is cut, one at
//! a time, until the component's induced subgraph is acyclic. Ties go to the
//! edge discovered first, where discovery walks members sorted by id and
//! each member's outgoing edges in insertion order.

use crate::model::RelationKind;
use crate::store::EntityStore;
use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::DiGraph;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An edge the resolver cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedEdge {
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationKind,
    pub weight: f32,
}

/// What the resolver did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Number of components with two or more members.
    pub cyclic_components: usize,
    pub removed: Vec<RemovedEdge>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct WorkingEdge {
    index: EdgeIndex,
    source: NodeIndex,
    target: NodeIndex,
    weight: f32,
}

/// Strongly-connected components with two or more members, as sorted id lists.
pub fn cyclic_components(store: &EntityStore) -> Vec<Vec<String>> {
    let graph = store.graph();
    let mut components: Vec<Vec<String>> = tarjan_scc(graph)
        .into_iter()
        .filter(|c| c.len() >= 2)
        .map(|c| {
            let mut ids: Vec<String> = c.iter().map(|&idx| graph[idx].id.clone()).collect();
            ids.sort();
            ids
        })
        .collect();
    components.sort();
    components
}

/// Make the store's dependency graph acyclic. Self-loops are left alone.
pub fn resolve_cycles(store: &mut EntityStore) -> CycleReport {
    let components = collect_component_edges(store);
    let mut report = CycleReport {
        cyclic_components: components.len(),
        removed: Vec::new(),
    };

    for (members, mut working) in components {
        while component_is_cyclic(&members, &working) {
            // min_by keeps the first of equal minima, which is the tie-break.
            let Some(pos) = working
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.weight.total_cmp(&b.weight))
                .map(|(i, _)| i)
            else {
                break;
            };
            let edge = working.remove(pos);
            if let Some(relation) = store.remove_edge(edge.index) {
                tracing::debug!(
                    "Cut {} edge {} -> {} (weight {})",
                    relation.kind.as_str(),
                    relation.source_id,
                    relation.target_id,
                    relation.weight
                );
                report.removed.push(RemovedEdge {
                    source_id: relation.source_id,
                    target_id: relation.target_id,
                    kind: relation.kind,
                    weight: relation.weight,
                });
            }
        }
    }

    if !report.is_empty() {
        tracing::info!(
            "Broke {} cyclic component(s) by removing {} edge(s)",
            report.cyclic_components,
            report.removed.len()
        );
    }
    report
}

/// For every multi-member SCC: its members and its internal edges in discovery order.
fn collect_component_edges(store: &EntityStore) -> Vec<(Vec<NodeIndex>, Vec<WorkingEdge>)> {
    let graph = store.graph();
    let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(graph)
        .into_iter()
        .filter(|c| c.len() >= 2)
        .collect();
    for members in &mut components {
        members.sort_by(|a, b| graph[*a].id.cmp(&graph[*b].id));
    }
    components.sort_by(|a, b| graph[a[0]].id.cmp(&graph[b[0]].id));

    components
        .into_iter()
        .map(|members| {
            let mut working = Vec::new();
            for &member in &members {
                let mut outgoing: Vec<WorkingEdge> = graph
                    .edges_directed(member, Direction::Outgoing)
                    .filter(|e| e.target() != member && members.contains(&e.target()))
                    .map(|e| WorkingEdge {
                        index: e.id(),
                        source: e.source(),
                        target: e.target(),
                        weight: e.weight().weight,
                    })
                    .collect();
                outgoing.sort_by_key(|e| e.index.index());
                working.extend(outgoing);
            }
            (members, working)
        })
        .collect()
}

fn component_is_cyclic(members: &[NodeIndex], edges: &[WorkingEdge]) -> bool {
    let mut local = DiGraph::<(), ()>::with_capacity(members.len(), edges.len());
    let positions: HashMap<NodeIndex, _> = members.iter().map(|&m| (m, local.add_node(()))).collect();
    for edge in edges {
        if let (Some(&s), Some(&t)) = (positions.get(&edge.source), positions.get(&edge.target)) {
            local.add_edge(s, t, ());
        }
    }
    is_cyclic_directed(&local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityDetail, Location, Relation};

    fn store_with(ids: &[&str], edges: &[(&str, &str, f32)]) -> EntityStore {
        let mut store = EntityStore::new();
        for id in ids {
            store
                .add_entity(Entity::new(*id, *id, EntityDetail::function(), Location::new("src/lib.rs", 1, 1)))
                .unwrap();
        }
        for (s, t, w) in edges {
            assert!(store.add_relation(Relation::new(*s, *t, RelationKind::Calls).with_weight(*w)));
        }
        store
    }

    #[test]
    fn test_acyclic_graph_untouched() {
        let mut store = store_with(&["a", "b", "c"], &[("a", "b", 1.0), ("b", "c", 1.0)]);
        let report = resolve_cycles(&mut store);
        assert!(report.is_empty());
        assert_eq!(report.cyclic_components, 0);
        assert_eq!(store.relation_count(), 2);
    }

    #[test]
    fn test_two_cycle_equal_weight_cuts_first_discovered() {
        let mut store = store_with(&["x", "y", "z"], &[("y", "x", 1.0), ("x", "y", 1.0)]);
        let report = resolve_cycles(&mut store);
        assert_eq!(report.removed.len(), 1);
        // Members are walked in id order, so x's outgoing edge is seen first.
        assert_eq!(report.removed[0].source_id, "x");
        assert_eq!(report.removed[0].target_id, "y");
        assert!(cyclic_components(&store).is_empty());
        assert_eq!(store.dependencies_of("y").len(), 1);
    }

    #[test]
    fn test_lightest_edge_is_cut() {
        let mut store = store_with(
            &["a", "b", "c"],
            &[("a", "b", 2.0), ("b", "c", 2.0), ("c", "a", 0.5)],
        );
        let report = resolve_cycles(&mut store);
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.removed[0].source_id, "c");
        assert_eq!(report.removed[0].target_id, "a");
    }

    #[test]
    fn test_nested_cycles_all_broken() {
        let mut store = store_with(
            &["a", "b", "c", "d"],
            &[
                ("a", "b", 1.0),
                ("b", "a", 3.0),
                ("b", "c", 1.0),
                ("c", "d", 1.0),
                ("d", "b", 1.0),
                ("c", "a", 2.0),
            ],
        );
        let report = resolve_cycles(&mut store);
        assert!(!report.is_empty());
        assert_eq!(report.cyclic_components, 1);
        assert!(cyclic_components(&store).is_empty());
    }

    #[test]
    fn test_self_loop_left_alone() {
        let mut store = store_with(&["a"], &[("a", "a", 1.0)]);
        let report = resolve_cycles(&mut store);
        assert!(report.is_empty());
        assert_eq!(store.relation_count(), 1);
    }
}
