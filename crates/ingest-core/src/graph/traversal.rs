//! `DefinitionGraph`/`FileGraph`: directed graphs of "depends on" edges, and
//! the batched-generation traversal order the concurrency module's
//! `run_levels` consumes.
//!
//! An edge `(from, to)` means `from` depends on `to`. Reference cycles are
//! possible (mutual recursion, import cycles) so a generation is computed
//! over the graph's condensation: each strongly connected component becomes
//! one "group", scheduled together, per SPEC_FULL.md §9's "Reference
//! cycles" design note.

use std::collections::HashSet;

use petgraph::algo::condensation;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::model::Id;

/// One level of work: independent groups that can run concurrently. Each
/// group is a strongly connected component (usually a single id).
pub type Levels = Vec<Vec<Vec<Id>>>;

fn build_graph(node_ids: &[Id], edges: &[(Id, Id)]) -> (DiGraph<Id, ()>, Vec<NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut index_of = std::collections::HashMap::new();
    let mut indices = Vec::with_capacity(node_ids.len());

    for &id in node_ids {
        let idx = graph.add_node(id);
        index_of.insert(id, idx);
        indices.push(idx);
    }
    for &(from, to) in edges {
        if let (Some(&f), Some(&t)) = (index_of.get(&from), index_of.get(&to)) {
            if f != t {
                graph.add_edge(f, t, ());
            }
        }
    }

    (graph, indices)
}

fn compute_levels(graph: DiGraph<Id, ()>) -> Levels {
    let dag = condensation(graph, true);
    let mut remaining: HashSet<NodeIndex> = dag.node_indices().collect();
    let mut levels = Levels::new();

    while !remaining.is_empty() {
        let ready: Vec<NodeIndex> = remaining
            .iter()
            .copied()
            .filter(|&n| {
                dag.neighbors_directed(n, Direction::Outgoing)
                    .all(|m| !remaining.contains(&m))
            })
            .collect();

        if ready.is_empty() {
            // Condensation guarantees acyclicity; this would only trip on a
            // petgraph contract violation.
            break;
        }

        let groups: Vec<Vec<Id>> = ready.iter().map(|&n| dag[n].clone()).collect();
        levels.push(groups);
        for n in ready {
            remaining.remove(&n);
        }
    }

    levels
}

/// Removes edges implied by a longer path, so each node's direct
/// dependencies are only the ones nothing else already carries transitively.
/// `petgraph` has no public transitive-reduction algorithm, so this is a
/// straightforward reachability-based removal, fine at this graph's scale.
fn transitive_reduction(graph: &mut DiGraph<Id, ()>) {
    let nodes: Vec<NodeIndex> = graph.node_indices().collect();
    for &u in &nodes {
        let direct_targets: Vec<NodeIndex> =
            graph.neighbors_directed(u, Direction::Outgoing).collect();
        for &v in &direct_targets {
            let edge = graph.find_edge(u, v);
            let Some(edge) = edge else { continue };
            // Is v reachable from u via some other direct successor?
            let reachable_without_edge = direct_targets.iter().any(|&w| {
                w != v && is_reachable(graph, w, v)
            });
            if reachable_without_edge {
                graph.remove_edge(edge);
            }
        }
    }
}

fn is_reachable(graph: &DiGraph<Id, ()>, from: NodeIndex, to: NodeIndex) -> bool {
    let mut stack = vec![from];
    let mut visited = HashSet::new();
    while let Some(n) = stack.pop() {
        if n == to {
            return true;
        }
        if !visited.insert(n) {
            continue;
        }
        stack.extend(graph.neighbors_directed(n, Direction::Outgoing));
    }
    false
}

pub struct DefinitionGraph {
    graph: DiGraph<Id, ()>,
}

impl DefinitionGraph {
    pub fn new(definition_ids: &[Id], edges: &[(Id, Id)]) -> Self {
        let (graph, _) = build_graph(definition_ids, edges);
        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Drops redundant edges in place; pure bookkeeping, doesn't affect
    /// `levels()` (condensation ignores edge multiplicity) but keeps the
    /// stored `DefinitionDependency` rows minimal when callers choose to
    /// persist the reduced edge set.
    pub fn reduce(&mut self) {
        transitive_reduction(&mut self.graph);
    }

    pub fn edges(&self) -> Vec<(Id, Id)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((self.graph[a], self.graph[b]))
            })
            .collect()
    }

    /// Generations ready for `concurrency::run_levels`, leaves (no
    /// dependencies) first.
    pub fn levels(&self) -> Levels {
        compute_levels(self.graph.clone())
    }
}

pub struct FileGraph {
    graph: DiGraph<Id, ()>,
}

impl FileGraph {
    pub fn new(file_ids: &[Id], edges: &[(Id, Id)]) -> Self {
        let (graph, _) = build_graph(file_ids, edges);
        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn reduce(&mut self) {
        transitive_reduction(&mut self.graph);
    }

    pub fn levels(&self) -> Levels {
        compute_levels(self.graph.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_come_before_their_dependents() {
        // 1 depends on 2, 2 depends on 3: levels should be [[3], [2], [1]].
        let graph = DefinitionGraph::new(&[1, 2, 3], &[(1, 2), (2, 3)]);
        let levels = graph.levels();
        assert_eq!(levels, vec![vec![vec![3]], vec![vec![2]], vec![vec![1]]]);
    }

    #[test]
    fn mutually_dependent_nodes_form_one_group() {
        let graph = DefinitionGraph::new(&[1, 2], &[(1, 2), (2, 1)]);
        let levels = graph.levels();
        assert_eq!(levels.len(), 1);
        let mut group = levels[0][0].clone();
        group.sort();
        assert_eq!(group, vec![1, 2]);
    }

    #[test]
    fn independent_nodes_share_a_level() {
        let graph = DefinitionGraph::new(&[1, 2, 3], &[]);
        let levels = graph.levels();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].len(), 3);
    }

    #[test]
    fn transitive_reduction_drops_the_shortcut_edge() {
        // 1 -> 2 -> 3 and a redundant 1 -> 3.
        let mut graph = DefinitionGraph::new(&[1, 2, 3], &[(1, 2), (2, 3), (1, 3)]);
        assert_eq!(graph.edge_count(), 3);
        graph.reduce();
        assert_eq!(graph.edge_count(), 2);
        let mut edges = graph.edges();
        edges.sort();
        assert_eq!(edges, vec![(1, 2), (2, 3)]);
    }
}
