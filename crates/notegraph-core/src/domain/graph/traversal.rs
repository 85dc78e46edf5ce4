//! Graph traversal primitives
//!
//! An edge is traversable `source -> target`, and also `target -> source`
//! when it is bidirectional. Neighbour lists are built from edges in
//! canonical key order, so every traversal below is deterministic for a
//! given graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::edge::Edge;
use super::ids::NodeId;

/// Adjacency view over a set of nodes and edges
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    forward: BTreeMap<NodeId, Vec<NodeId>>,
    undirected: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Adjacency {
    /// Build an adjacency view; edges with unknown endpoints are ignored
    pub fn build<'a>(
        node_ids: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = &'a Edge>,
    ) -> Self {
        let mut adjacency = Self::default();
        for id in node_ids {
            adjacency.forward.entry(id).or_default();
            adjacency.undirected.entry(id).or_default();
        }

        for edge in edges {
            let (source, target) = (edge.source_id, edge.target_id);
            if !adjacency.contains(&source) || !adjacency.contains(&target) {
                continue;
            }
            push_unique(adjacency.forward.entry(source).or_default(), target);
            if edge.bidirectional {
                push_unique(adjacency.forward.entry(target).or_default(), source);
            }
            push_unique(adjacency.undirected.entry(source).or_default(), target);
            push_unique(adjacency.undirected.entry(target).or_default(), source);
        }

        adjacency
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.forward.contains_key(id)
    }

    /// Nodes reachable in one traversable hop
    pub fn neighbors(&self, id: &NodeId) -> &[NodeId] {
        self.forward.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.forward.keys()
    }

    /// Breadth-first shortest path (in edge count) from `start` to `end`
    ///
    /// The path is reconstructed on first discovery of `end`. Returns
    /// `[start]` when both ends are equal and `None` when either node is
    /// unknown or `end` is unreachable.
    pub fn shortest_path(&self, start: &NodeId, end: &NodeId) -> Option<Vec<NodeId>> {
        if !self.contains(start) || !self.contains(end) {
            return None;
        }
        if start == end {
            return Some(vec![*start]);
        }

        let mut parents: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut visited: BTreeSet<NodeId> = BTreeSet::from([*start]);
        let mut queue = VecDeque::from([*start]);

        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(&current) {
                if !visited.insert(*next) {
                    continue;
                }
                parents.insert(*next, current);
                if next == end {
                    return Some(reconstruct(&parents, start, end));
                }
                queue.push_back(*next);
            }
        }

        None
    }

    /// Breadth-first distances from `start`, limited to `max_depth` hops.
    /// The start node itself is not included.
    pub fn within_depth(&self, start: &NodeId, max_depth: usize) -> Vec<(NodeId, usize)> {
        let mut found = Vec::new();
        if max_depth == 0 || !self.contains(start) {
            return found;
        }

        let mut visited: BTreeSet<NodeId> = BTreeSet::from([*start]);
        let mut queue = VecDeque::from([(*start, 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            for next in self.neighbors(&current) {
                if visited.insert(*next) {
                    found.push((*next, depth + 1));
                    queue.push_back((*next, depth + 1));
                }
            }
        }

        found
    }

    /// Connected components, treating every edge as undirected.
    ///
    /// Components are discovered by depth-first search from each unvisited
    /// node in ascending ID order; an isolated node forms its own component.
    pub fn components(&self) -> Vec<Vec<NodeId>> {
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut components = Vec::new();

        for root in self.undirected.keys() {
            if visited.contains(root) {
                continue;
            }

            let mut component = Vec::new();
            let mut stack = vec![*root];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                component.push(current);
                if let Some(neighbors) = self.undirected.get(&current) {
                    stack.extend(neighbors.iter().rev().filter(|n| !visited.contains(*n)));
                }
            }
            components.push(component);
        }

        components
    }
}

fn push_unique(list: &mut Vec<NodeId>, id: NodeId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

fn reconstruct(parents: &BTreeMap<NodeId, NodeId>, start: &NodeId, end: &NodeId) -> Vec<NodeId> {
    let mut path = vec![*end];
    let mut current = *end;
    while current != *start {
        match parents.get(&current) {
            Some(parent) => {
                current = *parent;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::edge::{EdgeOptions, EdgeType};

    fn ids(n: usize) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = (0..n).map(|_| NodeId::new()).collect();
        ids.sort();
        ids
    }

    fn edge(a: NodeId, b: NodeId, bidirectional: bool) -> Edge {
        Edge::with_options(a, b, EdgeOptions::new(EdgeType::Normal).bidirectional(bidirectional))
            .unwrap()
    }

    #[test]
    fn test_shortest_path_prefers_fewer_hops() {
        let n = ids(4);
        let edges = vec![
            edge(n[0], n[1], false),
            edge(n[1], n[2], false),
            edge(n[2], n[3], false),
            edge(n[0], n[3], false),
        ];
        let adjacency = Adjacency::build(n.clone(), &edges);

        assert_eq!(adjacency.shortest_path(&n[0], &n[3]), Some(vec![n[0], n[3]]));
        assert_eq!(adjacency.shortest_path(&n[0], &n[0]), Some(vec![n[0]]));
        assert_eq!(adjacency.shortest_path(&n[3], &n[0]), None);
    }

    #[test]
    fn test_bidirectional_edges_traverse_both_ways() {
        let n = ids(2);
        let edges = vec![edge(n[0], n[1], true)];
        let adjacency = Adjacency::build(n.clone(), &edges);

        assert_eq!(adjacency.shortest_path(&n[1], &n[0]), Some(vec![n[1], n[0]]));
    }

    #[test]
    fn test_within_depth() {
        let n = ids(4);
        let edges = vec![
            edge(n[0], n[1], false),
            edge(n[1], n[2], false),
            edge(n[2], n[3], false),
        ];
        let adjacency = Adjacency::build(n.clone(), &edges);

        assert!(adjacency.within_depth(&n[0], 0).is_empty());
        assert_eq!(adjacency.within_depth(&n[0], 2), vec![(n[1], 1), (n[2], 2)]);
    }

    #[test]
    fn test_components_ignore_direction() {
        let n = ids(5);
        let edges = vec![edge(n[1], n[0], false), edge(n[2], n[1], false), edge(n[3], n[4], false)];
        let adjacency = Adjacency::build(n.clone(), &edges);

        let mut components: Vec<BTreeSet<NodeId>> = adjacency
            .components()
            .into_iter()
            .map(|c| c.into_iter().collect())
            .collect();
        components.sort_by_key(|c| std::cmp::Reverse(c.len()));

        assert_eq!(components.len(), 2);
        assert_eq!(components[0], BTreeSet::from([n[0], n[1], n[2]]));
        assert_eq!(components[1], BTreeSet::from([n[3], n[4]]));
    }

    #[test]
    fn test_edges_with_unknown_endpoints_ignored() {
        let n = ids(2);
        let stray = NodeId::new();
        let edges = vec![edge(n[0], stray, false)];
        let adjacency = Adjacency::build(n.clone(), &edges);

        assert!(adjacency.neighbors(&n[0]).is_empty());
        assert_eq!(adjacency.components().len(), 2);
    }
}
