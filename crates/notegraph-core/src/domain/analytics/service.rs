//! Graph analytics service
//!
//! Degree, neighbourhood, orphan and centrality queries plus summary
//! statistics, all computed from the aggregate's adjacency.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::info;

use crate::domain::graph::{Graph, NodeId};
use crate::error::{Error, Result};

/// In- and out-degree of a note
///
/// A bidirectional edge counts in both directions on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NodeDegree {
    pub in_degree: usize,
    pub out_degree: usize,
}

impl NodeDegree {
    pub fn total(&self) -> usize {
        self.in_degree + self.out_degree
    }
}

/// Summary figures for a graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    /// Edges over possible directed pairs
    pub density: f64,
    /// Mean of in-degree plus out-degree
    pub average_degree: f64,
    pub cluster_count: usize,
    pub orphan_count: usize,
    pub bidirectional_edges: usize,
    pub edges_by_type: BTreeMap<String, usize>,
}

/// Graph algorithms over a hydrated aggregate
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphAnalyticsService;

impl GraphAnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Shortest path by edge count; see [`Graph::find_path`]
    pub fn find_path(&self, graph: &Graph, start: &NodeId, end: &NodeId) -> Result<Vec<NodeId>> {
        graph.find_path(start, end)
    }

    /// Connected components; see [`Graph::get_clusters`]
    pub fn get_clusters(&self, graph: &Graph) -> Vec<Vec<NodeId>> {
        graph.get_clusters()
    }

    pub fn node_degree(&self, graph: &Graph, id: &NodeId) -> Result<NodeDegree> {
        if !graph.contains_node(id) {
            return Err(Error::NodeNotFound(*id));
        }

        let mut degree = NodeDegree::default();
        for edge in graph.edges_for_node(id) {
            let outgoing = edge.source_id == *id;
            if outgoing || edge.bidirectional {
                degree.out_degree += 1;
            }
            if !outgoing || edge.bidirectional {
                degree.in_degree += 1;
            }
        }
        Ok(degree)
    }

    /// Notes reachable within `max_depth` hops, nearest first
    ///
    /// The start note is excluded and a depth of zero yields nothing.
    pub fn connected_nodes(&self, graph: &Graph, id: &NodeId, max_depth: usize) -> Result<Vec<NodeId>> {
        if !graph.contains_node(id) {
            return Err(Error::NodeNotFound(*id));
        }
        Ok(graph
            .adjacency()
            .within_depth(id, max_depth)
            .into_iter()
            .map(|(node_id, _)| node_id)
            .collect())
    }

    /// Notes touched by no edge, in ascending ID order
    pub fn find_orphaned_nodes(&self, graph: &Graph) -> Vec<NodeId> {
        let touched: BTreeSet<NodeId> = graph
            .edges()
            .flat_map(|edge| [edge.source_id, edge.target_id])
            .collect();

        graph
            .node_ids()
            .into_iter()
            .filter(|id| !touched.contains(id))
            .collect()
    }

    /// Approximate betweenness centrality normalised to `[0, 1]`
    ///
    /// For each pair `i < j` in ascending ID order a single shortest path
    /// from `i` to `j` is taken, and every intermediate note on it scores
    /// one point. Scores are divided by the maximum. Only one path per pair
    /// is counted, so this undercounts notes on alternative shortest paths.
    /// Cost is quadratic in the note count times one BFS.
    pub fn calculate_centrality(&self, graph: &Graph) -> BTreeMap<NodeId, f64> {
        let ids = graph.node_ids();
        let adjacency = graph.adjacency();
        let mut scores: BTreeMap<NodeId, f64> = ids.iter().map(|id| (*id, 0.0)).collect();

        for (i, start) in ids.iter().enumerate() {
            for end in &ids[i + 1..] {
                let Some(path) = adjacency.shortest_path(start, end) else {
                    continue;
                };
                if path.len() < 3 {
                    continue;
                }
                for intermediate in &path[1..path.len() - 1] {
                    if let Some(score) = scores.get_mut(intermediate) {
                        *score += 1.0;
                    }
                }
            }
        }

        let max = scores.values().copied().fold(0.0_f64, f64::max);
        if max > 0.0 {
            for score in scores.values_mut() {
                *score /= max;
            }
        }

        info!(graph_id = %graph.id(), nodes = ids.len(), "Centrality calculated");
        scores
    }

    pub fn statistics(&self, graph: &Graph) -> GraphStatistics {
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();

        let mut edges_by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut bidirectional_edges = 0;
        for edge in graph.edges() {
            *edges_by_type.entry(edge.edge_type.as_str().to_string()).or_default() += 1;
            if edge.bidirectional {
                bidirectional_edges += 1;
            }
        }

        let density = if node_count > 1 {
            edge_count as f64 / (node_count * (node_count - 1)) as f64
        } else {
            0.0
        };
        // Each edge adds one out and one in; bidirectional edges add both twice.
        let degree_sum = 2 * (edge_count + bidirectional_edges);
        let average_degree = if node_count > 0 {
            degree_sum as f64 / node_count as f64
        } else {
            0.0
        };

        GraphStatistics {
            node_count,
            edge_count,
            density,
            average_degree,
            cluster_count: graph.get_clusters().len(),
            orphan_count: self.find_orphaned_nodes(graph).len(),
            bidirectional_edges,
            edges_by_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphLimits;
    use crate::domain::graph::{EdgeOptions, EdgeType, Node, UserId};

    fn graph_with(n: usize) -> (Graph, Vec<NodeId>) {
        let mut graph: Graph = Graph::new("u1", "g", "", GraphLimits::default()).unwrap();
        let user = UserId::new("u1").unwrap();
        let mut ids = Vec::new();
        for i in 0..n {
            let node = Node::new(user.clone(), format!("n{}", i), "");
            ids.push(node.id);
            graph.add_node(node).unwrap();
        }
        (graph, ids)
    }

    #[test]
    fn test_node_degree_counts_bidirectional_both_ways() {
        let (mut graph, n) = graph_with(3);
        graph
            .connect_nodes_with(n[0], n[1], EdgeOptions::new(EdgeType::Normal).bidirectional(true))
            .unwrap();
        graph.connect_nodes(n[1], n[2], EdgeType::Normal).unwrap();
        let service = GraphAnalyticsService::new();

        let a = service.node_degree(&graph, &n[0]).unwrap();
        let b = service.node_degree(&graph, &n[1]).unwrap();
        let c = service.node_degree(&graph, &n[2]).unwrap();

        assert_eq!(a, NodeDegree { in_degree: 1, out_degree: 1 });
        assert_eq!(b, NodeDegree { in_degree: 1, out_degree: 2 });
        assert_eq!(c, NodeDegree { in_degree: 1, out_degree: 0 });
        assert!(service.node_degree(&graph, &NodeId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_connected_nodes_depth() {
        let (mut graph, n) = graph_with(4);
        graph.connect_nodes(n[0], n[1], EdgeType::Normal).unwrap();
        graph.connect_nodes(n[1], n[2], EdgeType::Normal).unwrap();
        graph.connect_nodes(n[2], n[3], EdgeType::Normal).unwrap();
        let service = GraphAnalyticsService::new();

        assert!(service.connected_nodes(&graph, &n[0], 0).unwrap().is_empty());
        assert_eq!(service.connected_nodes(&graph, &n[0], 2).unwrap(), vec![n[1], n[2]]);
        assert_eq!(service.connected_nodes(&graph, &n[0], 10).unwrap().len(), 3);
    }

    #[test]
    fn test_orphans() {
        let (mut graph, n) = graph_with(3);
        graph.connect_nodes(n[0], n[1], EdgeType::Normal).unwrap();

        let orphans = GraphAnalyticsService::new().find_orphaned_nodes(&graph);

        assert_eq!(orphans, vec![n[2]]);
    }

    #[test]
    fn test_centrality_of_bridge_node() {
        let (mut graph, n) = graph_with(3);
        for (a, b) in [(0, 1), (1, 2)] {
            graph
                .connect_nodes_with(n[a], n[b], EdgeOptions::new(EdgeType::Normal).bidirectional(true))
                .unwrap();
        }

        let scores = GraphAnalyticsService::new().calculate_centrality(&graph);

        assert_eq!(scores[&n[1]], 1.0);
        assert_eq!(scores[&n[0]], 0.0);
        assert_eq!(scores[&n[2]], 0.0);
    }

    #[test]
    fn test_analytics_on_empty_graph() {
        let (graph, _) = graph_with(0);
        let service = GraphAnalyticsService::new();

        assert!(service.get_clusters(&graph).is_empty());
        assert!(service.calculate_centrality(&graph).is_empty());
        let stats = service.statistics(&graph);
        assert_eq!(stats.density, 0.0);
        assert_eq!(stats.average_degree, 0.0);
    }

    #[test]
    fn test_statistics() {
        let (mut graph, n) = graph_with(4);
        graph.connect_nodes(n[0], n[1], EdgeType::Strong).unwrap();
        graph
            .connect_nodes_with(n[1], n[2], EdgeOptions::new(EdgeType::Weak).bidirectional(true))
            .unwrap();

        let stats = GraphAnalyticsService::new().statistics(&graph);

        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.cluster_count, 2);
        assert_eq!(stats.orphan_count, 1);
        assert_eq!(stats.bidirectional_edges, 1);
        assert_eq!(stats.edges_by_type["strong"], 1);
        assert!((stats.density - 2.0 / 12.0).abs() < 1e-9);
        assert_eq!(stats.average_degree, 1.5);
    }
}
