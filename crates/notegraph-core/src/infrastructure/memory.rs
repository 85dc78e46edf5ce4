//! In-memory graph store
//!
//! Keeps graph headers, notes and edges in process memory. Implements both
//! loader traits, so it can back a [`LazyGraph`] in tests and in the CLI.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::config::GraphLimits;
use crate::domain::graph::{
    Edge, EdgeKey, EdgeLoader, Graph, GraphHeader, GraphId, LazyGraph, Node, NodeId, NodeLoader,
};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct StoreState {
    headers: BTreeMap<GraphId, GraphHeader>,
    members: BTreeMap<GraphId, (Vec<NodeId>, Vec<EdgeKey>)>,
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
}

/// Thread-safe in-memory persistence for graphs
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<StoreState>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a note outside of any graph
    pub fn insert_node(&self, node: Node) {
        self.write().nodes.insert(node.id, node);
    }

    /// Store an edge outside of any graph
    pub fn insert_edge(&self, edge: Edge) {
        self.write().edges.insert(edge.key(), edge);
    }

    /// Persist a hydrated graph
    ///
    /// With `expected_version`, the stored header must be at that version
    /// (optimistic concurrency); a graph not stored yet always passes.
    pub fn save_graph(&self, graph: &Graph, expected_version: Option<u64>) -> Result<()> {
        let mut state = self.write();

        if let (Some(expected), Some(stored)) = (expected_version, state.headers.get(&graph.id())) {
            if stored.version != expected {
                return Err(Error::VersionConflict {
                    expected,
                    actual: stored.version,
                });
            }
        }

        for node in graph.nodes() {
            state.nodes.insert(node.id, node.clone().into_stored());
        }
        for edge in graph.edges() {
            state.edges.insert(edge.key(), edge.clone());
        }
        state
            .members
            .insert(graph.id(), (graph.node_ids(), graph.edge_keys()));
        state.headers.insert(graph.id(), graph.header());

        debug!(graph_id = %graph.id(), version = graph.version(), "Graph saved");
        Ok(())
    }

    /// Restore a stored graph as identifiers only
    pub fn load_lazy(&self, graph_id: &GraphId, limits: GraphLimits) -> Result<LazyGraph> {
        let state = self.read();
        let header = state
            .headers
            .get(graph_id)
            .cloned()
            .ok_or_else(|| Error::GraphNotFound(graph_id.to_string()))?;
        let (node_ids, edge_keys) = state.members.get(graph_id).cloned().unwrap_or_default();

        Ok(LazyGraph::restore_ids(header, node_ids, edge_keys, limits))
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.read().edges.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl NodeLoader for InMemoryGraphStore {
    async fn load_node(&self, id: &NodeId) -> Result<Node> {
        self.read()
            .nodes
            .get(id)
            .cloned()
            .ok_or(Error::NodeNotFound(*id))
    }

    async fn load_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        let state = self.read();
        ids.iter()
            .map(|id| state.nodes.get(id).cloned().ok_or(Error::NodeNotFound(*id)))
            .collect()
    }
}

#[async_trait]
impl EdgeLoader for InMemoryGraphStore {
    async fn load_edge(&self, key: &EdgeKey) -> Result<Edge> {
        self.read()
            .edges
            .get(key)
            .cloned()
            .ok_or_else(|| Error::EdgeNotFound(key.to_string()))
    }

    async fn load_edges(&self, keys: &[EdgeKey]) -> Result<Vec<Edge>> {
        let state = self.read();
        keys.iter()
            .map(|key| {
                state
                    .edges
                    .get(key)
                    .cloned()
                    .ok_or_else(|| Error::EdgeNotFound(key.to_string()))
            })
            .collect()
    }

    async fn load_edges_by_node_id(&self, id: &NodeId) -> Result<Vec<Edge>> {
        Ok(self
            .read()
            .edges
            .values()
            .filter(|edge| edge.connects(id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{EdgeType, UserId};

    fn sample_graph() -> Graph {
        let mut graph: Graph = Graph::new("u1", "g", "", GraphLimits::default()).unwrap();
        let user = UserId::new("u1").unwrap();
        let (a, b) = (Node::new(user.clone(), "a", ""), Node::new(user, "b", ""));
        let (a_id, b_id) = (a.id, b.id);
        graph.add_node(a).unwrap();
        graph.add_node(b).unwrap();
        graph.connect_nodes(a_id, b_id, EdgeType::Normal).unwrap();
        graph
    }

    #[tokio::test]
    async fn test_loaders_return_stored_items() {
        let store = InMemoryGraphStore::new();
        let graph = sample_graph();
        store.save_graph(&graph, None).unwrap();

        let ids = graph.node_ids();
        let nodes = store.load_nodes(&ids).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.uncommitted_events().is_empty()));

        let edges = store.load_edges_by_node_id(&ids[0]).await.unwrap();
        assert_eq!(edges.len(), 1);

        let missing = store.load_node(&NodeId::new()).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_save_graph_version_conflict() {
        let store = InMemoryGraphStore::new();
        let mut graph = sample_graph();
        let loaded_version = graph.version();
        store.save_graph(&graph, Some(99)).unwrap();

        graph.update_details(Some("renamed"), None).unwrap();
        assert!(store.save_graph(&graph, Some(loaded_version + 1)).unwrap_err().is_conflict());
        store.save_graph(&graph, Some(loaded_version)).unwrap();
    }

    #[test]
    fn test_load_lazy_unknown_graph() {
        let store = InMemoryGraphStore::new();
        let err = store
            .load_lazy(&GraphId::new(), GraphLimits::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
