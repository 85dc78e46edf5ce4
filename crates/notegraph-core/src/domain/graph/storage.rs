//! Storage strategies for the graph aggregate
//!
//! The aggregate's invariants and events are written once against
//! [`GraphStorage`]. Two strategies exist:
//!
//! - [`HydratedStorage`] owns full [`Node`] and [`Edge`] values.
//! - [`LazyStorage`] owns only identifiers, edge keys and a per-node
//!   connectivity count; full values are resolved through loaders.
//!
//! Connections are applied in two steps: `stage_connection` performs every
//! fallible check against a staged copy without touching the storage, and
//! `commit_connection` applies the staged result infallibly.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

use super::edge::{Edge, EdgeKey, EdgeType};
use super::event::GraphEvent;
use super::ids::NodeId;
use super::node::Node;

/// Storage representation behind a graph aggregate
pub trait GraphStorage: Default {
    /// Result of a successfully staged connection, ready to commit
    type Staged;

    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn contains_node(&self, id: &NodeId) -> bool;

    fn contains_edge(&self, key: &EdgeKey) -> bool;

    /// Node IDs in ascending order
    fn node_ids(&self) -> Vec<NodeId>;

    /// Edge keys in ascending order
    fn edge_keys(&self) -> Vec<EdgeKey>;

    /// Keys of every edge with the node as source or target
    fn edge_keys_touching(&self, id: &NodeId) -> Vec<EdgeKey> {
        self.edge_keys()
            .into_iter()
            .filter(|key| key.touches(id))
            .collect()
    }

    /// Outgoing connections recorded for a node
    fn connection_count(&self, id: &NodeId) -> usize;

    /// Insert or replace a node
    fn insert_node(&mut self, node: Node);

    /// Archive (when the full node is held) and remove a node.
    ///
    /// Must leave the storage untouched when it fails.
    fn retire_node(&mut self, id: &NodeId) -> Result<Option<Node>>;

    /// Check and prepare the source-side adjacency update for a new edge
    fn stage_connection(
        &self,
        key: &EdgeKey,
        edge_type: EdgeType,
        max_connections: usize,
    ) -> Result<Self::Staged>;

    /// Stage a persisted edge: no quota, no version bump, no event
    fn stage_loaded_connection(&self, key: &EdgeKey, edge_type: EdgeType) -> Result<Self::Staged>;

    /// Apply a staged adjacency update and store the edge
    fn commit_connection(&mut self, staged: Self::Staged, edge: Edge);

    /// Remove an edge and the source-side adjacency entry
    fn remove_edge(&mut self, key: &EdgeKey) -> bool;

    /// Events buffered on owned nodes, left in place
    fn node_events(&self) -> Vec<GraphEvent>;

    /// Drain events buffered on owned nodes
    fn take_node_events(&mut self) -> Vec<GraphEvent>;
}

/// Fully hydrated storage: owns every node and edge
#[derive(Debug, Clone, Default)]
pub struct HydratedStorage {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
}

impl HydratedStorage {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// Nodes in ascending ID order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in ascending key order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }
}

impl GraphStorage for HydratedStorage {
    type Staged = Node;

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edges.keys().copied().collect()
    }

    fn connection_count(&self, id: &NodeId) -> usize {
        self.nodes.get(id).map_or(0, Node::connection_count)
    }

    fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    fn retire_node(&mut self, id: &NodeId) -> Result<Option<Node>> {
        let node = self.nodes.get_mut(id).ok_or(Error::NodeNotFound(*id))?;
        node.archive()?;
        Ok(self.nodes.remove(id))
    }

    fn stage_connection(
        &self,
        key: &EdgeKey,
        edge_type: EdgeType,
        max_connections: usize,
    ) -> Result<Node> {
        let mut source = self
            .nodes
            .get(&key.source)
            .cloned()
            .ok_or(Error::NodeNotFound(key.source))?;
        source.connect_to(key.target, edge_type, max_connections)?;
        Ok(source)
    }

    fn stage_loaded_connection(&self, key: &EdgeKey, edge_type: EdgeType) -> Result<Node> {
        let mut source = self
            .nodes
            .get(&key.source)
            .cloned()
            .ok_or(Error::NodeNotFound(key.source))?;
        source.restore_connection(key.target, edge_type)?;
        Ok(source)
    }

    fn commit_connection(&mut self, staged: Node, edge: Edge) {
        self.nodes.insert(staged.id, staged);
        self.edges.insert(edge.key(), edge);
    }

    fn remove_edge(&mut self, key: &EdgeKey) -> bool {
        if self.edges.remove(key).is_none() {
            return false;
        }
        if let Some(source) = self.nodes.get_mut(&key.source) {
            source.disconnect_from(&key.target);
        }
        true
    }

    fn node_events(&self) -> Vec<GraphEvent> {
        self.nodes
            .values()
            .flat_map(|node| node.uncommitted_events().iter().cloned())
            .collect()
    }

    fn take_node_events(&mut self) -> Vec<GraphEvent> {
        self.nodes
            .values_mut()
            .flat_map(Node::take_uncommitted_events)
            .collect()
    }
}

/// Identifier-only storage used by the lazy aggregate
#[derive(Debug, Clone, Default)]
pub struct LazyStorage {
    node_ids: BTreeSet<NodeId>,
    edge_keys: BTreeSet<EdgeKey>,
    connectivity: BTreeMap<NodeId, usize>,
}

/// Staged connectivity update for a lazy source node
#[derive(Debug, Clone, Copy)]
pub struct StagedCount {
    node_id: NodeId,
    count: usize,
}

impl LazyStorage {
    /// Build from persisted identifiers; connectivity is derived from the keys
    pub fn from_parts(
        node_ids: impl IntoIterator<Item = NodeId>,
        edge_keys: impl IntoIterator<Item = EdgeKey>,
    ) -> Self {
        let mut storage = Self {
            node_ids: node_ids.into_iter().collect(),
            ..Self::default()
        };
        for key in edge_keys {
            if storage.edge_keys.insert(key) {
                *storage.connectivity.entry(key.source).or_default() += 1;
            }
        }
        storage
    }

    /// Current connectivity of the source, once the key is known to be new
    fn stage_count(&self, key: &EdgeKey) -> Result<usize> {
        if !self.node_ids.contains(&key.source) {
            return Err(Error::NodeNotFound(key.source));
        }
        if self.edge_keys.contains(key) {
            return Err(Error::DuplicateEdge(*key));
        }
        Ok(self.connection_count(&key.source))
    }

    /// Node IDs in ascending order, borrowed
    pub fn ids(&self) -> &BTreeSet<NodeId> {
        &self.node_ids
    }

    /// Edge keys in ascending order, borrowed
    pub fn keys(&self) -> &BTreeSet<EdgeKey> {
        &self.edge_keys
    }
}

impl GraphStorage for LazyStorage {
    type Staged = StagedCount;

    fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    fn edge_count(&self) -> usize {
        self.edge_keys.len()
    }

    fn contains_node(&self, id: &NodeId) -> bool {
        self.node_ids.contains(id)
    }

    fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.edge_keys.contains(key)
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.node_ids.iter().copied().collect()
    }

    fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edge_keys.iter().copied().collect()
    }

    fn connection_count(&self, id: &NodeId) -> usize {
        self.connectivity.get(id).copied().unwrap_or(0)
    }

    fn insert_node(&mut self, node: Node) {
        self.node_ids.insert(node.id);
    }

    fn retire_node(&mut self, id: &NodeId) -> Result<Option<Node>> {
        if !self.node_ids.remove(id) {
            return Err(Error::NodeNotFound(*id));
        }
        self.connectivity.remove(id);
        Ok(None)
    }

    fn stage_connection(
        &self,
        key: &EdgeKey,
        _edge_type: EdgeType,
        max_connections: usize,
    ) -> Result<StagedCount> {
        let count = self.stage_count(key)?;
        if count >= max_connections {
            return Err(Error::QuotaExceeded {
                resource: "connections per node",
                limit: max_connections,
            });
        }
        Ok(StagedCount {
            node_id: key.source,
            count: count + 1,
        })
    }

    fn stage_loaded_connection(&self, key: &EdgeKey, _edge_type: EdgeType) -> Result<StagedCount> {
        let count = self.stage_count(key)?;
        Ok(StagedCount {
            node_id: key.source,
            count: count + 1,
        })
    }

    fn commit_connection(&mut self, staged: StagedCount, edge: Edge) {
        self.connectivity.insert(staged.node_id, staged.count);
        self.edge_keys.insert(edge.key());
    }

    fn remove_edge(&mut self, key: &EdgeKey) -> bool {
        if !self.edge_keys.remove(key) {
            return false;
        }
        if let Some(count) = self.connectivity.get_mut(&key.source) {
            *count = count.saturating_sub(1);
        }
        true
    }

    fn node_events(&self) -> Vec<GraphEvent> {
        Vec::new()
    }

    fn take_node_events(&mut self) -> Vec<GraphEvent> {
        Vec::new()
    }
}
