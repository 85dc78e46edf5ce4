//! The knowledge graph aggregate
//!
//! [`Graph`] is the consistency boundary for one user's notes and the edges
//! between them. Every command either applies completely or returns the
//! first violation without changing state. Successful commands bump the
//! version, refresh `updated_at` and append a [`GraphEvent`].
//!
//! The aggregate is not internally synchronised. Load it, mutate it,
//! validate it, persist it with a version check, then drop it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GraphLimits;
use crate::error::{Error, Result};

use super::edge::{Edge, EdgeKey, EdgeOptions, EdgeType};
use super::event::GraphEvent;
use super::ids::{GraphId, NodeId, UserId};
use super::node::Node;
use super::storage::{GraphStorage, HydratedStorage, LazyStorage};
use super::traversal::Adjacency;

/// Display preferences stored with a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub layout: String,
    pub theme: String,
    pub show_labels: bool,
    pub node_size: f64,
    pub edge_thickness: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            layout: "force".to_string(),
            theme: "light".to_string(),
            show_labels: true,
            node_size: 1.0,
            edge_thickness: 1.0,
        }
    }
}

/// Denormalized graph metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub max_depth: usize,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub view_settings: ViewSettings,
}

/// Persisted scalar state of a graph, without its nodes and edges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphHeader {
    pub id: GraphId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: GraphMetadata,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of graph settings; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub view_settings: Option<ViewSettings>,
    pub max_depth: Option<usize>,
}

/// Knowledge graph aggregate root
#[derive(Debug, Clone)]
pub struct Graph<S: GraphStorage = HydratedStorage> {
    id: GraphId,
    user_id: UserId,
    name: String,
    description: String,
    metadata: GraphMetadata,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    limits: GraphLimits,
    pub(super) storage: S,
    events: Vec<GraphEvent>,
}

/// Graph aggregate holding only identifiers
pub type LazyGraph = Graph<LazyStorage>;

impl<S: GraphStorage> Graph<S> {
    /// Create an empty graph at version 1
    ///
    /// A blank name falls back to the configured default graph name.
    pub fn new(
        user_id: impl Into<String>,
        name: &str,
        description: &str,
        limits: GraphLimits,
    ) -> Result<Self> {
        let user_id = UserId::new(user_id)?;
        let name = match name.trim() {
            "" => limits.default_graph_name.clone(),
            trimmed => trimmed.to_string(),
        };
        let now = Utc::now();
        let id = GraphId::new();

        info!(graph_id = %id, user_id = %user_id, name = %name, "Graph created");

        Ok(Self {
            id,
            events: vec![GraphEvent::graph_created(id, user_id.clone(), name.clone())],
            user_id,
            name,
            description: description.trim().to_string(),
            metadata: GraphMetadata::default(),
            version: 1,
            created_at: now,
            updated_at: now,
            limits,
            storage: S::default(),
        })
    }

    /// Reconstruct a graph from persisted state with empty storage
    ///
    /// Nodes and edges are then supplied through [`Graph::load_node`] and
    /// [`Graph::load_edge`]. The header's counts are kept as stored, so
    /// [`Graph::validate`] reports drift between them and the loaded data.
    pub fn restore(header: GraphHeader, limits: GraphLimits) -> Self {
        Self::restore_with(header, S::default(), limits)
    }

    /// Reconstruct a graph from persisted state and prepared storage
    pub fn restore_with(header: GraphHeader, storage: S, limits: GraphLimits) -> Self {
        Self {
            id: header.id,
            user_id: header.user_id,
            name: header.name,
            description: header.description,
            metadata: header.metadata,
            version: header.version,
            created_at: header.created_at,
            updated_at: header.updated_at,
            limits,
            storage,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn limits(&self) -> &GraphLimits {
        &self.limits
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn node_count(&self) -> usize {
        self.metadata.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.metadata.edge_count
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.storage.contains_node(id)
    }

    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.storage.contains_edge(key)
    }

    /// Check for an edge between two nodes in either direction
    pub fn are_connected(&self, a: &NodeId, b: &NodeId) -> bool {
        let key = EdgeKey::new(*a, *b);
        self.storage.contains_edge(&key) || self.storage.contains_edge(&key.reversed())
    }

    /// Node IDs in ascending order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.storage.node_ids()
    }

    /// Edge keys in ascending order
    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.storage.edge_keys()
    }

    /// Outgoing connections recorded for a node
    pub fn connection_count(&self, id: &NodeId) -> usize {
        self.storage.connection_count(id)
    }

    /// Scalar state for persistence
    pub fn header(&self) -> GraphHeader {
        GraphHeader {
            id: self.id,
            user_id: self.user_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            metadata: self.metadata.clone(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    // ========== Commands ==========

    /// Add a note to the graph
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.storage.contains_node(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }
        if self.metadata.node_count >= self.limits.max_nodes_per_graph {
            return Err(Error::QuotaExceeded {
                resource: "nodes per graph",
                limit: self.limits.max_nodes_per_graph,
            });
        }

        let node_id = node.id;
        self.storage.insert_node(node);
        self.metadata.node_count += 1;
        self.record(GraphEvent::node_added(self.id, node_id));

        debug!(graph_id = %self.id, node_id = %node_id, "Node added to graph");
        Ok(())
    }

    /// Connect two notes with a default edge (weight 1.0, one-way)
    pub fn connect_nodes(
        &mut self,
        source_id: NodeId,
        target_id: NodeId,
        edge_type: EdgeType,
    ) -> Result<Edge> {
        self.connect_nodes_with(source_id, target_id, EdgeOptions::new(edge_type))
    }

    /// Connect two notes with explicit edge options
    pub fn connect_nodes_with(
        &mut self,
        source_id: NodeId,
        target_id: NodeId,
        options: EdgeOptions,
    ) -> Result<Edge> {
        if source_id == target_id {
            return Err(Error::validation(
                "target_id",
                format!("node '{}' cannot be connected to itself", source_id),
            ));
        }
        for id in [source_id, target_id] {
            if !self.storage.contains_node(&id) {
                return Err(Error::validation(
                    "node_id",
                    format!("node '{}' is not part of graph '{}'", id, self.id),
                ));
            }
        }

        let key = EdgeKey::new(source_id, target_id);
        if self.storage.contains_edge(&key) {
            return Err(Error::DuplicateEdge(key));
        }
        if self.metadata.edge_count >= self.limits.max_edges_per_graph {
            return Err(Error::QuotaExceeded {
                resource: "edges per graph",
                limit: self.limits.max_edges_per_graph,
            });
        }

        let edge = Edge::with_options(source_id, target_id, options)?;
        let staged = self.storage.stage_connection(
            &key,
            edge.edge_type,
            self.limits.max_connections_per_node,
        )?;
        self.storage.commit_connection(staged, edge.clone());
        self.metadata.edge_count += 1;
        self.record(GraphEvent::nodes_connected(
            self.id,
            edge.id,
            source_id,
            target_id,
            edge.edge_type,
        ));

        debug!(graph_id = %self.id, edge = %key, edge_type = %edge.edge_type, "Nodes connected");
        Ok(edge)
    }

    /// Remove the edge `source -> target`
    pub fn disconnect_nodes(&mut self, source_id: NodeId, target_id: NodeId) -> Result<()> {
        let key = EdgeKey::new(source_id, target_id);
        if !self.storage.remove_edge(&key) {
            return Err(Error::EdgeNotFound(key.to_string()));
        }

        self.metadata.edge_count = self.metadata.edge_count.saturating_sub(1);
        self.record(GraphEvent::NodesDisconnected {
            graph_id: self.id,
            source_id,
            target_id,
            timestamp: Utc::now(),
        });

        debug!(graph_id = %self.id, edge = %key, "Nodes disconnected");
        Ok(())
    }

    /// Remove a note and every edge touching it
    ///
    /// With hydrated storage the note is archived first (failing if it is
    /// already archived) and returned so the caller can persist it.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<Option<Node>> {
        if !self.storage.contains_node(node_id) {
            return Err(Error::NodeNotFound(*node_id));
        }

        let retired = self.storage.retire_node(node_id)?;

        let touching = self.storage.edge_keys_touching(node_id);
        let removed_edges = touching
            .iter()
            .filter(|key| self.storage.remove_edge(key))
            .count();

        self.metadata.node_count = self.metadata.node_count.saturating_sub(1);
        self.metadata.edge_count = self.metadata.edge_count.saturating_sub(removed_edges);
        self.record(GraphEvent::node_removed(self.id, *node_id, removed_edges));

        debug!(graph_id = %self.id, node_id = %node_id, removed_edges, "Node removed from graph");
        Ok(retired)
    }

    /// Rename the graph and/or change its description
    pub fn update_details(&mut self, name: Option<&str>, description: Option<&str>) -> Result<()> {
        let mut changes = Vec::new();

        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::validation("name", "Graph name cannot be empty"));
            }
            if name != self.name {
                changes.push("name".to_string());
            }
        }
        if let Some(description) = description {
            if description.trim() != self.description {
                changes.push("description".to_string());
            }
        }
        if changes.is_empty() {
            return Ok(());
        }

        if let Some(name) = name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = description {
            self.description = description.trim().to_string();
        }
        self.record_update(changes);
        Ok(())
    }

    /// Change visibility, tags, view settings or depth
    pub fn update_settings(&mut self, update: SettingsUpdate) {
        let mut changes = Vec::new();

        if let Some(is_public) = update.is_public {
            self.metadata.is_public = is_public;
            changes.push("is_public".to_string());
        }
        if let Some(tags) = update.tags {
            let mut unique: Vec<String> = Vec::new();
            for tag in tags.into_iter().map(|t| t.trim().to_string()) {
                if !tag.is_empty() && !unique.iter().any(|u| u.eq_ignore_ascii_case(&tag)) {
                    unique.push(tag);
                }
            }
            self.metadata.tags = unique;
            changes.push("tags".to_string());
        }
        if let Some(view_settings) = update.view_settings {
            self.metadata.view_settings = view_settings;
            changes.push("view_settings".to_string());
        }
        if let Some(max_depth) = update.max_depth {
            self.metadata.max_depth = max_depth;
            changes.push("max_depth".to_string());
        }

        if !changes.is_empty() {
            self.record_update(changes);
        }
    }

    // ========== Invariants ==========

    /// Check every aggregate invariant, returning the first violation
    pub fn validate(&self) -> Result<()> {
        let stored_nodes = self.storage.node_count();
        if stored_nodes != self.metadata.node_count {
            return Err(Error::validation(
                "node_count",
                format!(
                    "metadata reports {} nodes but the graph holds {}",
                    self.metadata.node_count, stored_nodes
                ),
            ));
        }

        let stored_edges = self.storage.edge_count();
        if stored_edges != self.metadata.edge_count {
            return Err(Error::validation(
                "edge_count",
                format!(
                    "metadata reports {} edges but the graph holds {}",
                    self.metadata.edge_count, stored_edges
                ),
            ));
        }

        if stored_nodes > self.limits.max_nodes_per_graph {
            return Err(Error::QuotaExceeded {
                resource: "nodes per graph",
                limit: self.limits.max_nodes_per_graph,
            });
        }
        if stored_edges > self.limits.max_edges_per_graph {
            return Err(Error::QuotaExceeded {
                resource: "edges per graph",
                limit: self.limits.max_edges_per_graph,
            });
        }

        let mut fan_out: BTreeMap<NodeId, usize> = BTreeMap::new();
        for key in self.storage.edge_keys() {
            if key.source == key.target {
                return Err(Error::validation(
                    "edges",
                    format!("edge '{}' is a self-loop", key),
                ));
            }
            for endpoint in [key.source, key.target] {
                if !self.storage.contains_node(&endpoint) {
                    return Err(Error::validation(
                        "edges",
                        format!("edge '{}' references missing node '{}'", key, endpoint),
                    ));
                }
            }
            *fan_out.entry(key.source).or_default() += 1;
        }

        if let Some((node_id, _)) = fan_out
            .iter()
            .find(|(_, count)| **count > self.limits.max_connections_per_node)
        {
            return Err(Error::validation(
                "connections",
                format!(
                    "node '{}' exceeds the limit of {} connections",
                    node_id, self.limits.max_connections_per_node
                ),
            ));
        }

        Ok(())
    }

    /// Fail with a conflict unless the aggregate is at `expected` version
    pub fn ensure_version(&self, expected: u64) -> Result<()> {
        if self.version != expected {
            return Err(Error::VersionConflict {
                expected,
                actual: self.version,
            });
        }
        Ok(())
    }

    // ========== Trusted hydration ==========

    /// Insert a stored note without duplicate checks, events or count updates
    ///
    /// Any adjacency or buffered events the value carries are dropped; the
    /// adjacency is rebuilt by [`Self::load_edge`].
    pub fn load_node(&mut self, node: Node) {
        self.storage.insert_node(node.into_stored());
    }

    /// Insert a stored edge without events or count updates
    ///
    /// The source note's adjacency is restored without bumping its version.
    /// An edge key the graph already holds fails with `DuplicateEdge`, and
    /// nothing is written unless every step succeeds.
    pub fn load_edge(&mut self, edge: Edge) -> Result<()> {
        edge.check()?;
        for id in [edge.source_id, edge.target_id] {
            if !self.storage.contains_node(&id) {
                return Err(Error::NodeNotFound(id));
            }
        }

        let staged = self.storage.stage_loaded_connection(&edge.key(), edge.edge_type)?;
        self.storage.commit_connection(staged, edge);
        Ok(())
    }

    // ========== Events ==========

    /// Events recorded by the aggregate since the last commit
    pub fn uncommitted_events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// The aggregate's events followed by those of its notes, left in place
    pub fn pending_events(&self) -> Vec<GraphEvent> {
        let mut events = self.events.clone();
        events.extend(self.storage.node_events());
        events
    }

    /// Drain the aggregate's events followed by those of its notes
    pub fn take_uncommitted_events(&mut self) -> Vec<GraphEvent> {
        let mut events = std::mem::take(&mut self.events);
        events.extend(self.storage.take_node_events());
        events
    }

    /// Clear the aggregate's and every owned note's event buffer
    pub fn mark_events_as_committed(&mut self) {
        self.events.clear();
        self.storage.take_node_events();
    }

    fn record(&mut self, event: GraphEvent) {
        self.events.push(event);
        self.version += 1;
        self.updated_at = Utc::now();
    }

    fn record_update(&mut self, changes: Vec<String>) {
        debug!(graph_id = %self.id, ?changes, "Graph updated");
        self.record(GraphEvent::GraphUpdated {
            graph_id: self.id,
            changes,
            timestamp: Utc::now(),
        });
    }
}

impl Graph<HydratedStorage> {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.storage.node(id)
    }

    /// Nodes in ascending ID order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.storage.nodes()
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.storage.edge(key)
    }

    /// The edge `source -> target`, if any
    pub fn edge_between(&self, source_id: &NodeId, target_id: &NodeId) -> Option<&Edge> {
        self.storage.edge(&EdgeKey::new(*source_id, *target_id))
    }

    /// Edges in ascending key order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.storage.edges()
    }

    /// Every edge with the node as source or target
    pub fn edges_for_node(&self, id: &NodeId) -> Vec<&Edge> {
        self.storage.edges().filter(|e| e.connects(id)).collect()
    }

    /// Traversal view of the current nodes and edges
    pub fn adjacency(&self) -> Adjacency {
        Adjacency::build(self.storage.node_ids(), self.storage.edges())
    }

    /// Shortest path by edge count, following edge direction
    pub fn find_path(&self, start: &NodeId, end: &NodeId) -> Result<Vec<NodeId>> {
        for id in [start, end] {
            if !self.storage.contains_node(id) {
                return Err(Error::NodeNotFound(*id));
            }
        }
        self.adjacency()
            .shortest_path(start, end)
            .ok_or(Error::PathNotFound {
                from: *start,
                to: *end,
            })
    }

    /// Connected components; isolated notes form singleton clusters
    ///
    /// Unlike [`Self::find_path`], clustering ignores edge direction: two
    /// notes joined by a one-way edge always share a cluster.
    pub fn get_clusters(&self) -> Vec<Vec<NodeId>> {
        self.adjacency().components()
    }
}
