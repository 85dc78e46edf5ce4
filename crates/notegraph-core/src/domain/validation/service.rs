//! Validation of notes and edges against configured limits, plus whole-graph checks

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::GraphLimits;
use crate::domain::graph::{Edge, EdgeType, Graph, Node, NodeId};
use crate::domain::specification::Specification;
use crate::error::{Error, Result};

use super::edge_spec::{NotSelfLoopSpec, UniqueEdgeSpec, WeightRangeSpec};

/// Content and position bounds for a single note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeBounds {
    pub max_title_length: usize,
    pub max_body_length: usize,
    pub max_tag_length: usize,
    /// Largest absolute value of any coordinate
    pub max_coordinate: f64,
}

impl Default for NodeBounds {
    fn default() -> Self {
        Self {
            max_title_length: 200,
            max_body_length: 10_000,
            max_tag_length: 50,
            max_coordinate: 10_000.0,
        }
    }
}

/// Per-mutation and whole-graph validation passes
///
/// Every pass returns the first violation found.
#[derive(Debug, Clone, Default)]
pub struct GraphValidationService {
    limits: GraphLimits,
    bounds: NodeBounds,
}

impl GraphValidationService {
    pub fn new(limits: GraphLimits, bounds: NodeBounds) -> Self {
        Self { limits, bounds }
    }

    /// Title, body, tag and position bounds of one note
    pub fn validate_node(&self, node: &Node) -> Result<()> {
        let title = node.content.title.trim();
        if title.is_empty() {
            return Err(Error::validation("title", "Title cannot be empty"));
        }
        if title.chars().count() > self.bounds.max_title_length {
            return Err(Error::validation(
                "title",
                format!("Title exceeds {} characters", self.bounds.max_title_length),
            ));
        }
        if node.content.body.chars().count() > self.bounds.max_body_length {
            return Err(Error::validation(
                "body",
                format!("Body exceeds {} characters", self.bounds.max_body_length),
            ));
        }

        if node.tags.len() > self.limits.max_tags_per_node {
            return Err(Error::QuotaExceeded {
                resource: "tags per node",
                limit: self.limits.max_tags_per_node,
            });
        }
        if let Some(tag) = node
            .tags
            .iter()
            .find(|tag| tag.trim().is_empty() || tag.chars().count() > self.bounds.max_tag_length)
        {
            return Err(Error::validation(
                "tags",
                format!(
                    "Tag '{}' must be 1 to {} characters",
                    tag, self.bounds.max_tag_length
                ),
            ));
        }

        let position = node.position;
        let limit = self.bounds.max_coordinate;
        if !position.is_finite() || [position.x, position.y, position.z].iter().any(|c| c.abs() > limit) {
            return Err(Error::validation(
                "position",
                format!("Coordinates must be finite and within ±{}", limit),
            ));
        }

        Ok(())
    }

    /// Weight range and self-loop checks of one edge
    pub fn validate_edge(&self, edge: &Edge) -> Result<()> {
        if !NotSelfLoopSpec.is_satisfied_by(edge) {
            return Err(Error::validation(
                "target_id",
                format!("node '{}' cannot be connected to itself", edge.source_id),
            ));
        }
        if !WeightRangeSpec::default().is_satisfied_by(edge) {
            return Err(Error::validation(
                "weight",
                format!("weight {} is outside [0.0, 1.0]", edge.weight),
            ));
        }
        Ok(())
    }

    /// Checks for a note about to be added to the graph
    pub fn validate_new_node(&self, graph: &Graph, node: &Node) -> Result<()> {
        self.validate_node(node)?;
        if !node.is_active() {
            return Err(Error::invalid_state("node", node.status.as_str(), "add"));
        }
        if graph.contains_node(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }
        if graph.node_count() >= self.limits.max_nodes_per_graph {
            return Err(Error::QuotaExceeded {
                resource: "nodes per graph",
                limit: self.limits.max_nodes_per_graph,
            });
        }
        Ok(())
    }

    /// Checks for an edge about to be added to the graph
    pub fn validate_new_edge(&self, graph: &Graph, edge: &Edge) -> Result<()> {
        self.validate_edge(edge)?;

        for id in [edge.source_id, edge.target_id] {
            if !graph.contains_node(&id) {
                return Err(Error::validation(
                    "node_id",
                    format!("node '{}' is not part of graph '{}'", id, graph.id()),
                ));
            }
        }
        if !UniqueEdgeSpec::new(graph.edges()).is_satisfied_by(edge) {
            return Err(Error::DuplicateEdge(edge.key()));
        }
        if graph.edge_count() >= self.limits.max_edges_per_graph {
            return Err(Error::QuotaExceeded {
                resource: "edges per graph",
                limit: self.limits.max_edges_per_graph,
            });
        }
        if graph.connection_count(&edge.source_id) >= self.limits.max_connections_per_node {
            return Err(Error::QuotaExceeded {
                resource: "connections per node",
                limit: self.limits.max_connections_per_node,
            });
        }
        if edge.edge_type == EdgeType::Hierarchical
            && hierarchy(graph).reaches(&edge.target_id, &edge.source_id)
        {
            return Err(Error::validation(
                "edge_type",
                format!("hierarchical edge '{}' would create a cycle", edge.key()),
            ));
        }
        Ok(())
    }

    /// Size check for a batch of mutations
    pub fn validate_bulk_size(&self, size: usize) -> Result<()> {
        if size > self.limits.max_bulk_operation_size {
            return Err(Error::QuotaExceeded {
                resource: "bulk operation size",
                limit: self.limits.max_bulk_operation_size,
            });
        }
        Ok(())
    }

    /// Whether the hierarchical edges of the graph contain a cycle
    pub fn has_hierarchical_cycle(&self, graph: &Graph) -> bool {
        hierarchy(graph).has_cycle()
    }

    /// Aggregate invariants, then every note and edge, then the hierarchy
    pub fn validate_graph(&self, graph: &Graph) -> Result<()> {
        graph.validate()?;
        for node in graph.nodes() {
            self.validate_node(node)?;
        }
        for edge in graph.edges() {
            self.validate_edge(edge)?;
        }
        if self.has_hierarchical_cycle(graph) {
            return Err(Error::validation(
                "edges",
                "hierarchical edges form a cycle",
            ));
        }
        Ok(())
    }
}

/// Parent to children map over hierarchical edges only
struct Hierarchy(BTreeMap<NodeId, Vec<NodeId>>);

fn hierarchy(graph: &Graph) -> Hierarchy {
    let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for edge in graph.edges().filter(|e| e.edge_type == EdgeType::Hierarchical) {
        children.entry(edge.source_id).or_default().push(edge.target_id);
    }
    Hierarchy(children)
}

impl Hierarchy {
    fn children(&self, id: &NodeId) -> &[NodeId] {
        self.0.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn reaches(&self, from: &NodeId, to: &NodeId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![*from];
        while let Some(current) = stack.pop() {
            if current == *to {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.children(&current).iter().copied());
            }
        }
        false
    }

    /// Iterative three-colour depth-first search
    fn has_cycle(&self) -> bool {
        let mut done: BTreeSet<NodeId> = BTreeSet::new();
        let mut on_path: BTreeSet<NodeId> = BTreeSet::new();

        for root in self.0.keys() {
            if done.contains(root) {
                continue;
            }
            let mut stack: Vec<(NodeId, usize)> = vec![(*root, 0)];
            on_path.insert(*root);

            while let Some((node, index)) = stack.pop() {
                let children = self.children(&node);
                if let Some(child) = children.get(index) {
                    stack.push((node, index + 1));
                    if on_path.contains(child) {
                        return true;
                    }
                    if !done.contains(child) {
                        on_path.insert(*child);
                        stack.push((*child, 0));
                    }
                } else {
                    on_path.remove(&node);
                    done.insert(node);
                }
            }
        }
        false
    }
}
