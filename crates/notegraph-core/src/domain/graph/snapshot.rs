//! Serialisable snapshot of a hydrated graph

use serde::{Deserialize, Serialize};

use crate::config::GraphLimits;
use crate::error::Result;

use super::aggregate::{Graph, GraphHeader};
use super::edge::Edge;
use super::node::Node;

/// Header, notes and edges of a graph in one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(flatten)]
    pub header: GraphHeader,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Graph {
    /// Capture the current state; uncommitted events are not included
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            header: self.header(),
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    /// Rebuild a graph through the trusted load path and validate it
    pub fn from_snapshot(snapshot: GraphSnapshot, limits: GraphLimits) -> Result<Self> {
        let mut graph = Self::restore(snapshot.header, limits);
        for node in snapshot.nodes {
            graph.load_node(node);
        }
        for edge in snapshot.edges {
            graph.load_edge(edge)?;
        }
        graph.validate()?;
        Ok(graph)
    }
}
