//! Edges between notes
//!
//! An edge is a typed, weighted relationship from a source note to a target
//! note. Edges are identified inside a graph by their canonical key
//! `"{source}->{target}"`, which is also the storage key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::ids::{EdgeId, NodeId};

/// Separator used by the canonical edge key
pub const EDGE_KEY_SEPARATOR: &str = "->";

/// Types of relationships between notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Plain link between two notes
    Normal,
    /// High-similarity link
    Strong,
    /// Low-similarity link
    Weak,
    /// Source cites or refers to target
    Reference,
    /// Source is a parent of target
    Hierarchical,
    /// Source precedes target in time
    Temporal,
}

impl EdgeType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Strong => "strong",
            Self::Weak => "weak",
            Self::Reference => "reference",
            Self::Hierarchical => "hierarchical",
            Self::Temporal => "temporal",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "strong" => Some(Self::Strong),
            "weak" => Some(Self::Weak),
            "reference" | "ref" => Some(Self::Reference),
            "hierarchical" | "parent" => Some(Self::Hierarchical),
            "temporal" => Some(Self::Temporal),
            _ => None,
        }
    }

    /// Get all edge types
    pub fn all() -> &'static [EdgeType] {
        &[
            Self::Normal,
            Self::Strong,
            Self::Weak,
            Self::Reference,
            Self::Hierarchical,
            Self::Temporal,
        ]
    }

    /// Ranking priority used to break similarity ties (higher wins)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Strong => 3,
            Self::Weak => 2,
            Self::Reference => 1,
            Self::Normal | Self::Hierarchical | Self::Temporal => 0,
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::validation("edge_type", format!("unknown edge type '{}'", s))
        })
    }
}

/// Canonical key of an edge: ordered (source, target) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EdgeKey {
    pub source: NodeId,
    pub target: NodeId,
}

impl EdgeKey {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// Key of the same pair in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target,
            target: self.source,
        }
    }

    /// Check whether the key touches a node on either end
    pub fn touches(&self, node_id: &NodeId) -> bool {
        self.source == *node_id || self.target == *node_id
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.source, EDGE_KEY_SEPARATOR, self.target)
    }
}

impl FromStr for EdgeKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (source, target) = s.split_once(EDGE_KEY_SEPARATOR).ok_or_else(|| {
            Error::validation("edge_key", format!("malformed edge key '{}'", s))
        })?;
        Ok(Self::new(source.parse()?, target.parse()?))
    }
}

impl From<EdgeKey> for String {
    fn from(key: EdgeKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for EdgeKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Optional attributes for a new connection
#[derive(Debug, Clone)]
pub struct EdgeOptions {
    pub edge_type: EdgeType,
    pub weight: f64,
    pub bidirectional: bool,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EdgeOptions {
    pub fn new(edge_type: EdgeType) -> Self {
        Self {
            edge_type,
            ..Self::default()
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            edge_type: EdgeType::Normal,
            weight: 1.0,
            bidirectional: false,
            metadata: BTreeMap::new(),
        }
    }
}

/// A typed relationship between two notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for the edge
    pub id: EdgeId,
    /// Note the edge starts from
    pub source_id: NodeId,
    /// Note the edge points to
    pub target_id: NodeId,
    /// Relationship type
    pub edge_type: EdgeType,
    /// Strength of the relationship (0.0 to 1.0)
    pub weight: f64,
    /// Whether the edge may also be traversed target -> source
    pub bidirectional: bool,
    /// Free-form attributes
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// When the edge was created
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Create a new edge with default weight 1.0, not bidirectional
    pub fn new(source_id: NodeId, target_id: NodeId, edge_type: EdgeType) -> Result<Self> {
        Self::with_options(source_id, target_id, EdgeOptions::new(edge_type))
    }

    /// Create a new edge from explicit options
    pub fn with_options(source_id: NodeId, target_id: NodeId, options: EdgeOptions) -> Result<Self> {
        let edge = Self {
            id: EdgeId::new(),
            source_id,
            target_id,
            edge_type: options.edge_type,
            weight: options.weight,
            bidirectional: options.bidirectional,
            metadata: options.metadata,
            created_at: Utc::now(),
        };
        edge.check()?;
        Ok(edge)
    }

    /// Canonical key of this edge
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source_id, self.target_id)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }

    /// Check whether the edge touches a node on either end
    pub fn connects(&self, node_id: &NodeId) -> bool {
        self.source_id == *node_id || self.target_id == *node_id
    }

    /// Get the opposite endpoint, if the node is one of the endpoints
    pub fn other_end(&self, node_id: &NodeId) -> Option<NodeId> {
        if self.source_id == *node_id {
            Some(self.target_id)
        } else if self.target_id == *node_id {
            Some(self.source_id)
        } else {
            None
        }
    }

    /// Structural checks every stored edge must pass
    pub fn check(&self) -> Result<()> {
        if self.is_self_loop() {
            return Err(Error::validation(
                "target_id",
                format!("node '{}' cannot be connected to itself", self.source_id),
            ));
        }
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(Error::validation(
                "weight",
                format!("weight {} is outside [0.0, 1.0]", self.weight),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_creation_defaults() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let edge = Edge::new(a, b, EdgeType::Normal).unwrap();

        assert_eq!(edge.weight, 1.0);
        assert!(!edge.bidirectional);
        assert_eq!(edge.key(), EdgeKey::new(a, b));
    }

    #[test]
    fn test_self_loop_rejected() {
        let a = NodeId::new();
        let err = Edge::new(a, a, EdgeType::Strong).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let options = EdgeOptions::new(EdgeType::Weak).with_weight(1.5);
        assert!(Edge::with_options(NodeId::new(), NodeId::new(), options).is_err());

        let options = EdgeOptions::new(EdgeType::Weak).with_weight(f64::NAN);
        assert!(Edge::with_options(NodeId::new(), NodeId::new(), options).is_err());
    }

    #[test]
    fn test_canonical_key_format() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let key = EdgeKey::new(a, b);

        assert_eq!(key.to_string(), format!("{}->{}", a, b));
        assert_eq!(key.to_string().parse::<EdgeKey>().unwrap(), key);
        assert_eq!(key.reversed(), EdgeKey::new(b, a));
    }

    #[test]
    fn test_malformed_key_rejected() {
        assert!("abc".parse::<EdgeKey>().is_err());
        assert!("abc->def".parse::<EdgeKey>().is_err());
    }

    #[test]
    fn test_edge_type_parsing() {
        assert_eq!(EdgeType::parse("hierarchical"), Some(EdgeType::Hierarchical));
        assert_eq!(EdgeType::parse("REF"), Some(EdgeType::Reference));
        assert_eq!(EdgeType::parse("unknown"), None);
        assert!("bogus".parse::<EdgeType>().is_err());
    }

    #[test]
    fn test_other_end() {
        let (a, b, c) = (NodeId::new(), NodeId::new(), NodeId::new());
        let edge = Edge::new(a, b, EdgeType::Normal).unwrap();

        assert_eq!(edge.other_end(&a), Some(b));
        assert_eq!(edge.other_end(&b), Some(a));
        assert_eq!(edge.other_end(&c), None);
    }
}
