//! Edge specifications
//!
//! Predicates over [`Edge`] built on [`Specification`], combinable with
//! `and`, `or` and `not`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::domain::graph::{Edge, EdgeKey, EdgeType, NodeId};
use crate::domain::specification::Specification;

/// Weight lies within `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct WeightRangeSpec {
    pub min: f64,
    pub max: f64,
}

impl WeightRangeSpec {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Default for WeightRangeSpec {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl Specification<Edge> for WeightRangeSpec {
    fn is_satisfied_by(&self, edge: &Edge) -> bool {
        (self.min..=self.max).contains(&edge.weight)
    }
}

/// Edge type is one of an allowed set
#[derive(Debug, Clone)]
pub struct EdgeTypeSpec {
    allowed: BTreeSet<EdgeType>,
}

impl EdgeTypeSpec {
    pub fn new(allowed: impl IntoIterator<Item = EdgeType>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl Specification<Edge> for EdgeTypeSpec {
    fn is_satisfied_by(&self, edge: &Edge) -> bool {
        self.allowed.contains(&edge.edge_type)
    }
}

/// Source and target differ
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSelfLoopSpec;

impl Specification<Edge> for NotSelfLoopSpec {
    fn is_satisfied_by(&self, edge: &Edge) -> bool {
        !edge.is_self_loop()
    }
}

/// Bidirectional flag equals the expected value
#[derive(Debug, Clone, Copy)]
pub struct BidirectionalSpec {
    pub expected: bool,
}

impl Specification<Edge> for BidirectionalSpec {
    fn is_satisfied_by(&self, edge: &Edge) -> bool {
        edge.bidirectional == self.expected
    }
}

/// Edge touches at least one of the given notes
#[derive(Debug, Clone)]
pub struct ConnectsAnySpec {
    node_ids: BTreeSet<NodeId>,
}

impl ConnectsAnySpec {
    pub fn new(node_ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            node_ids: node_ids.into_iter().collect(),
        }
    }
}

impl Specification<Edge> for ConnectsAnySpec {
    fn is_satisfied_by(&self, edge: &Edge) -> bool {
        self.node_ids.contains(&edge.source_id) || self.node_ids.contains(&edge.target_id)
    }
}

type MetadataValidator = dyn Fn(&BTreeMap<String, serde_json::Value>) -> bool + Send + Sync;

/// Metadata has every required key and passes an optional custom check
#[derive(Clone)]
pub struct RequiredMetadataSpec {
    keys: Vec<String>,
    validator: Option<Arc<MetadataValidator>>,
}

impl RequiredMetadataSpec {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            validator: None,
        }
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&BTreeMap<String, serde_json::Value>) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }
}

impl fmt::Debug for RequiredMetadataSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequiredMetadataSpec")
            .field("keys", &self.keys)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Specification<Edge> for RequiredMetadataSpec {
    fn is_satisfied_by(&self, edge: &Edge) -> bool {
        self.keys.iter().all(|key| edge.metadata.contains_key(key))
            && self
                .validator
                .as_ref()
                .is_none_or(|validator| validator(&edge.metadata))
    }
}

/// Edge does not duplicate an existing one
///
/// A duplicate is an existing edge with the same key, or an existing
/// bidirectional edge in the reverse direction.
#[derive(Debug, Clone, Default)]
pub struct UniqueEdgeSpec {
    existing: BTreeMap<EdgeKey, bool>,
}

impl UniqueEdgeSpec {
    pub fn new<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Self {
        Self {
            existing: edges
                .into_iter()
                .map(|edge| (edge.key(), edge.bidirectional))
                .collect(),
        }
    }
}

impl Specification<Edge> for UniqueEdgeSpec {
    fn is_satisfied_by(&self, edge: &Edge) -> bool {
        let key = edge.key();
        !self.existing.contains_key(&key)
            && !self.existing.get(&key.reversed()).copied().unwrap_or(false)
    }
}
