//! Note similarity and connection eligibility

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::graph::{Edge, Graph, Node, NodeId};
use crate::domain::similarity::{SimilarityScorer, TextAnalyzer};
use crate::error::{Error, Result};

/// Weight of keyword overlap in [`NodeRelationshipService::calculate_similarity`]
pub const CONTENT_WEIGHT: f64 = 0.4;
/// Weight of tag overlap
pub const TAG_WEIGHT: f64 = 0.3;
/// Weight of spatial proximity
pub const SPATIAL_WEIGHT: f64 = 0.2;
/// Weight of matching metadata entries
pub const METADATA_WEIGHT: f64 = 0.1;

/// Beyond this distance notes have no spatial similarity
const MAX_SPATIAL_DISTANCE: f64 = 1000.0;
/// Distance scale of the exponential proximity decay
const SPATIAL_DECAY: f64 = 100.0;

type Compatibility = dyn Fn(&Node, &Node) -> bool + Send + Sync;

/// A suggested connection from one note to another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSuggestion {
    pub node_id: NodeId,
    pub title: String,
    pub similarity: f64,
    pub reason: String,
}

/// Eligibility, similarity and suggestion rules for connecting notes
#[derive(Clone)]
pub struct NodeRelationshipService {
    analyzer: TextAnalyzer,
    compatibility: Arc<Compatibility>,
}

impl Default for NodeRelationshipService {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRelationshipService {
    /// Service whose compatibility rule accepts any two active notes
    pub fn new() -> Self {
        Self {
            analyzer: TextAnalyzer::new(),
            compatibility: Arc::new(|a: &Node, b: &Node| a.is_active() && b.is_active()),
        }
    }

    /// Replace the compatibility rule consulted by [`Self::can_connect`]
    pub fn with_compatibility<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Node, &Node) -> bool + Send + Sync + 'static,
    {
        self.compatibility = Arc::new(rule);
        self
    }

    /// Whether `source -> target` may be connected right now
    ///
    /// Fails only when either note is missing. Every other obstacle (self
    /// reference, existing edge, fan-out or edge limit, incompatibility)
    /// yields `false`.
    pub fn can_connect(&self, graph: &Graph, source_id: &NodeId, target_id: &NodeId) -> Result<bool> {
        let source = graph.node(source_id).ok_or(Error::NodeNotFound(*source_id))?;
        let target = graph.node(target_id).ok_or(Error::NodeNotFound(*target_id))?;

        let limits = graph.limits();
        let eligible = source_id != target_id
            && !graph.are_connected(source_id, target_id)
            && graph.connection_count(source_id) < limits.max_connections_per_node
            && graph.edge_count() < limits.max_edges_per_graph
            && (self.compatibility)(source, target);
        Ok(eligible)
    }

    /// Weighted similarity of two notes in `[0, 1]`
    ///
    /// Blends keyword overlap, tag overlap, spatial proximity and matching
    /// metadata, normalised by the total weight of the dimensions that carry
    /// information. Keywords, tags and metadata are left out when both notes
    /// have none; spatial proximity always counts.
    pub fn calculate_similarity(&self, a: &Node, b: &Node) -> f64 {
        let dimensions = [
            (CONTENT_WEIGHT, set_jaccard(&self.keywords(a), &self.keywords(b))),
            (TAG_WEIGHT, set_jaccard(&lower_tags(a), &lower_tags(b))),
            (SPATIAL_WEIGHT, Some(spatial_similarity(a, b))),
            (METADATA_WEIGHT, metadata_similarity(&a.metadata, &b.metadata)),
        ];

        let (weighted, total) = dimensions
            .iter()
            .filter_map(|(weight, score)| score.map(|score| (weight * score, *weight)))
            .fold((0.0, 0.0), |(sum, total), (value, weight)| (sum + value, total + weight));
        (weighted / total).clamp(0.0, 1.0)
    }

    /// Unconnected notes at or above the graph's similarity threshold
    ///
    /// Sorted by similarity, highest first, then by node ID.
    pub fn suggest_connections(
        &self,
        graph: &Graph,
        node_id: &NodeId,
        limit: usize,
    ) -> Result<Vec<ConnectionSuggestion>> {
        let source = graph.node(node_id).ok_or(Error::NodeNotFound(*node_id))?;
        let threshold = graph.limits().min_similarity_threshold;

        let mut suggestions: Vec<ConnectionSuggestion> = graph
            .nodes()
            .filter(|candidate| candidate.id != *node_id && !graph.are_connected(node_id, &candidate.id))
            .filter_map(|candidate| {
                let similarity = self.calculate_similarity(source, candidate);
                (similarity >= threshold).then(|| ConnectionSuggestion {
                    node_id: candidate.id,
                    title: candidate.content.title.clone(),
                    similarity,
                    reason: suggestion_reason(source, candidate, similarity),
                })
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.node_id.cmp(&b.node_id))
        });
        suggestions.truncate(limit);

        debug!(node_id = %node_id, count = suggestions.len(), "Connection suggestions generated");
        Ok(suggestions)
    }

    /// Weight for a new edge: `0.6 * similarity + 0.4 * mean importance`
    pub fn determine_edge_weight(&self, a: &Node, b: &Node) -> f64 {
        let similarity = self.calculate_similarity(a, b);
        let importance = (importance(a) + importance(b)) / 2.0;
        (0.6 * similarity + 0.4 * importance).clamp(0.0, 1.0)
    }

    /// Structural checks on a single edge
    pub fn validate_edge(&self, edge: &Edge) -> Result<()> {
        edge.check()
    }

    fn keywords(&self, node: &Node) -> BTreeSet<String> {
        self.analyzer
            .extract_keywords(&node.content.full_text())
            .into_iter()
            .collect()
    }
}

impl SimilarityScorer for NodeRelationshipService {
    fn score(&self, a: &Node, b: &Node) -> f64 {
        self.calculate_similarity(a, b)
    }
}

/// Jaccard index, `None` when neither set has entries
fn set_jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    if a.is_empty() && b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count();
    Some(intersection as f64 / (a.len() + b.len() - intersection) as f64)
}

fn lower_tags(node: &Node) -> BTreeSet<String> {
    node.tags.iter().map(|t| t.to_lowercase()).collect()
}

fn spatial_similarity(a: &Node, b: &Node) -> f64 {
    let distance = a.position.distance_to(&b.position);
    if !distance.is_finite() || distance > MAX_SPATIAL_DISTANCE {
        return 0.0;
    }
    (-distance / SPATIAL_DECAY).exp()
}

/// Share of keys with equal values, `None` when neither map has entries
fn metadata_similarity(
    a: &BTreeMap<String, serde_json::Value>,
    b: &BTreeMap<String, serde_json::Value>,
) -> Option<f64> {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    if keys.is_empty() {
        return None;
    }
    let matching = keys
        .iter()
        .filter(|key| matches!((a.get(**key), b.get(**key)), (Some(x), Some(y)) if x == y))
        .count();
    Some(matching as f64 / keys.len() as f64)
}

/// Content length and tag count, each capped and weighted 0.5
fn importance(node: &Node) -> f64 {
    let length = (node.content.len() as f64 / 1000.0).min(1.0);
    let tags = (node.tags.len() as f64 / 10.0).min(1.0);
    0.5 * length + 0.5 * tags
}

fn suggestion_reason(source: &Node, candidate: &Node, similarity: f64) -> String {
    let mut parts = Vec::new();

    let candidate_tags = lower_tags(candidate);
    let shared: Vec<&str> = source
        .tags
        .iter()
        .filter(|tag| candidate_tags.contains(&tag.to_lowercase()))
        .map(String::as_str)
        .collect();
    if !shared.is_empty() {
        parts.push(format!("shared tags: {}", shared.join(", ")));
    }

    parts.push(
        if similarity >= 0.8 {
            "very similar content"
        } else if similarity >= 0.6 {
            "similar content"
        } else {
            "related content"
        }
        .to_string(),
    );

    if source.position.distance_to(&candidate.position) < SPATIAL_DECAY {
        parts.push("close in space".to_string());
    }

    parts.join("; ")
}
