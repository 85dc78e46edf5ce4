//! Candidate generation, classification and application of discovered edges

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::graph::{Edge, EdgeKey, EdgeOptions, EdgeType, Graph, Node, NodeId};
use crate::domain::similarity::{SimilarityCalculator, SimilarityScorer};
use crate::error::Result;

/// Thresholds used by [`EdgeDiscoveryService`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Similarity at or above which a candidate is `strong`
    pub strong_edge_threshold: f64,
    /// Candidates below this similarity are dropped
    pub min_similarity: f64,
    /// Also propose the reverse direction for strong candidates
    pub consider_bidirectional: bool,
    /// Cap on candidates per source note when filtering
    pub max_edges_per_node: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strong_edge_threshold: 0.7,
            min_similarity: 0.3,
            consider_bidirectional: true,
            max_edges_per_node: 10,
        }
    }
}

/// A proposed edge and the similarity behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeCandidate {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub edge_type: EdgeType,
    pub similarity: f64,
}

impl EdgeCandidate {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source_id, self.target_id)
    }
}

/// Generates, classifies, ranks and filters candidate edges
#[derive(Clone)]
pub struct EdgeDiscoveryService {
    config: DiscoveryConfig,
    scorer: Arc<dyn SimilarityScorer>,
}

impl Default for EdgeDiscoveryService {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}

impl EdgeDiscoveryService {
    /// Service scoring with the default [`SimilarityCalculator`]
    pub fn new(config: DiscoveryConfig) -> Self {
        Self::with_scorer(config, Arc::new(SimilarityCalculator::default()))
    }

    pub fn with_scorer(config: DiscoveryConfig, scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Candidate edges from `node` to every other note of the graph
    ///
    /// The note need not be part of the graph yet. Nothing is proposed
    /// unless the graph, counting the note, holds more than one note.
    /// Results follow ascending target ID; reverse candidates directly
    /// follow their forward candidate.
    pub fn discover_potential_edges(&self, node: &Node, graph: &Graph) -> Vec<EdgeCandidate> {
        let total = graph.node_count() + usize::from(!graph.contains_node(&node.id));
        if total <= 1 {
            return Vec::new();
        }

        let others: Vec<&Node> = graph.nodes().filter(|other| other.id != node.id).collect();
        let scores = self.scorer.score_batch(node, &others);

        let mut candidates = Vec::new();
        for (other, similarity) in others.into_iter().zip(scores) {
            if similarity < self.config.min_similarity {
                continue;
            }

            let edge_type = self.classify_edge_type(similarity);
            candidates.push(EdgeCandidate {
                source_id: node.id,
                target_id: other.id,
                edge_type,
                similarity,
            });
            if edge_type == EdgeType::Strong && self.config.consider_bidirectional {
                candidates.push(EdgeCandidate {
                    source_id: other.id,
                    target_id: node.id,
                    edge_type,
                    similarity,
                });
            }
        }

        debug!(node_id = %node.id, candidates = candidates.len(), "Potential edges discovered");
        candidates
    }

    /// Stable sort by similarity, highest first, then by type priority
    pub fn rank_edges(&self, mut candidates: Vec<EdgeCandidate>) -> Vec<EdgeCandidate> {
        candidates.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| b.edge_type.priority().cmp(&a.edge_type.priority()))
        });
        candidates
    }

    /// Drop candidates below `min_similarity` and keep at most `max_edges`
    /// per source note, preserving input order
    pub fn filter_edges(
        &self,
        candidates: Vec<EdgeCandidate>,
        max_edges: usize,
        min_similarity: f64,
    ) -> Vec<EdgeCandidate> {
        let mut per_source: BTreeMap<NodeId, usize> = BTreeMap::new();
        candidates
            .into_iter()
            .filter(|candidate| candidate.similarity >= min_similarity)
            .filter(|candidate| {
                let count = per_source.entry(candidate.source_id).or_default();
                if *count >= max_edges {
                    return false;
                }
                *count += 1;
                true
            })
            .collect()
    }

    /// `strong` at or above the strong threshold, `weak` below it
    pub fn classify_edge_type(&self, similarity: f64) -> EdgeType {
        if similarity >= self.config.strong_edge_threshold {
            EdgeType::Strong
        } else {
            EdgeType::Weak
        }
    }

    /// Discover, rank and filter with the configured limits
    pub fn suggest_edges(&self, node: &Node, graph: &Graph) -> Vec<EdgeCandidate> {
        let ranked = self.rank_edges(self.discover_potential_edges(node, graph));
        self.filter_edges(ranked, self.config.max_edges_per_node, self.config.min_similarity)
    }

    /// Connect the graph along the candidates, in order
    ///
    /// Candidates whose edge already exists, or whose source has reached
    /// its connection limit, are skipped. Each edge takes the candidate's
    /// similarity as weight. Stops at the first other failure; edges
    /// applied before it remain.
    pub fn apply_candidates(&self, graph: &mut Graph, candidates: &[EdgeCandidate]) -> Result<Vec<Edge>> {
        let mut applied = Vec::new();
        let max_connections = graph.limits().max_connections_per_node;

        for candidate in candidates {
            let key = candidate.key();
            if graph.contains_edge(&key) {
                debug!(edge = %key, "Skipping existing edge");
                continue;
            }
            if graph.connection_count(&candidate.source_id) >= max_connections {
                warn!(edge = %key, limit = max_connections, "Skipping candidate, source at connection limit");
                continue;
            }

            let options = EdgeOptions::new(candidate.edge_type)
                .with_weight(candidate.similarity.clamp(0.0, 1.0))
                .with_metadata("similarity", serde_json::json!(candidate.similarity))
                .with_metadata("discovered", serde_json::json!(true));
            applied.push(graph.connect_nodes_with(candidate.source_id, candidate.target_id, options)?);
        }

        info!(graph_id = %graph.id(), applied = applied.len(), "Discovered edges applied");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::GraphLimits;
    use crate::domain::graph::UserId;

    fn candidate(source: NodeId, edge_type: EdgeType, similarity: f64) -> EdgeCandidate {
        EdgeCandidate {
            source_id: source,
            target_id: NodeId::new(),
            edge_type,
            similarity,
        }
    }

    #[test]
    fn test_classify_edge_type() {
        let service = EdgeDiscoveryService::default();

        assert_eq!(service.classify_edge_type(0.7), EdgeType::Strong);
        assert_eq!(service.classify_edge_type(0.69), EdgeType::Weak);
    }

    #[test]
    fn test_rank_edges_breaks_ties_by_priority() {
        let service = EdgeDiscoveryService::default();
        let source = NodeId::new();
        let ranked = service.rank_edges(vec![
            candidate(source, EdgeType::Normal, 0.5),
            candidate(source, EdgeType::Weak, 0.5),
            candidate(source, EdgeType::Strong, 0.9),
            candidate(source, EdgeType::Reference, 0.5),
        ]);

        let types: Vec<EdgeType> = ranked.iter().map(|c| c.edge_type).collect();
        assert_eq!(
            types,
            vec![EdgeType::Strong, EdgeType::Weak, EdgeType::Reference, EdgeType::Normal]
        );
    }

    #[test]
    fn test_filter_edges_caps_per_source() {
        let service = EdgeDiscoveryService::default();
        let (a, b) = (NodeId::new(), NodeId::new());
        let input = vec![
            candidate(a, EdgeType::Weak, 0.9),
            candidate(a, EdgeType::Weak, 0.2),
            candidate(b, EdgeType::Weak, 0.8),
            candidate(a, EdgeType::Weak, 0.7),
            candidate(a, EdgeType::Weak, 0.6),
        ];

        let kept = service.filter_edges(input, 2, 0.3);

        let similarities: Vec<f64> = kept.iter().map(|c| c.similarity).collect();
        assert_eq!(similarities, vec![0.9, 0.8, 0.7]);
    }

    #[test]
    fn test_discover_requires_more_than_one_node() {
        let service = EdgeDiscoveryService::default();
        let mut graph: Graph = Graph::new("u1", "g", "", GraphLimits::default()).unwrap();
        let node = Node::new(UserId::new("u1").unwrap(), "Graph theory", "");

        assert!(service.discover_potential_edges(&node, &graph).is_empty());

        graph.add_node(node.clone()).unwrap();
        assert!(service.discover_potential_edges(&node, &graph).is_empty());
    }

    #[derive(Default)]
    struct CountingScorer {
        batches: AtomicUsize,
    }

    impl SimilarityScorer for CountingScorer {
        fn score(&self, _a: &Node, _b: &Node) -> f64 {
            panic!("discovery scores in batches");
        }

        fn score_batch(&self, _node: &Node, candidates: &[&Node]) -> Vec<f64> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            candidates.iter().map(|_| 0.5).collect()
        }
    }

    #[test]
    fn test_discover_scores_candidates_in_one_batch() {
        let scorer = Arc::new(CountingScorer::default());
        let service = EdgeDiscoveryService::with_scorer(DiscoveryConfig::default(), scorer.clone());
        let mut graph: Graph = Graph::new("u1", "g", "", GraphLimits::default()).unwrap();
        let user = UserId::new("u1").unwrap();
        for title in ["a", "b", "c"] {
            graph.add_node(Node::new(user.clone(), title, "")).unwrap();
        }
        let node = Node::new(user, "new", "");

        let candidates = service.discover_potential_edges(&node, &graph);

        assert_eq!(scorer.batches.load(Ordering::SeqCst), 1);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.edge_type == EdgeType::Weak));
    }

    #[test]
    fn test_apply_candidates_skips_existing() {
        let service = EdgeDiscoveryService::default();
        let mut graph: Graph = Graph::new("u1", "g", "", GraphLimits::default()).unwrap();
        let user = UserId::new("u1").unwrap();
        let (a, b) = (Node::new(user.clone(), "a", ""), Node::new(user, "b", ""));
        let (a_id, b_id) = (a.id, b.id);
        graph.add_node(a).unwrap();
        graph.add_node(b).unwrap();
        graph.connect_nodes(a_id, b_id, EdgeType::Normal).unwrap();

        let candidates = vec![
            EdgeCandidate {
                source_id: a_id,
                target_id: b_id,
                edge_type: EdgeType::Strong,
                similarity: 0.9,
            },
            EdgeCandidate {
                source_id: b_id,
                target_id: a_id,
                edge_type: EdgeType::Strong,
                similarity: 0.9,
            },
        ];
        let applied = service.apply_candidates(&mut graph, &candidates).unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].source_id, b_id);
        assert_eq!(applied[0].weight, 0.9);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.validate().is_ok());
    }
}
