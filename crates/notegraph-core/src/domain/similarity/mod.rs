//! Text analysis and note similarity

mod calculator;
mod text;

pub use calculator::{SimilarityCalculator, SimilarityConfig, SimilarityMetric};
pub use text::TextAnalyzer;

use super::graph::Node;

/// Pairwise note scoring used by suggestion and discovery
pub trait SimilarityScorer: Send + Sync {
    /// Similarity of two notes in `[0, 1]`
    fn score(&self, a: &Node, b: &Node) -> f64;

    /// Scores of `node` against each candidate, in candidate order
    fn score_batch(&self, node: &Node, candidates: &[&Node]) -> Vec<f64> {
        candidates.iter().map(|candidate| self.score(node, candidate)).collect()
    }
}
