//! Keyword and tag similarity between notes

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::graph::{Node, NodeId};

use super::text::TextAnalyzer;
use super::SimilarityScorer;

/// Set similarity measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Jaccard,
    Cosine,
    /// Mean of Jaccard and cosine
    Average,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jaccard => "jaccard",
            Self::Cosine => "cosine",
            Self::Average => "average",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "jaccard" => Some(Self::Jaccard),
            "cosine" => Some(Self::Cosine),
            "average" | "avg" => Some(Self::Average),
            _ => None,
        }
    }
}

/// Weights and metric used by [`SimilarityCalculator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub metric: SimilarityMetric,
    pub keyword_weight: f64,
    pub tag_weight: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::Jaccard,
            keyword_weight: 0.6,
            tag_weight: 0.4,
        }
    }
}

/// Scores notes by their keyword and tag sets
#[derive(Debug, Clone, Default)]
pub struct SimilarityCalculator {
    config: SimilarityConfig,
    analyzer: TextAnalyzer,
}

impl SimilarityCalculator {
    pub fn new(config: SimilarityConfig) -> Self {
        Self {
            config,
            analyzer: TextAnalyzer::new(),
        }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &TextAnalyzer {
        &self.analyzer
    }

    /// `|A ∩ B| / |A ∪ B|`; two empty sets are identical
    pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        let intersection = a.intersection(b).count();
        let union = a.len() + b.len() - intersection;
        intersection as f64 / union as f64
    }

    /// Cosine over binary term vectors: `|A ∩ B| / sqrt(|A| * |B|)`
    pub fn cosine(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let intersection = a.intersection(b).count();
        intersection as f64 / ((a.len() * b.len()) as f64).sqrt()
    }

    /// Similarity of two sets under the configured metric
    pub fn compare(&self, a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
        let score = match self.config.metric {
            SimilarityMetric::Jaccard => Self::jaccard(a, b),
            SimilarityMetric::Cosine => Self::cosine(a, b),
            SimilarityMetric::Average => (Self::jaccard(a, b) + Self::cosine(a, b)) / 2.0,
        };
        score.clamp(0.0, 1.0)
    }

    /// Keyword set of a note's title and body
    pub fn keyword_set(&self, node: &Node) -> BTreeSet<String> {
        self.analyzer
            .extract_keywords(&node.content.full_text())
            .into_iter()
            .collect()
    }

    /// Lowercased tag set of a note
    pub fn tag_set(node: &Node) -> BTreeSet<String> {
        node.tags.iter().map(|t| t.to_lowercase()).collect()
    }

    /// Weighted keyword and tag similarity in `[0, 1]`
    pub fn calculate(&self, a: &Node, b: &Node) -> f64 {
        self.combine(
            &self.keyword_set(a),
            &Self::tag_set(a),
            &self.keyword_set(b),
            &Self::tag_set(b),
        )
    }

    /// Score one note against many, extracting its keywords once
    ///
    /// The note itself is skipped when it appears among the candidates.
    pub fn batch_similarity<'a, I>(&self, node: &Node, candidates: I) -> Vec<(NodeId, f64)>
    where
        I: IntoIterator<Item = &'a Node>,
    {
        let others: Vec<&Node> = candidates
            .into_iter()
            .filter(|candidate| candidate.id != node.id)
            .collect();
        let scores = self.score_batch(node, &others);
        others.iter().map(|candidate| candidate.id).zip(scores).collect()
    }

    fn combine(
        &self,
        keywords_a: &BTreeSet<String>,
        tags_a: &BTreeSet<String>,
        keywords_b: &BTreeSet<String>,
        tags_b: &BTreeSet<String>,
    ) -> f64 {
        let total = self.config.keyword_weight + self.config.tag_weight;
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = self.config.keyword_weight * self.compare(keywords_a, keywords_b)
            + self.config.tag_weight * self.compare(tags_a, tags_b);
        (weighted / total).clamp(0.0, 1.0)
    }
}

impl SimilarityScorer for SimilarityCalculator {
    fn score(&self, a: &Node, b: &Node) -> f64 {
        self.calculate(a, b)
    }

    fn score_batch(&self, node: &Node, candidates: &[&Node]) -> Vec<f64> {
        let keywords = self.keyword_set(node);
        let tags = Self::tag_set(node);

        candidates
            .iter()
            .map(|candidate| {
                self.combine(
                    &keywords,
                    &tags,
                    &self.keyword_set(candidate),
                    &Self::tag_set(candidate),
                )
            })
            .collect()
    }
}
