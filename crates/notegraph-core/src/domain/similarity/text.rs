//! Keyword extraction from free text

use std::collections::{BTreeMap, HashSet};

/// Words ignored by keyword extraction
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "been", "being", "have", "has", "had", "does",
    "did", "will", "would", "could", "should", "may", "might", "must", "shall", "can", "not",
    "but", "with", "from", "into", "onto", "about", "through", "during", "before", "after",
    "above", "below", "between", "under", "over", "again", "further", "then", "once", "here",
    "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more", "most",
    "other", "some", "such", "nor", "only", "own", "same", "than", "too", "very", "just", "now",
    "because", "until", "while", "this", "that", "these", "those", "what", "which", "who",
    "whom", "our", "ours", "you", "your", "yours", "its", "they", "them", "their", "his", "her",
    "she", "him", "also", "yet", "out", "off",
];

/// Tokenizer and keyword extractor
#[derive(Debug, Clone)]
pub struct TextAnalyzer {
    stop_words: HashSet<&'static str>,
    min_length: usize,
}

impl Default for TextAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextAnalyzer {
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            min_length: 3,
        }
    }

    /// Lowercase words split on anything that is not alphanumeric
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Distinct keywords in order of first occurrence
    ///
    /// Keywords are tokens longer than two characters that are not stop words.
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keyword_tokens(text)
            .filter(|word| seen.insert(word.clone()))
            .collect()
    }

    /// Occurrence count of every keyword
    pub fn keyword_frequencies(&self, text: &str) -> BTreeMap<String, usize> {
        let mut frequencies = BTreeMap::new();
        for word in self.keyword_tokens(text) {
            *frequencies.entry(word).or_insert(0) += 1;
        }
        frequencies
    }

    /// The `n` most frequent keywords, ties broken alphabetically
    pub fn top_keywords(&self, text: &str, n: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self.keyword_frequencies(text).into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    fn keyword_tokens(&self, text: &str) -> impl Iterator<Item = String> + '_ {
        self.tokenize(text)
            .into_iter()
            .filter(|word| word.chars().count() >= self.min_length && !self.is_stop_word(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let analyzer = TextAnalyzer::new();
        assert_eq!(
            analyzer.tokenize("Rust's borrow-checker, v2!"),
            vec!["rust", "s", "borrow", "checker", "v2"]
        );
    }

    #[test]
    fn test_extract_keywords_filters_and_dedups() {
        let analyzer = TextAnalyzer::new();
        let keywords = analyzer.extract_keywords("The graph and the GRAPH of an index is fast");

        assert_eq!(keywords, vec!["graph", "index", "fast"]);
    }

    #[test]
    fn test_top_keywords() {
        let analyzer = TextAnalyzer::new();
        let top = analyzer.top_keywords("graph node graph edge node graph", 2);

        assert_eq!(top, vec![("graph".to_string(), 3), ("node".to_string(), 2)]);
    }

    #[test]
    fn test_empty_text() {
        let analyzer = TextAnalyzer::new();
        assert!(analyzer.extract_keywords("").is_empty());
        assert!(analyzer.keyword_frequencies("a an is").is_empty());
    }
}
