//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::discovery::DiscoveryConfig;
use crate::domain::similarity::{SimilarityConfig, SimilarityMetric};
use crate::domain::validation::NodeBounds;

/// Notegraph configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphLimits,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub validation: NodeBounds,
}

/// Limits and defaults enforced by every graph aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphLimits {
    pub max_nodes_per_graph: usize,
    pub max_edges_per_graph: usize,
    pub max_connections_per_node: usize,
    pub max_tags_per_node: usize,
    pub max_bulk_operation_size: usize,
    pub min_similarity_threshold: f64,
    pub default_graph_name: String,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self {
            max_nodes_per_graph: 10_000,
            max_edges_per_graph: 50_000,
            max_connections_per_node: 100,
            max_tags_per_node: 20,
            max_bulk_operation_size: 100,
            min_similarity_threshold: 0.3,
            default_graph_name: "My Knowledge Graph".to_string(),
        }
    }
}

impl GraphLimits {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_nodes_per_graph == 0 || self.max_edges_per_graph == 0 {
            return Err(anyhow!("Graph node and edge limits must be positive"));
        }
        if self.max_connections_per_node == 0 {
            return Err(anyhow!("max_connections_per_node must be positive"));
        }
        if !(0.0..=1.0).contains(&self.min_similarity_threshold) {
            return Err(anyhow!("min_similarity_threshold must be between 0.0 and 1.0"));
        }
        if self.default_graph_name.trim().is_empty() {
            return Err(anyhow!("default_graph_name cannot be empty"));
        }
        Ok(())
    }
}

const CONFIG_KEYS: &[&str] = &[
    "graph.max_nodes_per_graph",
    "graph.max_edges_per_graph",
    "graph.max_connections_per_node",
    "graph.max_tags_per_node",
    "graph.max_bulk_operation_size",
    "graph.min_similarity_threshold",
    "graph.default_graph_name",
    "similarity.metric",
    "similarity.keyword_weight",
    "similarity.tag_weight",
    "discovery.strong_edge_threshold",
    "discovery.min_similarity",
    "discovery.consider_bidirectional",
    "discovery.max_edges_per_node",
    "validation.max_title_length",
    "validation.max_body_length",
    "validation.max_tag_length",
    "validation.max_coordinate",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("NOTEGRAPH_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("notegraph")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, or defaults if absent
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.graph.validate()?;

        let weights = self.similarity.keyword_weight + self.similarity.tag_weight;
        if self.similarity.keyword_weight < 0.0 || self.similarity.tag_weight < 0.0 || weights <= 0.0 {
            return Err(anyhow!("Similarity weights must be non-negative and not both zero"));
        }

        let discovery = &self.discovery;
        if !(0.0..=1.0).contains(&discovery.min_similarity)
            || !(0.0..=1.0).contains(&discovery.strong_edge_threshold)
        {
            return Err(anyhow!("Discovery thresholds must be between 0.0 and 1.0"));
        }
        if discovery.min_similarity > discovery.strong_edge_threshold {
            return Err(anyhow!(
                "discovery.min_similarity cannot exceed discovery.strong_edge_threshold"
            ));
        }

        if !(self.validation.max_coordinate.is_finite() && self.validation.max_coordinate > 0.0) {
            return Err(anyhow!("validation.max_coordinate must be a positive number"));
        }

        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        let value = match key {
            "graph.max_nodes_per_graph" => self.graph.max_nodes_per_graph.to_string(),
            "graph.max_edges_per_graph" => self.graph.max_edges_per_graph.to_string(),
            "graph.max_connections_per_node" => self.graph.max_connections_per_node.to_string(),
            "graph.max_tags_per_node" => self.graph.max_tags_per_node.to_string(),
            "graph.max_bulk_operation_size" => self.graph.max_bulk_operation_size.to_string(),
            "graph.min_similarity_threshold" => self.graph.min_similarity_threshold.to_string(),
            "graph.default_graph_name" => self.graph.default_graph_name.clone(),

            "similarity.metric" => self.similarity.metric.as_str().to_string(),
            "similarity.keyword_weight" => self.similarity.keyword_weight.to_string(),
            "similarity.tag_weight" => self.similarity.tag_weight.to_string(),

            "discovery.strong_edge_threshold" => self.discovery.strong_edge_threshold.to_string(),
            "discovery.min_similarity" => self.discovery.min_similarity.to_string(),
            "discovery.consider_bidirectional" => self.discovery.consider_bidirectional.to_string(),
            "discovery.max_edges_per_node" => self.discovery.max_edges_per_node.to_string(),

            "validation.max_title_length" => self.validation.max_title_length.to_string(),
            "validation.max_body_length" => self.validation.max_body_length.to_string(),
            "validation.max_tag_length" => self.validation.max_tag_length.to_string(),
            "validation.max_coordinate" => self.validation.max_coordinate.to_string(),

            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a configuration value by key
    ///
    /// The whole configuration is re-validated; on failure the previous
    /// value is kept.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut updated = self.clone();
        match key {
            "graph.max_nodes_per_graph" => updated.graph.max_nodes_per_graph = parse(key, value)?,
            "graph.max_edges_per_graph" => updated.graph.max_edges_per_graph = parse(key, value)?,
            "graph.max_connections_per_node" => {
                updated.graph.max_connections_per_node = parse(key, value)?
            }
            "graph.max_tags_per_node" => updated.graph.max_tags_per_node = parse(key, value)?,
            "graph.max_bulk_operation_size" => {
                updated.graph.max_bulk_operation_size = parse(key, value)?
            }
            "graph.min_similarity_threshold" => {
                updated.graph.min_similarity_threshold = parse(key, value)?
            }
            "graph.default_graph_name" => updated.graph.default_graph_name = value.to_string(),

            "similarity.metric" => {
                updated.similarity.metric = SimilarityMetric::parse(value).ok_or_else(|| {
                    anyhow!(
                        "Invalid similarity metric: {}. Valid options: jaccard, cosine, average",
                        value
                    )
                })?
            }
            "similarity.keyword_weight" => updated.similarity.keyword_weight = parse(key, value)?,
            "similarity.tag_weight" => updated.similarity.tag_weight = parse(key, value)?,

            "discovery.strong_edge_threshold" => {
                updated.discovery.strong_edge_threshold = parse(key, value)?
            }
            "discovery.min_similarity" => updated.discovery.min_similarity = parse(key, value)?,
            "discovery.consider_bidirectional" => {
                updated.discovery.consider_bidirectional = parse(key, value)?
            }
            "discovery.max_edges_per_node" => {
                updated.discovery.max_edges_per_node = parse(key, value)?
            }

            "validation.max_title_length" => updated.validation.max_title_length = parse(key, value)?,
            "validation.max_body_length" => updated.validation.max_body_length = parse(key, value)?,
            "validation.max_tag_length" => updated.validation.max_tag_length = parse(key, value)?,
            "validation.max_coordinate" => updated.validation.max_coordinate = parse(key, value)?,

            _ => return Err(unknown_key(key)),
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        CONFIG_KEYS
            .iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    /// Reset configuration to defaults by removing the config file
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {}", key, value))
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "Unknown configuration key: {}. Use `notegraph config list` to see available keys.",
        key
    )
}
