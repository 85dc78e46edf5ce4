//! Notegraph Core Library
//!
//! This crate provides the core functionality for Notegraph, including:
//! - The knowledge graph aggregate (hydrated and lazy storage)
//! - Graph analytics (paths, clusters, degree, centrality)
//! - Note similarity, connection suggestions and edge discovery
//! - Edge specifications and graph validation
//! - Domain events and in-memory persistence
//! - Configuration management

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Error, ErrorKind, Result};

#[cfg(test)]
mod error_tests;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, GraphLimits};
    pub use crate::domain::analytics::{GraphAnalyticsService, GraphStatistics, NodeDegree};
    pub use crate::domain::discovery::{DiscoveryConfig, EdgeCandidate, EdgeDiscoveryService};
    pub use crate::domain::events::{
        DomainEvent, EventPublisher, InMemoryEventStore, publish_uncommitted,
    };
    pub use crate::domain::graph::{
        Edge, EdgeKey, EdgeLoader, EdgeOptions, EdgeType, Graph, GraphEvent, GraphSnapshot,
        LazyGraph, Node, NodeId, NodeLoader, Position3D, UserId,
    };
    pub use crate::domain::relationship::{ConnectionSuggestion, NodeRelationshipService};
    pub use crate::domain::similarity::{
        SimilarityCalculator, SimilarityConfig, SimilarityScorer, TextAnalyzer,
    };
    pub use crate::domain::specification::Specification;
    pub use crate::domain::validation::{GraphValidationService, NodeBounds};
    pub use crate::error::{Error, Result};
    pub use crate::infrastructure::InMemoryGraphStore;
}
