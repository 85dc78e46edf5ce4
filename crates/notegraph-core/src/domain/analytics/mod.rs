//! Read-side graph analytics
//!
//! Stateless algorithms over a hydrated [`Graph`](crate::domain::graph::Graph):
//! paths, clusters, degree, neighbourhoods, orphans, centrality and summary
//! statistics.

mod service;

pub use service::{GraphAnalyticsService, GraphStatistics, NodeDegree};
