//! Automatic edge discovery
//!
//! Scores a note against the rest of a graph and proposes strong or weak
//! edges, which can then be ranked, filtered and applied.

mod service;

pub use service::{DiscoveryConfig, EdgeCandidate, EdgeDiscoveryService};
