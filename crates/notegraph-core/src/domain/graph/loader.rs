//! Loader traits for on-demand hydration
//!
//! The lazy aggregate holds identifiers only and resolves full notes and
//! edges through these collaborators. Errors they return are propagated
//! unchanged.

use async_trait::async_trait;

use crate::error::Result;

use super::edge::{Edge, EdgeKey};
use super::ids::NodeId;
use super::node::Node;

/// Loads notes by ID
#[async_trait]
pub trait NodeLoader: Send + Sync {
    /// Load one note; fails NotFound when it does not exist
    async fn load_node(&self, id: &NodeId) -> Result<Node>;

    /// Load several notes, in the order requested
    async fn load_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>>;
}

/// Loads edges by key or by endpoint
#[async_trait]
pub trait EdgeLoader: Send + Sync {
    /// Load one edge; fails NotFound when it does not exist
    async fn load_edge(&self, key: &EdgeKey) -> Result<Edge>;

    /// Load several edges, in the order requested
    async fn load_edges(&self, keys: &[EdgeKey]) -> Result<Vec<Edge>>;

    /// Load every edge with the note as source or target
    async fn load_edges_by_node_id(&self, id: &NodeId) -> Result<Vec<Edge>>;
}
