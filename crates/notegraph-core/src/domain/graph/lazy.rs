//! Lazy graph access
//!
//! A [`LazyGraph`] enforces the same invariants as the hydrated aggregate but
//! keeps only identifiers. Notes and edges are fetched through loaders on
//! demand. IDs are paged in ascending order, so a page is stable across
//! calls as long as the graph is not mutated in between.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::GraphLimits;
use crate::error::{Error, Result};

use super::aggregate::{Graph, GraphHeader, LazyGraph};
use super::edge::{Edge, EdgeKey};
use super::ids::NodeId;
use super::loader::{EdgeLoader, NodeLoader};
use super::node::Node;
use super::storage::{GraphStorage, HydratedStorage, LazyStorage};

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    fn map<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            offset: self.offset,
            limit: self.limit,
            total: self.total,
            has_more: self.has_more,
        }
    }
}

impl LazyGraph {
    /// Reconstruct a lazy graph from its header and persisted identifiers
    pub fn restore_ids(
        header: GraphHeader,
        node_ids: impl IntoIterator<Item = NodeId>,
        edge_keys: impl IntoIterator<Item = EdgeKey>,
        limits: GraphLimits,
    ) -> Self {
        Self::restore_with(header, LazyStorage::from_parts(node_ids, edge_keys), limits)
    }

    /// Denormalized count of outgoing edges for a note
    pub fn connectivity(&self, id: &NodeId) -> usize {
        self.storage().connection_count(id)
    }

    /// A page of note IDs in ascending order
    pub fn node_ids_page(&self, offset: usize, limit: usize) -> Page<NodeId> {
        let ids = self.storage().ids();
        let total = ids.len();
        let items: Vec<NodeId> = ids.iter().skip(offset).take(limit).copied().collect();
        let has_more = offset.saturating_add(items.len()) < total;

        Page {
            items,
            offset,
            limit,
            total,
            has_more,
        }
    }

    /// Fetch one note of this graph
    pub async fn fetch_node<L>(&self, loader: &L, id: &NodeId) -> Result<Node>
    where
        L: NodeLoader + ?Sized,
    {
        if !self.contains_node(id) {
            return Err(Error::NodeNotFound(*id));
        }
        loader.load_node(id).await
    }

    /// Fetch a page of notes in ascending ID order
    pub async fn fetch_nodes_page<L>(&self, loader: &L, offset: usize, limit: usize) -> Result<Page<Node>>
    where
        L: NodeLoader + ?Sized,
    {
        let page = self.node_ids_page(offset, limit);
        let nodes = if page.items.is_empty() {
            Vec::new()
        } else {
            loader.load_nodes(&page.items).await?
        };

        debug!(graph_id = %self.id(), offset, count = nodes.len(), "Fetched node page");
        Ok(page.map(nodes))
    }

    /// Fetch one edge of this graph
    pub async fn fetch_edge<L>(&self, loader: &L, key: &EdgeKey) -> Result<Edge>
    where
        L: EdgeLoader + ?Sized,
    {
        if !self.contains_edge(key) {
            return Err(Error::EdgeNotFound(key.to_string()));
        }
        loader.load_edge(key).await
    }

    /// Fetch every edge of this graph touching a note
    ///
    /// Edges the loader returns that are not part of this graph are dropped.
    pub async fn fetch_edges_for_node<L>(&self, loader: &L, id: &NodeId) -> Result<Vec<Edge>>
    where
        L: EdgeLoader + ?Sized,
    {
        if !self.contains_node(id) {
            return Err(Error::NodeNotFound(*id));
        }
        let edges = loader.load_edges_by_node_id(id).await?;
        Ok(edges
            .into_iter()
            .filter(|edge| self.contains_edge(&edge.key()))
            .collect())
    }

    /// Load every note and edge into a hydrated aggregate
    ///
    /// The result carries this graph's header and version and is validated
    /// before it is returned.
    pub async fn hydrate<N, E>(&self, node_loader: &N, edge_loader: &E) -> Result<Graph>
    where
        N: NodeLoader + ?Sized,
        E: EdgeLoader + ?Sized,
    {
        let mut graph: Graph = Graph::restore(self.header(), self.limits().clone());

        let ids = self.node_ids();
        if !ids.is_empty() {
            for node in node_loader.load_nodes(&ids).await? {
                graph.load_node(node);
            }
        }

        let keys = self.edge_keys();
        if !keys.is_empty() {
            for edge in edge_loader.load_edges(&keys).await? {
                graph.load_edge(edge)?;
            }
        }

        graph.validate()?;
        info!(
            graph_id = %graph.id(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Graph hydrated"
        );
        Ok(graph)
    }
}

impl Graph<HydratedStorage> {
    /// Identifier-only view of this graph with the same header and limits
    pub fn to_lazy(&self) -> LazyGraph {
        LazyGraph::restore_ids(
            self.header(),
            self.node_ids(),
            self.edge_keys(),
            self.limits().clone(),
        )
    }
}
