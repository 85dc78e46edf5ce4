//! Domain events for the knowledge graph
//!
//! Events recorded by the graph aggregate and by the notes it owns. They are
//! buffered on the emitting instance until the caller drains them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::DomainEvent;

use super::edge::EdgeType;
use super::ids::{EdgeId, GraphId, NodeId, UserId};

/// Schema version carried by every graph event
pub const GRAPH_EVENT_SCHEMA_VERSION: u32 = 1;

/// Events that can occur in a knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum GraphEvent {
    /// A new graph was created
    #[serde(rename = "graph.created")]
    GraphCreated {
        graph_id: GraphId,
        user_id: UserId,
        name: String,
        timestamp: DateTime<Utc>,
    },
    /// Graph details or settings changed
    #[serde(rename = "graph.updated")]
    GraphUpdated {
        graph_id: GraphId,
        changes: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// A note was added to the graph
    #[serde(rename = "graph.node_added")]
    NodeAddedToGraph {
        graph_id: GraphId,
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    /// A note was removed, along with the edges touching it
    #[serde(rename = "graph.node_removed")]
    NodeRemovedFromGraph {
        graph_id: GraphId,
        node_id: NodeId,
        removed_edges: usize,
        timestamp: DateTime<Utc>,
    },
    /// Two notes were connected
    #[serde(rename = "graph.nodes_connected")]
    NodesConnected {
        graph_id: GraphId,
        edge_id: EdgeId,
        source_id: NodeId,
        target_id: NodeId,
        edge_type: EdgeType,
        timestamp: DateTime<Utc>,
    },
    /// An edge between two notes was removed
    #[serde(rename = "graph.nodes_disconnected")]
    NodesDisconnected {
        graph_id: GraphId,
        source_id: NodeId,
        target_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    /// A note was created
    #[serde(rename = "node.created")]
    NodeCreated {
        node_id: NodeId,
        user_id: UserId,
        title: String,
        timestamp: DateTime<Utc>,
    },
    /// A note was archived
    #[serde(rename = "node.archived")]
    NodeArchived {
        node_id: NodeId,
        timestamp: DateTime<Utc>,
    },
    /// A note recorded an outgoing connection
    #[serde(rename = "node.connected")]
    NodeConnected {
        node_id: NodeId,
        target_id: NodeId,
        edge_type: EdgeType,
        timestamp: DateTime<Utc>,
    },
    /// A note dropped an outgoing connection
    #[serde(rename = "node.disconnected")]
    NodeDisconnected {
        node_id: NodeId,
        target_id: NodeId,
        timestamp: DateTime<Utc>,
    },
}

impl GraphEvent {
    /// Get the event type name
    pub fn event_type_name(&self) -> &'static str {
        match self {
            Self::GraphCreated { .. } => "graph.created",
            Self::GraphUpdated { .. } => "graph.updated",
            Self::NodeAddedToGraph { .. } => "graph.node_added",
            Self::NodeRemovedFromGraph { .. } => "graph.node_removed",
            Self::NodesConnected { .. } => "graph.nodes_connected",
            Self::NodesDisconnected { .. } => "graph.nodes_disconnected",
            Self::NodeCreated { .. } => "node.created",
            Self::NodeArchived { .. } => "node.archived",
            Self::NodeConnected { .. } => "node.connected",
            Self::NodeDisconnected { .. } => "node.disconnected",
        }
    }

    /// Get the timestamp of the event
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::GraphCreated { timestamp, .. }
            | Self::GraphUpdated { timestamp, .. }
            | Self::NodeAddedToGraph { timestamp, .. }
            | Self::NodeRemovedFromGraph { timestamp, .. }
            | Self::NodesConnected { timestamp, .. }
            | Self::NodesDisconnected { timestamp, .. }
            | Self::NodeCreated { timestamp, .. }
            | Self::NodeArchived { timestamp, .. }
            | Self::NodeConnected { timestamp, .. }
            | Self::NodeDisconnected { timestamp, .. } => *timestamp,
        }
    }

    /// Get the ID of the aggregate that emitted this event
    pub fn aggregate_uuid(&self) -> Uuid {
        match self {
            Self::GraphCreated { graph_id, .. }
            | Self::GraphUpdated { graph_id, .. }
            | Self::NodeAddedToGraph { graph_id, .. }
            | Self::NodeRemovedFromGraph { graph_id, .. }
            | Self::NodesConnected { graph_id, .. }
            | Self::NodesDisconnected { graph_id, .. } => graph_id.as_uuid(),
            Self::NodeCreated { node_id, .. }
            | Self::NodeArchived { node_id, .. }
            | Self::NodeConnected { node_id, .. }
            | Self::NodeDisconnected { node_id, .. } => node_id.as_uuid(),
        }
    }

    pub(crate) fn graph_created(graph_id: GraphId, user_id: UserId, name: impl Into<String>) -> Self {
        Self::GraphCreated {
            graph_id,
            user_id,
            name: name.into(),
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn node_added(graph_id: GraphId, node_id: NodeId) -> Self {
        Self::NodeAddedToGraph {
            graph_id,
            node_id,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn node_removed(graph_id: GraphId, node_id: NodeId, removed_edges: usize) -> Self {
        Self::NodeRemovedFromGraph {
            graph_id,
            node_id,
            removed_edges,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn nodes_connected(
        graph_id: GraphId,
        edge_id: EdgeId,
        source_id: NodeId,
        target_id: NodeId,
        edge_type: EdgeType,
    ) -> Self {
        Self::NodesConnected {
            graph_id,
            edge_id,
            source_id,
            target_id,
            edge_type,
            timestamp: Utc::now(),
        }
    }
}

impl DomainEvent for GraphEvent {
    fn event_type(&self) -> &str {
        self.event_type_name()
    }

    fn aggregate_id(&self) -> Uuid {
        self.aggregate_uuid()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.occurred_at()
    }

    fn schema_version(&self) -> u32 {
        GRAPH_EVENT_SCHEMA_VERSION
    }

    fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_created_event() {
        let graph_id = GraphId::new();
        let event = GraphEvent::graph_created(graph_id, UserId::new("u1").unwrap(), "Notes");

        assert_eq!(event.event_type(), "graph.created");
        assert_eq!(event.aggregate_id(), graph_id.as_uuid());
        assert_eq!(event.schema_version(), GRAPH_EVENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_payload_is_tagged_with_event_type() {
        let (source, target) = (NodeId::new(), NodeId::new());
        let event = GraphEvent::nodes_connected(
            GraphId::new(),
            EdgeId::new(),
            source,
            target,
            EdgeType::Reference,
        );

        let payload = event.payload();
        assert_eq!(payload["event_type"], "graph.nodes_connected");
        assert_eq!(payload["edge_type"], "reference");
        assert_eq!(payload["source_id"], source.to_string());
    }

    #[test]
    fn test_node_event_aggregate_is_node() {
        let node_id = NodeId::new();
        let event = GraphEvent::NodeArchived {
            node_id,
            timestamp: Utc::now(),
        };

        assert_eq!(event.aggregate_id(), node_id.as_uuid());
        assert_eq!(event.event_type(), "node.archived");
    }
}
