//! Domain event infrastructure
//!
//! Provides base traits and types for domain events emitted by aggregates.
//! Aggregates buffer events in memory; delivery to a bus happens through an
//! [`EventPublisher`] supplied by the caller.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::graph::{Graph, GraphStorage};
use crate::error::Result;

/// Base trait for all domain events
///
/// Domain events represent something that happened in the domain.
/// They are immutable facts about the past.
pub trait DomainEvent: Send + Sync {
    /// Get the event type as a string (e.g. `graph.node_added`)
    fn event_type(&self) -> &str;

    /// Get the aggregate ID this event belongs to
    fn aggregate_id(&self) -> Uuid;

    /// Get the timestamp when this event occurred
    fn timestamp(&self) -> DateTime<Utc>;

    /// Version of the event payload schema
    fn schema_version(&self) -> u32 {
        1
    }

    /// Event payload as JSON
    fn payload(&self) -> serde_json::Value;
}

/// Publisher trait for emitting domain events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a domain event
    async fn publish(&self, event: &dyn DomainEvent) -> Result<()>;

    /// Publish multiple events in order
    async fn publish_all(&self, events: &[&dyn DomainEvent]) -> Result<()> {
        for event in events {
            self.publish(*event).await?;
        }
        Ok(())
    }
}

/// A stored event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event ID
    pub id: Uuid,
    /// Aggregate ID this event belongs to
    pub aggregate_id: Uuid,
    /// Event type string
    pub event_type: String,
    /// Payload schema version
    pub schema_version: u32,
    /// Event data as JSON
    pub data: serde_json::Value,
    /// When the event occurred
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Create from a domain event
    pub fn from_event(event: &dyn DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            schema_version: event.schema_version(),
            data: event.payload(),
            created_at: event.timestamp(),
        }
    }
}

impl DomainEvent for StoredEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn payload(&self) -> serde_json::Value {
        self.data.clone()
    }
}

/// A simple in-memory event store for recording published events
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    /// Create a new in-memory event store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an event
    pub fn store(&self, event: StoredEvent) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    /// Get events for an aggregate
    pub fn events_for(&self, aggregate_id: Uuid) -> Vec<StoredEvent> {
        self.snapshot()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    /// Get events by type
    pub fn events_by_type(&self, event_type: &str) -> Vec<StoredEvent> {
        self.snapshot()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get all events
    pub fn all_events(&self) -> Vec<StoredEvent> {
        self.snapshot()
    }

    /// Clear all events
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn snapshot(&self) -> Vec<StoredEvent> {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventStore {
    async fn publish(&self, event: &dyn DomainEvent) -> Result<()> {
        self.store(StoredEvent::from_event(event));
        Ok(())
    }
}

/// Publish a graph's pending events in order, then mark them committed
///
/// On a publish failure nothing is marked committed, so the caller may
/// retry; events published before the failure will be sent again.
pub async fn publish_uncommitted<S>(
    graph: &mut Graph<S>,
    publisher: &(dyn EventPublisher + '_),
) -> Result<usize>
where
    S: GraphStorage,
{
    let events = graph.pending_events();
    for event in &events {
        publisher.publish(event).await?;
    }
    graph.mark_events_as_committed();
    debug!(graph_id = %graph.id(), count = events.len(), "Graph events published");
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestEvent {
        id: Uuid,
        event_type: String,
        timestamp: DateTime<Utc>,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &str {
            &self.event_type
        }

        fn aggregate_id(&self) -> Uuid {
            self.id
        }

        fn timestamp(&self) -> DateTime<Utc> {
            self.timestamp
        }

        fn payload(&self) -> serde_json::Value {
            serde_json::json!({ "id": self.id })
        }
    }

    fn test_event(id: Uuid, event_type: &str) -> TestEvent {
        TestEvent {
            id,
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_stored_event_from_domain_event() {
        let aggregate_id = Uuid::new_v4();
        let stored = StoredEvent::from_event(&test_event(aggregate_id, "test_event"));

        assert_eq!(stored.aggregate_id, aggregate_id);
        assert_eq!(stored.event_type, "test_event");
        assert_eq!(stored.schema_version, 1);
        assert_eq!(stored.data["id"], serde_json::json!(aggregate_id));
    }

    #[tokio::test]
    async fn test_in_memory_event_store() {
        let store = InMemoryEventStore::new();
        let aggregate_id = Uuid::new_v4();

        store.publish(&test_event(aggregate_id, "type_a")).await.unwrap();
        store.publish(&test_event(aggregate_id, "type_b")).await.unwrap();
        store.publish(&test_event(Uuid::new_v4(), "type_a")).await.unwrap();

        assert_eq!(store.events_for(aggregate_id).len(), 2);
        assert_eq!(store.events_by_type("type_a").len(), 2);
        assert_eq!(store.all_events().len(), 3);

        store.clear();
        assert!(store.all_events().is_empty());
    }

    #[tokio::test]
    async fn test_publish_all_keeps_order() {
        let store = InMemoryEventStore::new();
        let id = Uuid::new_v4();
        let first = test_event(id, "first");
        let second = test_event(id, "second");

        let events: [&dyn DomainEvent; 2] = [&first, &second];
        store.publish_all(&events).await.unwrap();

        let types: Vec<_> = store.all_events().into_iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_publish_uncommitted_drains_graph() {
        use crate::config::GraphLimits;
        use crate::domain::graph::{Node, UserId};

        let store = InMemoryEventStore::new();
        let mut graph: Graph = Graph::new("u1", "g", "", GraphLimits::default()).unwrap();
        graph
            .add_node(Node::new(UserId::new("u1").unwrap(), "note", ""))
            .unwrap();

        let published = publish_uncommitted(&mut graph, &store).await.unwrap();

        assert_eq!(published, 3);
        assert_eq!(store.events_by_type("graph.node_added").len(), 1);
        assert_eq!(store.events_for(graph.id().as_uuid()).len(), 2);
        assert!(graph.pending_events().is_empty());
    }
}
