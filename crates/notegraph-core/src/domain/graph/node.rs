//! Notes (graph nodes)
//!
//! A note is owned by a user and carries text content, tags, a position in
//! 3D space and free-form metadata. Inside a hydrated graph it also keeps its
//! outgoing adjacency, which the aggregate updates through [`Node::connect_to`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::edge::{EdgeKey, EdgeType};
use super::event::GraphEvent;
use super::ids::{NodeId, UserId};

/// Format of a note body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    #[default]
    Text,
    Markdown,
    Html,
}

/// Textual content of a note
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeContent {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub format: ContentFormat,
}

impl NodeContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            format: ContentFormat::Text,
        }
    }

    /// Title and body joined for text analysis
    pub fn full_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.body)
        }
    }

    /// Combined character length of title and body
    pub fn len(&self) -> usize {
        self.title.chars().count() + self.body.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.body.trim().is_empty()
    }
}

/// Position of a note in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Lifecycle status of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Active,
    Archived,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A note in a knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for the note
    pub id: NodeId,
    /// Owner of the note
    pub user_id: UserId,
    /// Title, body and format
    pub content: NodeContent,
    /// Tags, unique ignoring case
    #[serde(default)]
    pub tags: Vec<String>,
    /// Position in the 3D view
    #[serde(default)]
    pub position: Position3D,
    /// Free-form attributes
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Lifecycle status
    #[serde(default)]
    pub status: NodeStatus,
    /// Incremented on every change
    #[serde(default = "initial_version")]
    pub version: u64,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// When the note was last updated
    pub updated_at: DateTime<Utc>,
    /// Outgoing adjacency; rebuilt from edges when a graph is hydrated
    #[serde(skip)]
    connections: BTreeMap<NodeId, EdgeType>,
    #[serde(skip)]
    events: Vec<GraphEvent>,
}

fn initial_version() -> u64 {
    1
}

impl Node {
    /// Create a new active note
    pub fn new(user_id: UserId, title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        let content = NodeContent::new(title, body);
        let id = NodeId::new();

        let events = vec![GraphEvent::NodeCreated {
            node_id: id,
            user_id: user_id.clone(),
            title: content.title.clone(),
            timestamp: now,
        }];

        Self {
            id,
            user_id,
            content,
            tags: Vec::new(),
            position: Position3D::default(),
            metadata: BTreeMap::new(),
            status: NodeStatus::Active,
            version: 1,
            created_at: now,
            updated_at: now,
            connections: BTreeMap::new(),
            events,
        }
    }

    /// Set the body format
    pub fn with_format(mut self, format: ContentFormat) -> Self {
        self.content.format = format;
        self
    }

    /// Replace the tag list (deduplicated ignoring case)
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.clear();
        for tag in tags {
            self.push_tag(tag.into());
        }
        self
    }

    /// Set the position
    pub fn with_position(mut self, position: Position3D) -> Self {
        self.position = position;
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    /// Outgoing connections recorded on this note
    pub fn connections(&self) -> &BTreeMap<NodeId, EdgeType> {
        &self.connections
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected_to(&self, target_id: &NodeId) -> bool {
        self.connections.contains_key(target_id)
    }

    /// Record an outgoing connection to another note
    ///
    /// Fails when the note is archived, the target is the note itself, the
    /// connection already exists, or `max_connections` is reached.
    pub fn connect_to(
        &mut self,
        target_id: NodeId,
        edge_type: EdgeType,
        max_connections: usize,
    ) -> Result<()> {
        if !self.is_active() {
            return Err(Error::invalid_state("node", self.status.as_str(), "connect"));
        }
        if target_id == self.id {
            return Err(Error::validation(
                "target_id",
                format!("node '{}' cannot be connected to itself", self.id),
            ));
        }
        if self.connections.contains_key(&target_id) {
            return Err(Error::DuplicateEdge(EdgeKey::new(self.id, target_id)));
        }
        if self.connections.len() >= max_connections {
            return Err(Error::QuotaExceeded {
                resource: "connections per node",
                limit: max_connections,
            });
        }

        self.connections.insert(target_id, edge_type);
        self.touch();
        self.events.push(GraphEvent::NodeConnected {
            node_id: self.id,
            target_id,
            edge_type,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// Record a stored connection without touching the version or emitting an event
    ///
    /// Used when rebuilding a note from persisted edges. Only a duplicate
    /// target is rejected.
    pub fn restore_connection(&mut self, target_id: NodeId, edge_type: EdgeType) -> Result<()> {
        if self.connections.contains_key(&target_id) {
            return Err(Error::DuplicateEdge(EdgeKey::new(self.id, target_id)));
        }
        self.connections.insert(target_id, edge_type);
        Ok(())
    }

    /// The persisted part of the note: adjacency and buffered events dropped
    pub(crate) fn into_stored(mut self) -> Self {
        self.connections.clear();
        self.events.clear();
        self
    }

    /// Drop an outgoing connection, returning whether it existed
    pub fn disconnect_from(&mut self, target_id: &NodeId) -> bool {
        if self.connections.remove(target_id).is_none() {
            return false;
        }
        self.touch();
        self.events.push(GraphEvent::NodeDisconnected {
            node_id: self.id,
            target_id: *target_id,
            timestamp: self.updated_at,
        });
        true
    }

    /// Archive the note; fails if it is already archived
    pub fn archive(&mut self) -> Result<()> {
        if self.status == NodeStatus::Archived {
            return Err(Error::invalid_state("node", self.status.as_str(), "archive"));
        }
        self.status = NodeStatus::Archived;
        self.touch();
        self.events.push(GraphEvent::NodeArchived {
            node_id: self.id,
            timestamp: self.updated_at,
        });
        Ok(())
    }

    /// Replace title and body
    pub fn update_content(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.content.title = title.into();
        self.content.body = body.into();
        self.touch();
    }

    /// Add a tag, returning false when an equal tag (ignoring case) exists
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let added = self.push_tag(tag.into());
        if added {
            self.touch();
        }
        added
    }

    /// Remove a tag (ignoring case), returning whether it was present
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| !t.eq_ignore_ascii_case(tag));
        let removed = self.tags.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Move the note to a new position
    pub fn move_to(&mut self, position: Position3D) {
        self.position = position;
        self.touch();
    }

    /// Events recorded since the last commit
    pub fn uncommitted_events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Drain the event buffer
    pub fn take_uncommitted_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn mark_events_as_committed(&mut self) {
        self.events.clear();
    }

    fn push_tag(&mut self, tag: String) -> bool {
        let tag = tag.trim().to_string();
        if tag.is_empty() || self.tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
