//! Knowledge graph domain
//!
//! Notes, edges, the graph aggregate and its storage strategies.

mod aggregate;
mod edge;
mod event;
mod ids;
mod lazy;
mod loader;
mod node;
mod snapshot;
mod storage;
mod traversal;

pub use aggregate::{Graph, GraphHeader, GraphMetadata, LazyGraph, SettingsUpdate, ViewSettings};
pub use edge::{EDGE_KEY_SEPARATOR, Edge, EdgeKey, EdgeOptions, EdgeType};
pub use event::{GRAPH_EVENT_SCHEMA_VERSION, GraphEvent};
pub use ids::{EdgeId, GraphId, NodeId, UserId};
pub use lazy::Page;
pub use loader::{EdgeLoader, NodeLoader};
pub use node::{ContentFormat, Node, NodeContent, NodeStatus, Position3D};
pub use snapshot::GraphSnapshot;
pub use storage::{GraphStorage, HydratedStorage, LazyStorage, StagedCount};
pub use traversal::Adjacency;
