//! Connection rules and suggestions between notes

mod service;

pub use service::{
    CONTENT_WEIGHT, ConnectionSuggestion, METADATA_WEIGHT, NodeRelationshipService, SPATIAL_WEIGHT,
    TAG_WEIGHT,
};
