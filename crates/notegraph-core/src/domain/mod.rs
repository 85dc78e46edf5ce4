//! Domain layer
//!
//! Contains the core business logic and domain models.

pub mod analytics;
pub mod discovery;
pub mod events;
pub mod graph;
pub mod relationship;
pub mod similarity;
pub mod specification;
pub mod validation;
