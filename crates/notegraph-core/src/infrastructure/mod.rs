//! Infrastructure layer
//!
//! Implementations of the domain's persistence seams.

pub mod memory;

pub use memory::InMemoryGraphStore;
