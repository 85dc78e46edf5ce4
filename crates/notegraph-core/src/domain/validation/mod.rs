//! Edge specifications and graph validation passes

mod edge_spec;
mod service;

pub use edge_spec::{
    BidirectionalSpec, ConnectsAnySpec, EdgeTypeSpec, NotSelfLoopSpec, RequiredMetadataSpec,
    UniqueEdgeSpec, WeightRangeSpec,
};
pub use service::{GraphValidationService, NodeBounds};
