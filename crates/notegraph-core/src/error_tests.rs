//! Error module tests

use crate::domain::graph::{EdgeKey, NodeId};
use crate::error::{Error, ErrorKind};

#[test]
fn test_validation_error() {
    let error = Error::validation("weight", "weight 1.5 is outside [0.0, 1.0]");
    assert_eq!(error.code(), "E001");
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert!(error.is_validation());
    assert!(error.to_string().contains("weight"));
}

#[test]
fn test_quota_and_invalid_state_are_validation() {
    let quota = Error::QuotaExceeded {
        resource: "nodes per graph",
        limit: 10,
    };
    assert_eq!(quota.code(), "E002");
    assert!(quota.is_validation());
    assert!(quota.to_string().contains("10"));

    let state = Error::invalid_state("node", "archived", "archive");
    assert_eq!(state.code(), "E003");
    assert!(state.is_validation());
    assert_eq!(state.to_string(), "Cannot archive node in 'archived' state");
}

#[test]
fn test_conflict_errors() {
    let (a, b) = (NodeId::new(), NodeId::new());
    let duplicate = Error::DuplicateEdge(EdgeKey::new(a, b));
    assert_eq!(duplicate.code(), "E101");
    assert!(duplicate.is_conflict());
    assert!(duplicate.to_string().contains(&format!("{}->{}", a, b)));

    let version = Error::VersionConflict {
        expected: 3,
        actual: 4,
    };
    assert_eq!(version.code(), "E102");
    assert_eq!(version.kind(), ErrorKind::Conflict);
}

#[test]
fn test_not_found_errors() {
    let (a, b) = (NodeId::new(), NodeId::new());
    let path = Error::PathNotFound { from: a, to: b };
    assert_eq!(path.code(), "E202");
    assert!(path.is_not_found());
    assert!(path.to_string().contains(&a.to_string()));

    assert!(Error::GraphNotFound("g1".to_string()).is_not_found());
}

#[test]
fn test_internal_errors() {
    let loader = Error::loader("connection reset");
    assert_eq!(loader.code(), "E900");
    assert_eq!(loader.kind(), ErrorKind::Internal);

    let serde_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = serde_error.into();
    assert_eq!(error.code(), "E901");
    assert!(!error.is_validation() && !error.is_conflict() && !error.is_not_found());
}
