//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations: snapshot
//! queries that require exactly one singleton node, and save cycles that
//! write to the store.

use crate::models::NodeType;
use thiserror::Error;

/// Service operation errors
///
/// A save either fully succeeds or rejects with one of these; there is no
/// partial-success reporting.
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// A space has no node of a kind that must exist exactly once
    #[error("Space has no {node_type} node")]
    SingletonMissing { node_type: NodeType },

    /// A space has more than one node of a kind that must exist exactly once
    #[error("Space has {count} {node_type} nodes, expected exactly one")]
    SingletonAmbiguous { node_type: NodeType, count: usize },

    /// Saved document does not have the nesting the reconciler expects
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A store, tag index, cleaner or registry call failed
    #[error("Store operation failed: {0}")]
    StoreFailure(#[from] anyhow::Error),
}

impl NodeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a missing singleton error
    pub fn singleton_missing(node_type: NodeType) -> Self {
        Self::SingletonMissing { node_type }
    }

    /// Create an ambiguous singleton error
    pub fn singleton_ambiguous(node_type: NodeType, count: usize) -> Self {
        Self::SingletonAmbiguous { node_type, count }
    }

    /// Create an invalid document error
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Create a serialization error
    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}

impl From<serde_json::Error> for NodeServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;

    #[test]
    fn test_error_display() {
        assert_eq!(
            NodeServiceError::node_not_found("n1").to_string(),
            "Node not found: n1"
        );
        assert_eq!(
            NodeServiceError::singleton_missing(NodeType::Trash).to_string(),
            "Space has no TRASH node"
        );
        assert_eq!(
            NodeServiceError::singleton_ambiguous(NodeType::Root, 2).to_string(),
            "Space has 2 ROOT nodes, expected exactly one"
        );
    }

    #[test]
    fn test_error_from_store_failure_keeps_source() {
        let err: NodeServiceError = anyhow::Error::from(StoreError::node_not_found("x")).into();

        match err {
            NodeServiceError::StoreFailure(inner) => {
                assert!(inner.downcast_ref::<StoreError>().is_some());
            }
            other => panic!("Expected StoreFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json")
            .expect_err("Should fail to parse");
        let err: NodeServiceError = json_error.into();

        assert!(matches!(err, NodeServiceError::SerializationError(_)));
    }
}
