//! Store Error Types
//!
//! Errors raised by store implementations. They travel through the
//! `anyhow::Result` boundary of the store traits, so callers that care can
//! `downcast_ref::<StoreError>()`.

use thiserror::Error;

/// Node store operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Update targeted a record that does not exist
    #[error("Node not found in store: {id}")]
    NodeNotFound { id: String },

    /// Create used an id that is already taken
    #[error("Node id already exists: {id}")]
    DuplicateId { id: String },

    /// Injected or backend-reported write failure
    #[error("Store write rejected: {context}")]
    WriteRejected { context: String },
}

impl StoreError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a duplicate id error
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Create a write rejected error
    pub fn write_rejected(context: impl Into<String>) -> Self {
        Self::WriteRejected {
            context: context.into(),
        }
    }
}
