//! NodeStore Trait - Persistence Abstraction Layer
//!
//! This module defines the traits the reconciler needs from the outside
//! world's persistence: the flat node store, the tag index side-table, and
//! the orphan cleaner. Keeping them as traits lets embedders plug in any
//! key-value backend without touching reconciliation logic.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async; implementations may sit on a
//!    local database or a remote service
//! 2. **Owned Records**: `create_node` takes the record by value and returns
//!    the stored copy
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context
//! 4. **Per-call Atomicity**: Each call is applied atomically and independently;
//!    there are no cross-key transactions
//!
//! # Examples
//!
//! ```rust,no_run
//! use nodetree_core::db::{InMemoryStore, NodeStore};
//! use nodetree_core::models::{NodeType, RawNode};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn NodeStore> = Arc::new(InMemoryStore::new());
//!
//!     let root = RawNode::new("space-1", NodeType::Root);
//!     let created = store.create_node(root).await?;
//!     assert!(store.get_node(&created.id).await?.is_some());
//!
//!     Ok(())
//! }
//! ```

use crate::models::{NodeUpdate, RawNode};
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for node persistence operations
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage in async contexts where
/// futures may be moved between threads.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Get node by ID
    ///
    /// # Returns
    ///
    /// - `Ok(Some(node))` if node exists
    /// - `Ok(None)` if node doesn't exist (not an error)
    /// - `Err(_)` if the backend fails
    async fn get_node(&self, id: &str) -> Result<Option<RawNode>>;

    /// Create a new node record
    ///
    /// The record carries its caller-supplied id. Returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns error if the id already exists or the backend rejects the write.
    async fn create_node(&self, node: RawNode) -> Result<RawNode>;

    /// Merge `update` into the record and bump `updated_at`
    ///
    /// # Returns
    ///
    /// Updated node with all fields (not just changed fields)
    ///
    /// # Errors
    ///
    /// Returns error if the node doesn't exist or the backend rejects the write.
    async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<RawNode>;

    /// Fresh, complete snapshot of every record in a space
    async fn list_nodes_by_space_id(&self, space_id: &str) -> Result<Vec<RawNode>>;
}

/// Append-only multimap `tag name → node ids`
///
/// Rows are never removed by the reconciler: dropping a tag from content and
/// saving again leaves the earlier row in place.
#[async_trait]
pub trait TagIndex: Send + Sync {
    /// Record that `node_id` references `tag_name`. Idempotent.
    async fn create_tag_row(&self, tag_name: &str, node_id: &str) -> Result<()>;
}

/// Removes records that are no longer reachable from any tree
#[async_trait]
pub trait NodeCleaner: Send + Sync {
    /// Must be safe to call after every save
    async fn clean_deleted_nodes(&self) -> Result<()>;
}
