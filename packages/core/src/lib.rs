//! NodeTree Core - Node Tree Reconciliation & Query Engine
//!
//! This crate keeps a flat store of node records consistent with the nested
//! documents an outline/block editor produces, and answers structural queries
//! over the stored forest.
//!
//! # Architecture
//!
//! - **Flat records**: Every node is one `RawNode` row; hierarchy lives in
//!   `parent_id` plus the ordered `children` id list
//! - **Snapshots**: `NodeSnapshot` materializes one space into an id map with
//!   singleton, tree and ancestry queries
//! - **Reconciliation**: `OutlineReconciler` diffs an edited document against
//!   the store with content hashes and writes only what changed
//! - **Pluggable collaborators**: store, tag index, cleaner, cache, space
//!   registry and cloud sync are traits with in-memory implementations
//!
//! # Modules
//!
//! - [`models`] - Node records, editor elements and document paths
//! - [`db`] - Persistence contracts, in-memory store and domain events
//! - [`services`] - Snapshot queries and the save cycle
//! - [`config`] - Reconciler configuration

pub mod config;
pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::ReconcilerConfig;
pub use db::{DomainEvent, InMemoryStore, NodeCleaner, NodeStore, StoreError, TagIndex};
pub use models::*;
pub use services::*;
