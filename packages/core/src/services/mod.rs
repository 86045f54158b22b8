//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `NodeSnapshot` - Materialized, queryable view over one space's records
//! - `OutlineReconciler` - Converges the store to an edited document
//! - Collaborator contracts for the cache, space registry and cloud sync
//!
//! Services coordinate between the persistence layer and the editing surface,
//! implementing tree rules and orchestrating save cycles.

pub mod collaborators;
pub mod error;
pub mod node_snapshot;
pub mod outline_reconciler;

pub use collaborators::{
    CloudSync, InMemoryNodeCache, InMemorySpaceRegistry, LocalOnlySync, NodeCache, SpaceRegistry,
};
pub use error::NodeServiceError;
pub use node_snapshot::NodeSnapshot;
pub use outline_reconciler::{Collaborators, OutlineReconciler, SaveReport};
