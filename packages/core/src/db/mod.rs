//! Persistence Layer
//!
//! This module holds everything the reconciler needs from storage:
//!
//! - `NodeStore` / `TagIndex` / `NodeCleaner` traits (the collaborator contracts)
//! - `InMemoryStore`, a complete process-local implementation of all three
//! - `DomainEvent`, the typed events emitted while writing
//!
//! The store is treated as a flat key-value table with per-call atomicity and
//! no cross-key transactions.

mod error;
pub mod events;
mod memory_store;
mod node_store;

pub use error::StoreError;
pub use events::DomainEvent;
pub use memory_store::{InMemoryStore, WriteStats};
pub use node_store::{NodeCleaner, NodeStore, TagIndex};
