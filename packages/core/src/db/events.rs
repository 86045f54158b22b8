//! Domain Events
//!
//! This module defines the events emitted by the outline reconciler while it
//! writes to the store. Interested views (database rows that reference a
//! node, backlink panels) subscribe without coupling to the reconciler.
//!
//! # Architecture
//!
//! The reconciler owns a tokio broadcast channel; each subscriber gets its own
//! receiver. Delivery is fire-and-forget: sending with no subscribers is not
//! an error, and a lagging subscriber loses the oldest events.
//!
//! # Event Flow
//!
//! 1. The reconciler performs a store write (create, update)
//! 2. Domain event is emitted via broadcast channel
//! 3. After the cache push, `NodesRefreshed` closes the save

use crate::models::RawNode;
use serde::{Deserialize, Serialize};

/// Domain events emitted during a save cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    /// A new node was created
    NodeCreated(RawNode),

    /// An existing node was updated
    NodeUpdated(RawNode),

    /// A node carrying tag references was written; views depending on it
    /// should refresh
    RefNodeUpdated(RawNode),

    /// The cache received a fresh snapshot of a space
    #[serde(rename_all = "camelCase")]
    NodesRefreshed { space_id: String, count: usize },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::NodeCreated(_) => "node:created",
            DomainEvent::NodeUpdated(_) => "node:updated",
            DomainEvent::RefNodeUpdated(_) => "node:ref-updated",
            DomainEvent::NodesRefreshed { .. } => "nodes:refreshed",
        }
    }

    /// The node carried by the event, if any
    pub fn node(&self) -> Option<&RawNode> {
        match self {
            DomainEvent::NodeCreated(node)
            | DomainEvent::NodeUpdated(node)
            | DomainEvent::RefNodeUpdated(node) => Some(node),
            DomainEvent::NodesRefreshed { .. } => None,
        }
    }
}
