//! Non-persistence collaborators of a save cycle
//!
//! - `NodeCache`: the reactive state views read from; receives full snapshots
//! - `SpaceRegistry`: owns space metadata (display name)
//! - `CloudSync`: best-effort remote push, never awaited by a save
//!
//! `InMemoryNodeCache` and `InMemorySpaceRegistry` are complete reference
//! implementations usable by embedders and tests.

use crate::models::RawNode;
use crate::services::node_snapshot::NodeSnapshot;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::sync::RwLock as AsyncRwLock;

/// Reactive application state the views render from
///
/// Every call replaces state wholesale and must be idempotent.
pub trait NodeCache: Send + Sync {
    fn set_nodes(&self, nodes: Vec<RawNode>);

    /// Mark `node` as the node shown in the first (main) panel
    fn set_first_active_node(&self, node: RawNode);

    fn select_node(&self, node: RawNode);
}

#[async_trait]
pub trait SpaceRegistry: Send + Sync {
    async fn update_space_name(&self, space_id: &str, name: &str) -> Result<()>;
}

#[async_trait]
pub trait CloudSync: Send + Sync {
    async fn push_to_cloud(&self) -> Result<()>;
}

/// Cloud sync for local-only deployments
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOnlySync;

#[async_trait]
impl CloudSync for LocalOnlySync {
    async fn push_to_cloud(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CacheState {
    nodes: Vec<RawNode>,
    active: Option<RawNode>,
    selected: Option<RawNode>,
}

/// Process-local [`NodeCache`]
#[derive(Debug, Default)]
pub struct InMemoryNodeCache {
    state: RwLock<CacheState>,
}

impl InMemoryNodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> Vec<RawNode> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .clone()
    }

    /// Materialize the cached records for querying
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot::new(self.nodes())
    }

    pub fn active_node(&self) -> Option<RawNode> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .clone()
    }

    pub fn selected_node(&self) -> Option<RawNode> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .selected
            .clone()
    }
}

impl NodeCache for InMemoryNodeCache {
    fn set_nodes(&self, nodes: Vec<RawNode>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes = nodes;
    }

    fn set_first_active_node(&self, node: RawNode) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .active = Some(node);
    }

    fn select_node(&self, node: RawNode) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .selected = Some(node);
    }
}

/// Process-local [`SpaceRegistry`]
#[derive(Debug, Default)]
pub struct InMemorySpaceRegistry {
    names: AsyncRwLock<HashMap<String, String>>,
}

impl InMemorySpaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn space_name(&self, space_id: &str) -> Option<String> {
        self.names.read().await.get(space_id).cloned()
    }
}

#[async_trait]
impl SpaceRegistry for InMemorySpaceRegistry {
    async fn update_space_name(&self, space_id: &str, name: &str) -> Result<()> {
        self.names
            .write()
            .await
            .insert(space_id.to_string(), name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeType;

    #[test]
    fn test_cache_replaces_snapshot() {
        let cache = InMemoryNodeCache::new();
        cache.set_nodes(vec![RawNode::with_id("a", "s", NodeType::Root)]);
        cache.set_nodes(vec![
            RawNode::with_id("b", "s", NodeType::Root),
            RawNode::with_id("c", "s", NodeType::Common),
        ]);

        let snapshot = cache.snapshot();
        assert!(snapshot.get_node("a").is_none());
        assert!(snapshot.get_node("c").is_some());
    }

    #[test]
    fn test_cache_tracks_active_and_selected() {
        let cache = InMemoryNodeCache::new();
        cache.set_first_active_node(RawNode::with_id("a", "s", NodeType::Common));
        cache.select_node(RawNode::with_id("b", "s", NodeType::Common));

        assert_eq!(cache.active_node().map(|n| n.id), Some("a".to_string()));
        assert_eq!(cache.selected_node().map(|n| n.id), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_space_registry_updates_name() {
        let registry = InMemorySpaceRegistry::new();
        registry.update_space_name("s", "My Space").await.unwrap();

        assert_eq!(registry.space_name("s").await.as_deref(), Some("My Space"));
    }
}
