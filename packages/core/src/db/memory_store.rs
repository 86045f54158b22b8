//! In-Memory Node Store
//!
//! A complete, process-local implementation of [`NodeStore`], [`TagIndex`]
//! and [`NodeCleaner`]. Used by the test suites and by embedders that keep
//! their space in memory and persist it elsewhere.
//!
//! Records of a space are listed in insertion order. Every update bumps
//! `updated_at`. Write counters let callers verify that a save issued no
//! redundant writes.

use crate::db::error::StoreError;
use crate::db::node_store::{NodeCleaner, NodeStore, TagIndex};
use crate::models::{NodeUpdate, RawNode};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;

/// Number of writes a store has accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub creates: usize,
    pub updates: usize,
    pub tag_rows: usize,
    pub deletes: usize,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<String, RawNode>,
    order: Vec<String>,
    tags: BTreeMap<String, BTreeSet<String>>,
    stats: WriteStats,
    rejected_ids: HashSet<String>,
}

impl Inner {
    fn check_writable(&self, id: &str) -> Result<()> {
        if self.rejected_ids.contains(id) {
            return Err(StoreError::write_rejected(format!("writes to {} are rejected", id)).into());
        }
        Ok(())
    }
}

/// Process-local node store
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `nodes`. Seeding is not counted as writes.
    pub fn with_nodes(nodes: Vec<RawNode>) -> Self {
        let mut inner = Inner::default();
        for node in nodes {
            if !inner.nodes.contains_key(&node.id) {
                inner.order.push(node.id.clone());
            }
            inner.nodes.insert(node.id.clone(), node);
        }

        Self {
            inner: RwLock::new(inner),
        }
    }

    pub async fn write_stats(&self) -> WriteStats {
        self.inner.read().await.stats
    }

    pub async fn reset_write_stats(&self) {
        self.inner.write().await.stats = WriteStats::default();
    }

    /// Node ids indexed under `tag_name`
    pub async fn nodes_tagged(&self, tag_name: &str) -> BTreeSet<String> {
        self.inner
            .read()
            .await
            .tags
            .get(tag_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Every tag row currently indexed
    pub async fn tag_rows(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.inner.read().await.tags.clone()
    }

    /// Make every subsequent create or update of `id` fail
    pub async fn reject_writes_to(&self, id: impl Into<String>) {
        self.inner.write().await.rejected_ids.insert(id.into());
    }

    pub async fn accept_all_writes(&self) {
        self.inner.write().await.rejected_ids.clear();
    }
}

#[async_trait]
impl NodeStore for InMemoryStore {
    async fn get_node(&self, id: &str) -> Result<Option<RawNode>> {
        Ok(self.inner.read().await.nodes.get(id).cloned())
    }

    async fn create_node(&self, node: RawNode) -> Result<RawNode> {
        let mut inner = self.inner.write().await;
        inner.check_writable(&node.id)?;

        if inner.nodes.contains_key(&node.id) {
            return Err(StoreError::duplicate_id(&node.id).into());
        }

        inner.order.push(node.id.clone());
        inner.nodes.insert(node.id.clone(), node.clone());
        inner.stats.creates += 1;

        tracing::trace!("Created node {} ({})", node.id, node.node_type);
        Ok(node)
    }

    async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<RawNode> {
        let mut inner = self.inner.write().await;
        inner.check_writable(id)?;

        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::node_not_found(id))?;

        update.apply_to(node);
        node.updated_at = Utc::now();
        let updated = node.clone();
        inner.stats.updates += 1;

        tracing::trace!("Updated node {}", id);
        Ok(updated)
    }

    async fn list_nodes_by_space_id(&self, space_id: &str) -> Result<Vec<RawNode>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.nodes.get(id))
            .filter(|node| node.space_id == space_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TagIndex for InMemoryStore {
    async fn create_tag_row(&self, tag_name: &str, node_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .tags
            .entry(tag_name.to_string())
            .or_default()
            .insert(node_id.to_string());
        inner.stats.tag_rows += 1;
        Ok(())
    }
}

#[async_trait]
impl NodeCleaner for InMemoryStore {
    /// Deletes every record not reachable through `children` from a top-level
    /// record (one with no `parent_id`) of its own space.
    async fn clean_deleted_nodes(&self) -> Result<()> {
        let mut inner = self.inner.write().await;

        let mut reachable: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = inner
            .nodes
            .values()
            .filter(|node| node.parent_id.is_none())
            .map(|node| node.id.clone())
            .collect();

        while let Some(id) = queue.pop_front() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            if let Some(node) = inner.nodes.get(&id) {
                for child_id in &node.children {
                    let same_space = inner
                        .nodes
                        .get(child_id)
                        .is_some_and(|child| child.space_id == node.space_id);
                    if same_space && !reachable.contains(child_id) {
                        queue.push_back(child_id.clone());
                    }
                }
            }
        }

        let before = inner.nodes.len();
        inner.nodes.retain(|id, _| reachable.contains(id));
        let Inner { nodes, order, .. } = &mut *inner;
        order.retain(|id| nodes.contains_key(id));

        let removed = before - inner.nodes.len();
        inner.stats.deletes += removed;
        if removed > 0 {
            tracing::debug!("Cleaned {} orphaned node(s)", removed);
        }

        Ok(())
    }
}
