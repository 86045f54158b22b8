//! Outline Reconciler - Converging the Flat Store to an Edited Document
//!
//! The editing surface hands over a nested document for one node: a title
//! followed by body elements. This service walks that document against the
//! stored flat records and issues the minimum store writes that make the
//! store match it, while maintaining the tag index and notifying listeners.
//!
//! # Save Cycle
//!
//! 1. Persist the title (database nodes keep it in `props.name`)
//! 2. Reconcile the body (skipped for database and database-root nodes)
//! 3. Run the orphan cleaner
//! 4. Re-list the space and push the snapshot into the cache
//! 5. Mark the saved node active unless saving from a reference panel
//! 6. Spawn the cloud push; its outcome never affects the save
//!
//! # Change Detection
//!
//! Outline saves compare a content hash over
//! `(parent_id, element, collapsed, children)` before writing, so saving an
//! unchanged subtree issues no writes for it. Block saves always rewrite
//! their elements.
//!
//! # Failure Semantics
//!
//! A failing store call aborts the rest of the save and is returned to the
//! caller. Writes already applied stay applied; because saves are idempotent
//! the caller can simply retry.

use crate::config::ReconcilerConfig;
use crate::db::{DomainEvent, NodeCleaner, NodeStore, TagIndex};
use crate::models::document::{ancestor_path, descendants_matching, node_at};
use crate::models::element::{
    element_children, element_id, element_type, extract_tags, is_list_content_element,
    is_list_element, is_list_item_element, node_string,
};
use crate::models::{content_hash, Node, NodeType, NodeUpdate, RawNode};
use crate::services::collaborators::{CloudSync, NodeCache, SpaceRegistry};
use crate::services::error::NodeServiceError;
use crate::services::node_snapshot::NodeSnapshot;
use serde::Serialize;
use serde_json::Value;
use std::slice;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

/// Everything a save cycle talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn NodeStore>,
    pub tags: Arc<dyn TagIndex>,
    pub cleaner: Arc<dyn NodeCleaner>,
    pub cache: Arc<dyn NodeCache>,
    pub spaces: Arc<dyn SpaceRegistry>,
    pub sync: Arc<dyn CloudSync>,
}

/// Writes performed by one save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub created: usize,
    pub updated: usize,
    /// Outline elements whose hash matched the stored record
    pub skipped: usize,
    pub tags_indexed: usize,
}

impl SaveReport {
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

fn required_id(element: &Value) -> Result<&str, NodeServiceError> {
    element_id(element).ok_or_else(|| {
        NodeServiceError::invalid_document(format!(
            "{} element has no id",
            element_type(element).unwrap_or("untyped")
        ))
    })
}

/// Id of a list item's content line (its first child)
fn list_item_content_id(list_item: &Value) -> Result<String, NodeServiceError> {
    element_children(list_item)
        .first()
        .and_then(element_id)
        .map(str::to_string)
        .ok_or_else(|| NodeServiceError::invalid_document("list item has no identified content"))
}

fn skips_body(node: &Node) -> bool {
    node.is_database() || node.is_database_root()
}

pub struct OutlineReconciler {
    store: Arc<dyn NodeStore>,
    tags: Arc<dyn TagIndex>,
    cleaner: Arc<dyn NodeCleaner>,
    cache: Arc<dyn NodeCache>,
    spaces: Arc<dyn SpaceRegistry>,
    sync: Arc<dyn CloudSync>,
    event_tx: broadcast::Sender<DomainEvent>,
    config: ReconcilerConfig,
}

impl OutlineReconciler {
    pub fn new(collaborators: Collaborators, config: ReconcilerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.channel_capacity());
        let Collaborators {
            store,
            tags,
            cleaner,
            cache,
            spaces,
            sync,
        } = collaborators;

        Self {
            store,
            tags,
            cleaner,
            cache,
            spaces,
            sync,
            event_tx,
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Subscribe to domain events emitted by saves
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// List a space from the store and materialize it
    pub async fn load_snapshot(&self, space_id: &str) -> Result<NodeSnapshot, NodeServiceError> {
        let nodes = self.store.list_nodes_by_space_id(space_id).await?;
        Ok(NodeSnapshot::new(nodes).with_max_ancestor_depth(self.config.max_ancestor_depth))
    }

    /// Save a block-editor document `[title, ...elements]` for `node`
    #[instrument(skip_all, fields(node_id = %node.id(), space_id = %node.space_id()))]
    pub async fn save_block_editor(
        &self,
        node: &Node,
        value: &[Value],
        is_in_reference: bool,
    ) -> Result<SaveReport, NodeServiceError> {
        let mut report = SaveReport::default();
        if self.config.is_read_only(node.space_id()) {
            tracing::debug!("Skipping save in read-only space");
            return Ok(report);
        }

        let (title, elements) = match value.split_first() {
            Some((title, elements)) => (Some(title), elements),
            None => (None, &[][..]),
        };

        self.save_title(node, title).await?;

        if !skips_body(node) {
            self.save_block_nodes(node, elements, &mut report).await?;
        }

        self.finish_save(node, is_in_reference).await?;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            tags = report.tags_indexed,
            "Block save complete"
        );
        Ok(report)
    }

    /// Save an outliner document (title plus one bulleted list) for `node`
    #[instrument(skip_all, fields(node_id = %node.id(), space_id = %node.space_id()))]
    pub async fn save_outliner_editor(
        &self,
        node: &Node,
        title: Option<&Value>,
        list: Option<&Value>,
        is_in_reference: bool,
    ) -> Result<SaveReport, NodeServiceError> {
        let mut report = SaveReport::default();
        if self.config.is_read_only(node.space_id()) {
            tracing::debug!("Skipping save in read-only space");
            return Ok(report);
        }

        self.save_title(node, title).await?;

        if let Some(list) = list {
            if !skips_body(node) {
                self.save_outliner_nodes(node.space_id(), node.id(), list, true, &mut report)
                    .await?;
            }
        }

        self.finish_save(node, is_in_reference).await?;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            tags = report.tags_indexed,
            "Outline save complete"
        );
        Ok(report)
    }

    /// Flip `node`'s collapsed flag and refresh the cache
    #[instrument(skip_all, fields(node_id = %node.id()))]
    pub async fn toggle_collapsed(&self, node: &Node) -> Result<RawNode, NodeServiceError> {
        let updated = self
            .store
            .update_node(node.id(), NodeUpdate::new().with_collapsed(!node.collapsed()))
            .await?;

        let nodes = self.store.list_nodes_by_space_id(node.space_id()).await?;
        self.cache.set_nodes(nodes);

        Ok(updated)
    }

    pub fn select_node(&self, node: &Node) {
        self.cache.select_node(node.raw().clone());
    }

    async fn save_title(&self, node: &Node, title: Option<&Value>) -> Result<(), NodeServiceError> {
        let Some(title) = title else {
            return Ok(());
        };

        let text = node_string(title);
        let current = self
            .store
            .get_node(node.id())
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(node.id()))?;

        if node.is_database() {
            if current.props.get("name").and_then(Value::as_str) != Some(text.as_str()) {
                let mut props = current.props;
                props.insert("name".to_string(), Value::String(text.clone()));
                self.store
                    .update_node(node.id(), NodeUpdate::new().with_props(props))
                    .await?;
            }
        } else {
            let element = element_children(title).to_vec();
            if current.element != element {
                self.store
                    .update_node(node.id(), NodeUpdate::new().with_element(element))
                    .await?;
            }
        }

        if node.is_root_node() {
            self.spaces.update_space_name(node.space_id(), &text).await?;
        }

        Ok(())
    }

    async fn finish_save(&self, node: &Node, is_in_reference: bool) -> Result<(), NodeServiceError> {
        self.cleaner.clean_deleted_nodes().await?;

        let nodes = self.store.list_nodes_by_space_id(node.space_id()).await?;
        let count = nodes.len();
        let refreshed = nodes.iter().find(|n| n.id == node.id()).cloned();
        self.cache.set_nodes(nodes);
        self.emit(DomainEvent::NodesRefreshed {
            space_id: node.space_id().to_string(),
            count,
        });

        if !is_in_reference {
            self.cache
                .set_first_active_node(refreshed.unwrap_or_else(|| node.raw().clone()));
        }

        self.spawn_cloud_push();
        Ok(())
    }

    fn spawn_cloud_push(&self) {
        if !self.config.push_to_cloud {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available, cloud push skipped");
            return;
        };

        let sync = Arc::clone(&self.sync);
        handle.spawn(async move {
            if let Err(e) = sync.push_to_cloud().await {
                tracing::warn!("Cloud push failed: {}", e);
            }
        });
    }

    async fn index_tags(
        &self,
        tags: &[String],
        node_id: &str,
        report: &mut SaveReport,
    ) -> Result<(), NodeServiceError> {
        for tag in tags {
            self.tags.create_tag_row(tag, node_id).await?;
            report.tags_indexed += 1;
        }
        Ok(())
    }

    /// Reconcile a flat list of top-level elements under `node`
    ///
    /// Every element is rewritten; list-shaped elements get their items
    /// reconciled as `LIST_ITEM` records.
    async fn save_block_nodes(
        &self,
        node: &Node,
        elements: &[Value],
        report: &mut SaveReport,
    ) -> Result<(), NodeServiceError> {
        let children = elements
            .iter()
            .map(|el| required_id(el).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        self.store
            .update_node(node.id(), NodeUpdate::new().with_children(children))
            .await?;

        for item in elements {
            let id = required_id(item)?;
            let tags = extract_tags(slice::from_ref(item));
            let is_list = is_list_element(item);

            let saved = match self.store.get_node(id).await? {
                Some(_) => {
                    // Children are re-derived below for lists
                    let update = NodeUpdate::new()
                        .with_element(vec![item.clone()])
                        .with_children(Vec::new());
                    let updated = self.store.update_node(id, update).await?;
                    report.updated += 1;
                    self.emit(DomainEvent::NodeUpdated(updated.clone()));
                    updated
                }
                None => {
                    let node_type = if is_list {
                        NodeType::List
                    } else {
                        NodeType::Common
                    };
                    let record = RawNode::with_id(id, node.space_id(), node_type)
                        .with_parent(node.id())
                        .with_element(vec![item.clone()]);
                    let created = self.store.create_node(record).await?;
                    report.created += 1;
                    self.emit(DomainEvent::NodeCreated(created.clone()));
                    created
                }
            };

            if is_list {
                self.save_outliner_nodes(node.space_id(), id, item, false, report)
                    .await?;
            }

            self.index_tags(&tags, id, report).await?;
            if !tags.is_empty() {
                self.emit(DomainEvent::RefNodeUpdated(saved));
            }
        }

        Ok(())
    }

    /// Reconcile a nested list under `parent_id`
    ///
    /// `is_outliner` is true for the outermost outline save; nested calls from
    /// block saves create `LIST_ITEM` records instead of `COMMON` ones.
    async fn save_outliner_nodes(
        &self,
        space_id: &str,
        parent_id: &str,
        list: &Value,
        is_outliner: bool,
        report: &mut SaveReport,
    ) -> Result<(), NodeServiceError> {
        let document = slice::from_ref(list);

        let top_level = element_children(list)
            .iter()
            .map(list_item_content_id)
            .collect::<Result<Vec<_>, _>>()?;

        let target = self
            .store
            .get_node(parent_id)
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(parent_id))?;
        if target.children != top_level {
            self.store
                .update_node(parent_id, NodeUpdate::new().with_children(top_level))
                .await?;
        }

        for (path, content) in descendants_matching(document, is_list_content_element) {
            let id = required_id(content)?;

            let list_item = ancestor_path(&path, 1)
                .and_then(|p| node_at(document, p))
                .filter(|el| is_list_item_element(el))
                .ok_or_else(|| {
                    NodeServiceError::invalid_document(format!(
                        "list content {} is not inside a list item",
                        id
                    ))
                })?;

            let children = match element_children(list_item).get(1) {
                Some(sub_list) => element_children(sub_list)
                    .iter()
                    .map(list_item_content_id)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };

            // Enclosing list item of the enclosing list, if any
            let outer_path = ancestor_path(&path, 3).ok_or_else(|| {
                NodeServiceError::invalid_document(format!(
                    "list content {} is nested too shallowly",
                    id
                ))
            })?;
            let new_parent_id = match node_at(document, outer_path) {
                Some(outer) if is_list_item_element(outer) => list_item_content_id(outer)?,
                _ => parent_id.to_string(),
            };

            let element = element_children(content).to_vec();
            let tags = extract_tags(&element);
            let collapsed = content
                .get("collapsed")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            match self.store.get_node(id).await? {
                Some(existing) => {
                    let old_hash = Node::new(existing).to_hash();
                    let new_hash = content_hash(
                        Some(new_parent_id.as_str()),
                        &element,
                        collapsed,
                        &children,
                    );
                    if old_hash == new_hash {
                        report.skipped += 1;
                        tracing::trace!("Unchanged: {}", id);
                        continue;
                    }

                    let update = NodeUpdate::new()
                        .with_parent_id(new_parent_id)
                        .with_element(element)
                        .with_collapsed(collapsed)
                        .with_children(children);
                    let updated = self.store.update_node(id, update).await?;
                    report.updated += 1;
                    tracing::debug!("Updated {}", id);

                    self.index_tags(&tags, id, report).await?;
                    self.emit(DomainEvent::NodeUpdated(updated.clone()));
                    if !tags.is_empty() {
                        self.emit(DomainEvent::RefNodeUpdated(updated));
                    }
                }
                None => {
                    let node_type = if is_outliner {
                        NodeType::Common
                    } else {
                        NodeType::ListItem
                    };
                    let record = RawNode::with_id(id, space_id, node_type)
                        .with_parent(new_parent_id)
                        .with_collapsed(collapsed)
                        .with_element(element)
                        .with_children(children);
                    let created = self.store.create_node(record).await?;
                    report.created += 1;
                    tracing::debug!("Created {} ({})", id, node_type);

                    self.index_tags(&tags, id, report).await?;
                    self.emit(DomainEvent::NodeCreated(created));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "outline_reconciler_test.rs"]
mod outline_reconciler_test;
