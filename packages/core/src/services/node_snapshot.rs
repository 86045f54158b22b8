//! Node Snapshot - Materialized Node Forest
//!
//! Turns the flat record list of one space into a queryable structure:
//!
//! - O(1) id lookup
//! - Singleton resolution (root, daily root, inbox, trash, favorites, database root)
//! - Tree and flattened projections for rendering
//! - Structural queries (ancestry, favorites, backlinks, equality `find`)
//!
//! # Purity
//!
//! A snapshot performs no I/O and never mutates its input. Rebuild it from a
//! fresh store listing after every save; it is cheap enough to build on demand.
//!
//! # Singletons
//!
//! Kinds like ROOT or TRASH must exist exactly once per space. Accessors fail
//! with a typed error on zero or several matches instead of silently picking
//! one.

use crate::models::{element, FlattenedNode, Node, NodeFilter, NodeType, RawNode, TreeItem};
use crate::services::error::NodeServiceError;
use std::collections::HashMap;

const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 1000;

/// Immutable, materialized view over one space's records
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    nodes: Vec<Node>,
    /// id → index into `nodes`; a duplicate id resolves to its last record
    node_map: HashMap<String, usize>,
    max_ancestor_depth: usize,
}

impl NodeSnapshot {
    pub fn new(raw_nodes: Vec<RawNode>) -> Self {
        let nodes: Vec<Node> = raw_nodes.into_iter().map(Node::new).collect();

        let mut node_map = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            if node_map.insert(node.id().to_string(), index).is_some() {
                tracing::warn!("Duplicate node id in snapshot: {}", node.id());
            }
        }

        Self {
            nodes,
            node_map,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }

    /// Build from borrowed records, leaving the caller's list untouched
    pub fn from_slice(raw_nodes: &[RawNode]) -> Self {
        Self::new(raw_nodes.to_vec())
    }

    pub fn with_max_ancestor_depth(mut self, depth: usize) -> Self {
        self.max_ancestor_depth = depth;
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Absence means "not found"; callers must not assume presence
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.node_map.get(id).map(|&index| &self.nodes[index])
    }

    fn expect_one(&self, node_type: NodeType) -> Result<&Node, NodeServiceError> {
        self.find_one(node_type)?
            .ok_or_else(|| NodeServiceError::singleton_missing(node_type))
    }

    /// `Ok(None)` on zero matches, error on more than one
    fn find_one(&self, node_type: NodeType) -> Result<Option<&Node>, NodeServiceError> {
        let mut matches = self.nodes.iter().filter(|n| n.node_type() == node_type);
        let first = matches.next();
        let extra = matches.count();
        if extra > 0 {
            return Err(NodeServiceError::singleton_ambiguous(node_type, extra + 1));
        }
        Ok(first)
    }

    pub fn root_node(&self) -> Result<&Node, NodeServiceError> {
        self.expect_one(NodeType::Root)
    }

    pub fn database_root_node(&self) -> Result<&Node, NodeServiceError> {
        self.expect_one(NodeType::DatabaseRoot)
    }

    pub fn daily_root_node(&self) -> Result<&Node, NodeServiceError> {
        self.expect_one(NodeType::DailyRoot)
    }

    pub fn inbox_node(&self) -> Result<&Node, NodeServiceError> {
        self.expect_one(NodeType::Inbox)
    }

    pub fn trash_node(&self) -> Result<&Node, NodeServiceError> {
        self.expect_one(NodeType::Trash)
    }

    pub fn favorite_node(&self) -> Result<&Node, NodeServiceError> {
        self.expect_one(NodeType::Favorite)
    }

    fn resolve<'a>(&'a self, ids: &'a [String]) -> impl Iterator<Item = &'a Node> + 'a {
        ids.iter().filter_map(move |id| {
            let node = self.get_node(id);
            if node.is_none() {
                tracing::debug!("Skipping unresolved child id {}", id);
            }
            node
        })
    }

    /// Top-level pages, most recently updated first
    ///
    /// Independent of the root's stored child order. An empty snapshot has no
    /// pages.
    pub fn root_nodes(&self) -> Result<Vec<&Node>, NodeServiceError> {
        if self.nodes.is_empty() {
            return Ok(Vec::new());
        }

        let root = self.root_node()?;
        let mut pages: Vec<&Node> = self.resolve(root.children()).collect();
        pages.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        Ok(pages)
    }

    /// Tag/database definitions
    pub fn tag_nodes(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.is_database()).collect()
    }

    /// Every node inside the trash subtree, in render order
    ///
    /// A space without a trash node has nothing trashed.
    pub fn trashed_nodes(&self) -> Result<Vec<&Node>, NodeServiceError> {
        let Some(trash) = self.find_one(NodeType::Trash)? else {
            return Ok(Vec::new());
        };

        let mut trashed = Vec::new();
        self.collect_descendants(trash, &mut trashed, 0);
        Ok(trashed)
    }

    fn collect_descendants<'a>(&'a self, node: &'a Node, out: &mut Vec<&'a Node>, depth: usize) {
        if depth >= self.max_ancestor_depth {
            tracing::warn!("Stopped descending at {}: depth bound reached", node.id());
            return;
        }
        for child in self.resolve(node.children()) {
            out.push(child);
            self.collect_descendants(child, out, depth + 1);
        }
    }

    /// Nested projection of `node`'s children
    ///
    /// Assumes the stored graph is acyclic. Unresolved child ids are skipped.
    pub fn create_tree(&self, node: &Node) -> Vec<TreeItem> {
        self.resolve(node.children())
            .map(|child| {
                let children = if child.has_children() {
                    self.create_tree(child)
                } else {
                    Vec::new()
                };
                TreeItem::from_raw(child.raw(), children)
            })
            .collect()
    }

    /// Depth-first pre-order listing of `node`'s descendants
    ///
    /// Top-level entries have no `parent_id`, `depth` 0 and `index` equal to
    /// their position among `node`'s children.
    pub fn flatten_node(&self, node: &Node) -> Vec<FlattenedNode> {
        let mut out = Vec::new();
        self.flatten_children(node.children(), None, 0, &mut out);
        out
    }

    fn flatten_children(
        &self,
        children: &[String],
        parent_id: Option<&str>,
        depth: usize,
        out: &mut Vec<FlattenedNode>,
    ) {
        for (index, id) in children.iter().enumerate() {
            // Tolerates a deletion that has not reached this snapshot yet
            let Some(node) = self.get_node(id) else {
                continue;
            };

            out.push(FlattenedNode {
                node: node.clone(),
                parent_id: parent_id.map(str::to_string),
                depth,
                index,
            });

            if node.has_children() {
                self.flatten_children(node.children(), Some(node.id()), depth + 1, out);
            }
        }
    }

    /// Resolved favorites; ids without a record are dropped
    ///
    /// A space without a favorite node has no favorites.
    pub fn favorites(&self) -> Result<Vec<&Node>, NodeServiceError> {
        Ok(match self.find_one(NodeType::Favorite)? {
            Some(favorite) => self.resolve(favorite.children()).collect(),
            None => Vec::new(),
        })
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        matches!(
            self.find_one(NodeType::Favorite),
            Ok(Some(favorite)) if favorite.children().iter().any(|c| c == id)
        )
    }

    /// COMMON nodes whose content links to `node`, oldest reference first
    ///
    /// Full scan over every node's content; meant for on-demand backlink views.
    pub fn linked_references(&self, node: &Node) -> Vec<&Node> {
        let mut refs: Vec<&Node> = self
            .nodes
            .iter()
            .filter(|item| item.id() != node.id())
            .filter(|item| item.is_common())
            .filter(|item| element::links_to(item.element(), node.id()))
            .collect();
        refs.sort_by_key(|n| n.updated_at());
        refs
    }

    /// Equality query over the raw records
    ///
    /// A filter without criteria returns nothing.
    pub fn find(&self, filter: &NodeFilter) -> Vec<Node> {
        filter
            .apply(self.nodes.iter().map(Node::raw))
            .into_iter()
            .cloned()
            .map(Node::new)
            .collect()
    }

    pub fn parent_node(&self, node: &Node) -> Option<&Node> {
        node.parent_id().and_then(|id| self.get_node(id))
    }

    /// Breadcrumb from the top-most non-ROOT ancestor down to `node` itself
    ///
    /// Stops at a missing parent or after `max_ancestor_depth` steps.
    pub fn parent_nodes<'a>(&'a self, node: &'a Node) -> Vec<&'a Node> {
        let mut chain = vec![node];
        let mut current = node;

        for _ in 0..self.max_ancestor_depth {
            let Some(parent) = self.parent_node(current) else {
                break;
            };
            if !parent.is_root_node() {
                chain.push(parent);
            }
            current = parent;
        }

        chain.reverse();
        chain
    }

    /// Top-level page containing `node`
    ///
    /// Daily pages live under the daily root, so for them the day page is
    /// returned rather than the daily root itself.
    pub fn page_of<'a>(&'a self, node: &'a Node) -> Option<&'a Node> {
        let chain = self.parent_nodes(node);
        match chain.first() {
            Some(top) if top.is_daily_root() => chain.get(1).copied(),
            Some(top) => Some(*top),
            None => None,
        }
    }
}

impl From<Vec<RawNode>> for NodeSnapshot {
    fn from(raw_nodes: Vec<RawNode>) -> Self {
        Self::new(raw_nodes)
    }
}

#[cfg(test)]
#[path = "node_snapshot_test.rs"]
mod node_snapshot_test;
