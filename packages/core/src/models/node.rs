//! Node Data Structures
//!
//! This module defines the flat node record persisted by the store and the
//! read-oriented views derived from it.
//!
//! # Architecture
//!
//! - **Flat Records**: Every node is stored as one `RawNode` keyed by id; the
//!   tree is expressed through `parent_id` plus the ordered `children` id list
//! - **Derived Views**: `Node` wraps a record and exposes classification
//!   predicates and a stable content hash
//! - **Projections**: `TreeItem` (nested export shape) and `FlattenedNode`
//!   (depth/index annotated rendering shape) are never written back
//!
//! # Examples
//!
//! ```rust
//! use nodetree_core::models::{Node, NodeType, RawNode};
//! use serde_json::json;
//!
//! let raw = RawNode::new("space-1", NodeType::Common)
//!     .with_parent("root-1")
//!     .with_element(vec![json!({"text": "Hello"})]);
//!
//! let node = Node::new(raw);
//! assert!(node.is_common());
//! assert_eq!(node.plain_text(), "Hello");
//! ```

use crate::models::element;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Closed set of node kinds.
///
/// The kind decides which singleton lookup a node answers to and which save
/// path applies to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// The single top-level node of a space
    Root,
    /// Parent of all daily journal pages
    DailyRoot,
    /// One daily journal page
    Daily,
    Inbox,
    Trash,
    Favorite,
    /// Tag/database definition
    Database,
    DatabaseRoot,
    /// Top-level list block saved from the block editor
    List,
    /// Item nested under a `List` block
    ListItem,
    /// Ordinary outline content
    #[default]
    Common,
    Column,
    Row,
    View,
    Cell,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Root => "ROOT",
            NodeType::DailyRoot => "DAILY_ROOT",
            NodeType::Daily => "DAILY",
            NodeType::Inbox => "INBOX",
            NodeType::Trash => "TRASH",
            NodeType::Favorite => "FAVORITE",
            NodeType::Database => "DATABASE",
            NodeType::DatabaseRoot => "DATABASE_ROOT",
            NodeType::List => "LIST",
            NodeType::ListItem => "LIST_ITEM",
            NodeType::Common => "COMMON",
            NodeType::Column => "COLUMN",
            NodeType::Row => "ROW",
            NodeType::View => "VIEW",
            NodeType::Cell => "CELL",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Persisted, flat node record.
///
/// # Fields
///
/// - `id`: Stable identifier, unique within a space and never reused
/// - `space_id`: Owning space (nodes never move across spaces)
/// - `node_type`: Kind of node, serialized as `type`
/// - `parent_id`: Structural parent, `None` for top-level nodes
/// - `children`: Ordered child ids (render order)
/// - `element`: The node's own rich-content fragment, excluding its children
/// - `props`: Free-form properties (e.g. database `name`)
/// - `collapsed`: View state only
///
/// `children` and the children's `parent_id` must always agree: no record may
/// appear in two parents' `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,

    pub space_id: String,

    #[serde(rename = "type", default)]
    pub node_type: NodeType,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub children: Vec<String>,

    #[serde(default)]
    pub element: Vec<Value>,

    #[serde(default)]
    pub props: Map<String, Value>,

    #[serde(default)]
    pub collapsed: bool,

    #[serde(default = "now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "now")]
    pub updated_at: DateTime<Utc>,
}

impl RawNode {
    /// Create a record with a generated UUID.
    ///
    /// Records produced by the editing surface carry their own stable ids;
    /// use [`RawNode::with_id`] for those.
    pub fn new(space_id: impl Into<String>, node_type: NodeType) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), space_id, node_type)
    }

    /// Create a record with a caller-supplied id
    pub fn with_id(id: impl Into<String>, space_id: impl Into<String>, node_type: NodeType) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            space_id: space_id.into(),
            node_type,
            parent_id: None,
            children: Vec::new(),
            element: Vec::new(),
            props: Map::new(),
            collapsed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_element(mut self, element: Vec<Value>) -> Self {
        self.element = element;
        self
    }

    pub fn with_props(mut self, props: Map<String, Value>) -> Self {
        self.props = props;
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nested Options
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value")) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update
///
/// Only provided fields are written; the store merges them into the existing
/// record and bumps `updated_at`.
///
/// `parent_id` uses the double-Option pattern:
/// - `None`: Don't change parent_id
/// - `Some(None)`: Detach (set to NULL)
/// - `Some(Some(id))`: Reparent under `id`
///
/// # Examples
///
/// ```rust
/// # use nodetree_core::models::NodeUpdate;
/// let update = NodeUpdate::new()
///     .with_parent_id("new-parent")
///     .with_children(vec!["a".to_string(), "b".to_string()]);
/// assert!(!update.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(Some(parent_id.into()));
        self
    }

    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_element(mut self, element: Vec<Value>) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_props(mut self, props: Map<String, Value>) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = Some(collapsed);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none()
            && self.parent_id.is_none()
            && self.children.is_none()
            && self.element.is_none()
            && self.props.is_none()
            && self.collapsed.is_none()
    }

    /// Merge the provided fields into `node`.
    ///
    /// Does not touch timestamps; bumping `updated_at` is the store's job.
    pub fn apply_to(self, node: &mut RawNode) {
        if let Some(node_type) = self.node_type {
            node.node_type = node_type;
        }
        if let Some(parent_id) = self.parent_id {
            node.parent_id = parent_id;
        }
        if let Some(children) = self.children {
            node.children = children;
        }
        if let Some(element) = self.element {
            node.element = element;
        }
        if let Some(props) = self.props {
            node.props = props;
        }
        if let Some(collapsed) = self.collapsed {
            node.collapsed = collapsed;
        }
    }
}

/// Borrowed view of the fields that take part in the content hash.
///
/// Field order is alphabetical so the serialized form matches the sorted-key
/// layout serde_json uses for `Value` objects.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashInput<'a> {
    children: &'a [String],
    collapsed: bool,
    element: &'a [Value],
    parent_id: Option<&'a str>,
}

/// Stable digest over `(parent_id, element, collapsed, children)`.
///
/// Returns lowercase hex SHA-256 of the canonical JSON form. Two records with
/// equal hashes need no write.
pub fn content_hash(
    parent_id: Option<&str>,
    element: &[Value],
    collapsed: bool,
    children: &[String],
) -> String {
    let input = HashInput {
        children,
        collapsed,
        element,
        parent_id,
    };

    let mut hasher = Sha256::new();
    // Writing plain JSON into an in-memory hasher cannot fail
    let _ = serde_json::to_writer(&mut hasher, &input);
    format!("{:x}", hasher.finalize())
}

/// Read-oriented view over one `RawNode`.
///
/// Immutable per snapshot. Children are exposed as ids; resolve them through
/// [`crate::services::NodeSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    raw: RawNode,
}

impl Node {
    pub fn new(raw: RawNode) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &RawNode {
        &self.raw
    }

    pub fn into_raw(self) -> RawNode {
        self.raw
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    pub fn space_id(&self) -> &str {
        &self.raw.space_id
    }

    pub fn node_type(&self) -> NodeType {
        self.raw.node_type
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.raw.parent_id.as_deref()
    }

    pub fn children(&self) -> &[String] {
        &self.raw.children
    }

    pub fn element(&self) -> &[Value] {
        &self.raw.element
    }

    pub fn props(&self) -> &Map<String, Value> {
        &self.raw.props
    }

    pub fn collapsed(&self) -> bool {
        self.raw.collapsed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.raw.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.raw.updated_at
    }

    pub fn has_children(&self) -> bool {
        !self.raw.children.is_empty()
    }

    pub fn is_root_node(&self) -> bool {
        self.raw.node_type == NodeType::Root
    }

    pub fn is_daily_root(&self) -> bool {
        self.raw.node_type == NodeType::DailyRoot
    }

    pub fn is_daily(&self) -> bool {
        self.raw.node_type == NodeType::Daily
    }

    pub fn is_inbox(&self) -> bool {
        self.raw.node_type == NodeType::Inbox
    }

    pub fn is_trash(&self) -> bool {
        self.raw.node_type == NodeType::Trash
    }

    pub fn is_favorite(&self) -> bool {
        self.raw.node_type == NodeType::Favorite
    }

    pub fn is_database(&self) -> bool {
        self.raw.node_type == NodeType::Database
    }

    pub fn is_database_root(&self) -> bool {
        self.raw.node_type == NodeType::DatabaseRoot
    }

    pub fn is_list(&self) -> bool {
        self.raw.node_type == NodeType::List
    }

    pub fn is_list_item(&self) -> bool {
        self.raw.node_type == NodeType::ListItem
    }

    pub fn is_common(&self) -> bool {
        self.raw.node_type == NodeType::Common
    }

    /// Database name stored in `props.name`, if any
    pub fn name(&self) -> Option<&str> {
        self.raw.props.get("name").and_then(Value::as_str)
    }

    /// Plain text of the element, as the editor renders it
    pub fn plain_text(&self) -> String {
        element::fragment_string(&self.raw.element)
    }

    /// Plain text with inline tags rendered as `#name`
    pub fn display_text(&self) -> String {
        element::fragment_display_string(&self.raw.element)
    }

    /// Stable digest over `(parent_id, element, collapsed, children)`
    pub fn to_hash(&self) -> String {
        content_hash(
            self.parent_id(),
            &self.raw.element,
            self.raw.collapsed,
            &self.raw.children,
        )
    }
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        Self::new(raw)
    }
}

/// Nested export projection of a record.
///
/// Same shape as `RawNode` except `children` holds nested items instead of ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeItem {
    pub id: String,
    pub space_id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub parent_id: Option<String>,
    pub element: Vec<Value>,
    pub props: Map<String, Value>,
    pub collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    pub fn from_raw(raw: &RawNode, children: Vec<TreeItem>) -> Self {
        Self {
            id: raw.id.clone(),
            space_id: raw.space_id.clone(),
            node_type: raw.node_type,
            parent_id: raw.parent_id.clone(),
            element: raw.element.clone(),
            props: raw.props.clone(),
            collapsed: raw.collapsed,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            children,
        }
    }
}

/// A node annotated for linear (virtualized) rendering.
///
/// `parent_id` is recomputed during the walk and is `None` for the top level
/// of the flattened subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedNode {
    pub node: Node,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub index: usize,
}

/// Field used to sort `find` results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Id,
    NodeType,
    CreatedAt,
    UpdatedAt,
}

impl SortKey {
    fn compare(&self, a: &RawNode, b: &RawNode) -> Ordering {
        match self {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::NodeType => a.node_type.as_str().cmp(b.node_type.as_str()),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

/// Equality filter for snapshot queries
///
/// Every provided field must match exactly. A filter without any criteria
/// matches nothing: unfiltered scans are not served through this path.
///
/// # Examples
///
/// ```rust
/// # use nodetree_core::models::{NodeFilter, NodeType, SortKey};
/// let filter = NodeFilter::new()
///     .with_node_type(NodeType::Database)
///     .with_sort_by(SortKey::UpdatedAt)
///     .with_order_desc()
///     .with_limit(10);
/// assert!(filter.has_criteria());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,

    /// `Some(None)` matches top-level nodes only
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortKey>,

    #[serde(default)]
    pub order_by_desc: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_space_id(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = Some(space_id.into());
        self
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    pub fn with_parent_id(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = Some(collapsed);
        self
    }

    pub fn with_sort_by(mut self, sort_by: SortKey) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn with_order_desc(mut self) -> Self {
        self.order_by_desc = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether any equality criterion is set
    pub fn has_criteria(&self) -> bool {
        self.id.is_some()
            || self.space_id.is_some()
            || self.node_type.is_some()
            || self.parent_id.is_some()
            || self.collapsed.is_some()
    }

    pub fn matches(&self, node: &RawNode) -> bool {
        self.id.as_ref().map_or(true, |id| &node.id == id)
            && self
                .space_id
                .as_ref()
                .map_or(true, |space_id| &node.space_id == space_id)
            && self.node_type.map_or(true, |t| node.node_type == t)
            && self
                .parent_id
                .as_ref()
                .map_or(true, |parent_id| &node.parent_id == parent_id)
            && self.collapsed.map_or(true, |c| node.collapsed == c)
    }

    /// Filter, sort and truncate `nodes`
    pub fn apply<'a, I>(&self, nodes: I) -> Vec<&'a RawNode>
    where
        I: IntoIterator<Item = &'a RawNode>,
    {
        if !self.has_criteria() {
            return Vec::new();
        }

        let mut result: Vec<&RawNode> = nodes.into_iter().filter(|n| self.matches(n)).collect();

        if let Some(key) = self.sort_by {
            result.sort_by(|a, b| {
                let ord = key.compare(a, b);
                if self.order_by_desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            result.truncate(limit);
        }

        result
    }
}
