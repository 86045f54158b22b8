//! Data Models
//!
//! This module contains the core data structures used throughout NodeTree:
//!
//! - `RawNode` - Flat persisted node record
//! - `Node` - Read-oriented view with classification predicates and content hash
//! - `TreeItem` / `FlattenedNode` - Display projections, never persisted
//! - `element` / `document` - Inspection and path addressing over editor content

pub mod document;
pub mod element;
mod node;

pub use document::DocumentPath;
pub use node::{
    content_hash, FlattenedNode, Node, NodeFilter, NodeType, NodeUpdate, RawNode, SortKey,
    TreeItem,
};
