//! In-memory JSON document model.
//!
//! A [`JsonDocument`] owns every [`Node`] of its tree in an arena addressed by
//! [`NodeId`]. Indexing a key or position that does not exist returns a
//! pending [`Slot`] instead of creating anything, so a reader can ask "is this
//! missing?" without changing the document. Assigning through a pending slot
//! commits the path.
//!
//! The document is also the working model of the JSON backend: the serializer
//! builds one while writing and walks one while reading.
//!
//! ## Examples
//!
//! ```rust
//! use omniser::json::{JsonDocument, Node, Slot};
//!
//! let mut doc = JsonDocument::parse(r#"{"name": "Alice", "tags": ["a", "b"]}"#).unwrap();
//! let root = doc.root();
//!
//! let tags = doc.get(root, "tags").unwrap();
//! assert_eq!(doc.len(tags), 2);
//!
//! let score = doc.index_key(&Slot::Node(root), "score");
//! doc.set(&score, Node::from(99)).unwrap();
//!
//! assert_eq!(
//!     doc.to_json_string(),
//!     r#"{"name":"Alice","tags":["a","b"],"score":99}"#
//! );
//! ```

mod document;
mod parser;
mod serde_impl;
mod snapshot;
mod write;

pub use document::{JsonDocument, Node, NodeId, NodeKind, PathStep, Slot, MAX_DEPTH};
pub use crate::map::JsonMap;
