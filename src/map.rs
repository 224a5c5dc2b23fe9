//! Ordered map type for JSON objects.
//!
//! [`JsonMap`] wraps an [`IndexMap`] from keys to [`NodeId`]s of the owning
//! [`JsonDocument`](crate::json::JsonDocument). Insertion order is preserved so
//! that stringifying a document reproduces the order fields were written in.
//!
//! ## Examples
//!
//! ```rust
//! use omniser::json::{JsonDocument, Node};
//!
//! let mut doc = JsonDocument::new();
//! let root = doc.root();
//! doc.insert(root, "name", Node::from("Alice")).unwrap();
//! doc.insert(root, "age", Node::from(30)).unwrap();
//!
//! let keys: Vec<_> = doc.keys(root).collect();
//! assert_eq!(keys, vec!["name", "age"]);
//! ```

use crate::json::NodeId;
use indexmap::IndexMap;

/// An insertion-ordered map of string keys to document nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonMap(IndexMap<String, NodeId>);

impl JsonMap {
    #[must_use]
    pub fn new() -> Self {
        JsonMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        JsonMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key, returning the node previously stored under it.
    pub fn insert(&mut self, key: String, node: NodeId) -> Option<NodeId> {
        self.0.insert(key, node)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.0.get(key).copied()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<NodeId> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the keys of the map, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, NodeId> {
        self.0.keys()
    }

    /// Returns an iterator over the node ids of the map, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, NodeId> {
        self.0.values()
    }

    /// Returns an iterator over the entries of the map, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, NodeId> {
        self.0.iter()
    }
}

impl IntoIterator for JsonMap {
    type Item = (String, NodeId);
    type IntoIter = indexmap::map::IntoIter<String, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a JsonMap {
    type Item = (&'a String, &'a NodeId);
    type IntoIter = indexmap::map::Iter<'a, String, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, NodeId)> for JsonMap {
    fn from_iter<T: IntoIterator<Item = (String, NodeId)>>(iter: T) -> Self {
        JsonMap(IndexMap::from_iter(iter))
    }
}
