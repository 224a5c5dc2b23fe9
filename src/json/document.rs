//! Arena-backed JSON document model with lazy slots.

use crate::map::JsonMap;
use crate::{Error, Result};
use std::fmt;

/// Deepest nesting level a document accepts; the root sits at level 0.
pub const MAX_DEPTH: usize = 512;

/// Index of a node inside its owning [`JsonDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of a JSON document.
///
/// `Undefined` is the untyped state of a fresh document root; it becomes an
/// object or array the first time a child is committed into it.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Node {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<NodeId>),
    Object(JsonMap),
}

/// The type of a [`Node`] without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Undefined,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl NodeKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            NodeKind::Undefined => "undefined",
            NodeKind::Null => "null",
            NodeKind::Bool => "bool",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::Array => "array",
            NodeKind::Object => "object",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Node {
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Node::Undefined => NodeKind::Undefined,
            Node::Null => NodeKind::Null,
            Node::Bool(_) => NodeKind::Bool,
            Node::Number(_) => NodeKind::Number,
            Node::String(_) => NodeKind::String,
            Node::Array(_) => NodeKind::Array,
            Node::Object(_) => NodeKind::Object,
        }
    }

    /// `true` for `Null` and for the untyped `Undefined` state.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Node::Null | Node::Undefined)
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Number(value as f64)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Number(value as f64)
    }
}

impl From<u32> for Node {
    fn from(value: u32) -> Self {
        Node::Number(value as f64)
    }
}

impl From<f32> for Node {
    fn from(value: f32) -> Self {
        Node::Number(value as f64)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Number(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

/// One step of a path that does not exist yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathStep {
    /// A key of an object.
    Key(String),
    /// The next element of an array.
    Append,
}

/// The result of indexing into a document.
///
/// `Pending` is a lazy node: it names the deepest existing ancestor and the
/// path below it. Nothing is created until a value is assigned through
/// [`JsonDocument::set`].
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Node(NodeId),
    Pending { base: NodeId, path: Vec<PathStep> },
}

impl Slot {
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending { .. })
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Slot::Node(id) => Some(*id),
            Slot::Pending { .. } => None,
        }
    }
}

/// An in-memory JSON tree stored as an arena of [`Node`]s.
///
/// # Examples
///
/// ```rust
/// use omniser::json::{JsonDocument, Node, Slot};
///
/// let mut doc = JsonDocument::new();
/// let probe = doc.index_key(&Slot::Node(doc.root()), "score");
/// assert!(probe.is_pending());
/// assert_eq!(doc.len(doc.root()), 0);
///
/// doc.set(&probe, Node::from(10)).unwrap();
/// assert_eq!(doc.len(doc.root()), 1);
/// assert_eq!(doc.to_json_string(), r#"{"score":10}"#);
/// ```
#[derive(Clone, Debug)]
pub struct JsonDocument {
    nodes: Vec<Node>,
    depths: Vec<u16>,
    root: NodeId,
}

impl Default for JsonDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonDocument {
    /// Creates a document whose root is untyped.
    #[must_use]
    pub fn new() -> Self {
        JsonDocument {
            nodes: vec![Node::Undefined],
            depths: vec![0],
            root: NodeId(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node stored under `id`.
    ///
    /// `id` must come from this document.
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Nesting level of `id`, counted from the root.
    #[inline]
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        usize::from(self.depths[id.index()])
    }

    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    /// Number of children of an array or object node, `0` otherwise.
    #[must_use]
    pub fn len(&self, id: NodeId) -> usize {
        match self.node(id) {
            Node::Array(items) => items.len(),
            Node::Object(map) => map.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self, id: NodeId) -> bool {
        self.len(id) == 0
    }

    /// Looks up an existing key of an object node.
    #[must_use]
    pub fn get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.node(id) {
            Node::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Looks up an existing element of an array node.
    #[must_use]
    pub fn at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        match self.node(id) {
            Node::Array(items) => items.get(index).copied(),
            _ => None,
        }
    }

    /// Elements of an array node; empty for every other kind.
    #[must_use]
    pub fn elements(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Node::Array(items) => items,
            _ => &[],
        }
    }

    /// Entries of an object node.
    #[must_use]
    pub fn entries(&self, id: NodeId) -> Option<&JsonMap> {
        match self.node(id) {
            Node::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Keys of an object node in insertion order.
    pub fn keys(&self, id: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.entries(id)
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    /// Indexes `slot` by an object key.
    ///
    /// Returns [`Slot::Node`] when the key exists, otherwise a pending slot.
    #[must_use]
    pub fn index_key(&self, slot: &Slot, key: &str) -> Slot {
        match slot {
            Slot::Node(id) => match self.get(*id, key) {
                Some(child) => Slot::Node(child),
                None => Slot::Pending {
                    base: *id,
                    path: vec![PathStep::Key(key.to_string())],
                },
            },
            Slot::Pending { base, path } => {
                let mut path = path.clone();
                path.push(PathStep::Key(key.to_string()));
                Slot::Pending { base: *base, path }
            }
        }
    }

    /// Indexes `slot` by an array position.
    ///
    /// A position past the end yields a pending slot that appends.
    #[must_use]
    pub fn index_at(&self, slot: &Slot, index: usize) -> Slot {
        match slot {
            Slot::Node(id) => match self.at(*id, index) {
                Some(child) => Slot::Node(child),
                None => Slot::Pending {
                    base: *id,
                    path: vec![PathStep::Append],
                },
            },
            Slot::Pending { base, path } => {
                let mut path = path.clone();
                path.push(PathStep::Append);
                Slot::Pending { base: *base, path }
            }
        }
    }

    /// Assigns `node` through `slot`.
    ///
    /// An existing node is replaced in place. A pending slot commits itself:
    /// each missing ancestor is created, and an untyped parent becomes an
    /// object (key step) or an array (append step).
    ///
    /// # Errors
    ///
    /// Fails when a parent on the path is a scalar or a container of the
    /// other kind, when the path would nest deeper than [`MAX_DEPTH`], or
    /// when `node` is a container that already has children.
    pub fn set(&mut self, slot: &Slot, node: Node) -> Result<NodeId> {
        check_detached(&node)?;
        match slot {
            Slot::Node(id) => {
                self.nodes[id.index()] = node;
                Ok(*id)
            }
            Slot::Pending { base, path } => {
                if self.depth(*base) + path.len() > MAX_DEPTH {
                    return Err(too_deep());
                }
                let mut value = Some(node);
                let mut current = *base;
                for (i, step) in path.iter().enumerate() {
                    let child = if i + 1 == path.len() {
                        value.take().unwrap_or_default()
                    } else {
                        Node::Undefined
                    };
                    current = self.attach(current, step, child)?;
                }
                Ok(current)
            }
        }
    }

    /// Appends `node` to an array (or untyped) node.
    ///
    /// # Errors
    ///
    /// Fails when `parent` is neither an array nor untyped, or when the new
    /// node would nest deeper than [`MAX_DEPTH`].
    pub fn push(&mut self, parent: NodeId, node: Node) -> Result<NodeId> {
        self.attach(parent, &PathStep::Append, node)
    }

    /// Inserts `node` under `key` of an object (or untyped) node.
    ///
    /// # Errors
    ///
    /// Fails when `parent` is neither an object nor untyped, or when the new
    /// node would nest deeper than [`MAX_DEPTH`].
    pub fn insert(&mut self, parent: NodeId, key: &str, node: Node) -> Result<NodeId> {
        self.attach(parent, &PathStep::Key(key.to_string()), node)
    }

    /// Replaces the content of an existing node.
    ///
    /// # Errors
    ///
    /// Fails when `node` is a container that already has children; build
    /// containers empty and fill them through [`JsonDocument::insert`] and
    /// [`JsonDocument::push`].
    pub fn replace(&mut self, id: NodeId, node: Node) -> Result<()> {
        check_detached(&node)?;
        self.nodes[id.index()] = node;
        Ok(())
    }

    /// Installs a root whose children were allocated at depth 1 and below.
    pub(crate) fn replace_root(&mut self, node: Node) {
        let root = self.root.index();
        self.nodes[root] = node;
    }

    /// Appends a node at `depth`; callers keep `depth <= MAX_DEPTH`.
    pub(crate) fn alloc(&mut self, node: Node, depth: usize) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.depths.push(u16::try_from(depth).unwrap_or(u16::MAX));
        id
    }

    fn attach(&mut self, parent: NodeId, step: &PathStep, node: Node) -> Result<NodeId> {
        check_detached(&node)?;
        let depth = self.depth(parent) + 1;
        if depth > MAX_DEPTH {
            return Err(too_deep());
        }
        if self.kind(parent) == NodeKind::Undefined {
            self.nodes[parent.index()] = match step {
                PathStep::Key(_) => Node::Object(JsonMap::new()),
                PathStep::Append => Node::Array(Vec::new()),
            };
        }

        match step {
            PathStep::Key(key) => {
                if let Some(existing) = self.get(parent, key) {
                    self.nodes[existing.index()] = node;
                    return Ok(existing);
                }
                if self.kind(parent) != NodeKind::Object {
                    return Err(Error::invalid_format(
                        "json",
                        format!("cannot insert key {key:?} into a {} node", self.kind(parent)),
                    ));
                }
                let id = self.alloc(node, depth);
                if let Node::Object(map) = &mut self.nodes[parent.index()] {
                    map.insert(key.clone(), id);
                }
                Ok(id)
            }
            PathStep::Append => {
                if self.kind(parent) != NodeKind::Array {
                    return Err(Error::invalid_format(
                        "json",
                        format!("cannot append to a {} node", self.kind(parent)),
                    ));
                }
                let id = self.alloc(node, depth);
                if let Node::Array(items) = &mut self.nodes[parent.index()] {
                    items.push(id);
                }
                Ok(id)
            }
        }
    }

    fn same_tree(&self, a: NodeId, other: &JsonDocument, b: NodeId) -> bool {
        match (self.node(a), other.node(b)) {
            (Node::Array(left), Node::Array(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right)
                        .all(|(l, r)| self.same_tree(*l, other, *r))
            }
            (Node::Object(left), Node::Object(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|((lk, lv), (rk, rv))| lk == rk && self.same_tree(*lv, other, *rv))
            }
            (left, right) => left == right,
        }
    }
}

fn check_detached(node: &Node) -> Result<()> {
    let attached = match node {
        Node::Array(items) => !items.is_empty(),
        Node::Object(map) => !map.is_empty(),
        _ => false,
    };
    if attached {
        return Err(Error::invalid_format(
            "json",
            "a container must be empty when it is added to a document",
        ));
    }
    Ok(())
}

fn too_deep() -> Error {
    Error::invalid_format("json", format!("nesting deeper than {MAX_DEPTH} levels"))
}

/// Structural equality of the trees reachable from both roots.
impl PartialEq for JsonDocument {
    fn eq(&self, other: &Self) -> bool {
        self.same_tree(self.root, other, other.root)
    }
}
