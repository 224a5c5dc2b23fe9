//! JSON backend driven by [`JsonDocument`].
//!
//! Writing builds a document through lazy slots, so a field is only created
//! when a value is assigned to it. Reading walks a parsed document; a key that
//! does not exist is reported as missing, an explicit `null` as null.
//!
//! Values that JSON numbers cannot carry exactly are written as strings:
//! integers beyond ±2^53, and the non-finite floats `"NaN"`, `"Infinity"` and
//! `"-Infinity"`. Byte blobs are Base64 strings, GUIDs hyphenated strings.

use super::text::{format_float, format_text, parse_text};
use super::{FormatCursor, Key, Mismatch, Output, Presence, Scalar, ScalarKind, ScalarRef};
use crate::format::Format;
use crate::json::{JsonDocument, JsonMap, Node, NodeId, NodeKind, Slot};
use crate::options::{FieldOptions, OutputOptions};
use crate::{Error, Result};

const MAX_EXACT_INT: i128 = 1 << 53;

/// Cursor over a [`JsonDocument`].
#[derive(Debug)]
pub struct JsonCursor {
    reading: bool,
    doc: JsonDocument,
    stack: Vec<NodeId>,
    pending: Option<Slot>,
    indent: usize,
    fault: Option<Error>,
}

impl JsonCursor {
    /// Creates a cursor that builds a new document, pretty-printed with
    /// `indent` spaces per level when requested.
    #[must_use]
    pub fn writer(indent: usize) -> Self {
        JsonCursor {
            reading: false,
            doc: JsonDocument::new(),
            stack: Vec::new(),
            pending: None,
            indent,
            fault: None,
        }
    }

    /// Parses `text` and opens it for reading.
    ///
    /// # Errors
    ///
    /// Returns the parser's error for malformed text.
    pub fn reader(text: &str) -> Result<Self> {
        Ok(Self::from_document(JsonDocument::parse(text)?))
    }

    /// Opens an existing document for reading.
    #[must_use]
    pub fn from_document(doc: JsonDocument) -> Self {
        JsonCursor {
            reading: true,
            doc,
            ..Self::writer(0)
        }
    }

    /// The document built or read so far.
    #[must_use]
    pub fn document(&self) -> &JsonDocument {
        &self.doc
    }

    #[must_use]
    pub fn into_document(self) -> JsonDocument {
        self.doc
    }

    fn top(&self) -> NodeId {
        self.stack.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn child(&self, key: Key<'_>) -> Option<NodeId> {
        let parent = *self.stack.last()?;
        match key {
            Key::Name(name) => self.doc.get(parent, name),
            Key::Index(index) => self.doc.at(parent, index),
        }
    }

    fn slot(&self, key: Key<'_>) -> Slot {
        let parent = Slot::Node(self.top());
        match key {
            Key::Name(name) => self.doc.index_key(&parent, name),
            Key::Index(index) => self.doc.index_at(&parent, index),
        }
    }

    fn commit(&mut self, slot: &Slot, node: Node) -> NodeId {
        match self.doc.set(slot, node) {
            Ok(id) => id,
            Err(err) => {
                if self.fault.is_none() {
                    self.fault = Some(err);
                }
                self.top()
            }
        }
    }

    fn open_child(&mut self, key: Key<'_>, expected: NodeKind) -> Presence {
        let Some(id) = self.child(key) else {
            return Presence::Missing;
        };
        match self.doc.kind(id) {
            NodeKind::Null | NodeKind::Undefined => Presence::Null,
            kind if kind == expected => {
                self.stack.push(id);
                Presence::Present
            }
            kind => Presence::WrongKind(kind.name()),
        }
    }
}

fn to_node(value: ScalarRef<'_>) -> Node {
    match value {
        ScalarRef::Bool(b) => Node::Bool(b),
        ScalarRef::F32(v) if v.is_finite() => Node::Number(v as f64),
        ScalarRef::F64(v) if v.is_finite() => Node::Number(v),
        ScalarRef::F32(v) => Node::String(format_float(v as f64)),
        ScalarRef::F64(v) => Node::String(format_float(v)),
        ScalarRef::Str(s) => Node::String(s.to_string()),
        ScalarRef::Bytes(_) | ScalarRef::FourCC(_) | ScalarRef::Guid(_) => {
            Node::String(format_text(value))
        }
        int => match int.as_int() {
            Some(wide) if wide.abs() <= MAX_EXACT_INT => Node::Number(wide as f64),
            Some(wide) => Node::String(wide.to_string()),
            None => Node::Null,
        },
    }
}

fn from_node(node: &Node, kind: ScalarKind) -> std::result::Result<Scalar, Mismatch> {
    match (node, kind) {
        (Node::Bool(b), ScalarKind::Bool) => Ok(Scalar::Bool(*b)),
        (Node::Number(n), ScalarKind::F32) => Ok(Scalar::F32(*n as f32)),
        (Node::Number(n), ScalarKind::F64) => Ok(Scalar::F64(*n)),
        (Node::Number(n), kind) if kind.int_range().is_some() => {
            if n.fract() != 0.0 {
                return Err(Mismatch::new(kind.name(), format!("number {n}")));
            }
            Scalar::from_int(kind, *n as i128)
        }
        (Node::String(s), kind) if kind != ScalarKind::Bool => parse_text(kind, s),
        (other, kind) => Err(Mismatch::new(kind.name(), other.kind().name())),
    }
}

impl FormatCursor for JsonCursor {
    fn format(&self) -> Format {
        Format::Json
    }

    fn is_reading(&self) -> bool {
        self.reading
    }

    fn begin_write_root(&mut self) -> Result<()> {
        let root = self.doc.root();
        self.doc.replace(root, Node::Object(JsonMap::new()))?;
        self.stack.push(root);
        Ok(())
    }

    fn begin_read_root(&mut self) -> Result<()> {
        let root = self.doc.root();
        match self.doc.kind(root) {
            NodeKind::Object => {
                self.stack.push(root);
                Ok(())
            }
            kind => Err(Error::invalid_format(
                "json",
                format!("document root is {kind}, expected object"),
            )),
        }
    }

    fn end_root(&mut self) {
        self.stack.pop();
    }

    fn begin_read_value(&mut self, key: Key<'_>, _options: FieldOptions) -> Presence {
        let Some(id) = self.child(key) else {
            return Presence::Missing;
        };
        if self.doc.node(id).is_null() {
            return Presence::Null;
        }
        self.stack.push(id);
        Presence::Present
    }

    fn read_scalar(&mut self, kind: ScalarKind) -> std::result::Result<Scalar, Mismatch> {
        from_node(self.doc.node(self.top()), kind)
    }

    fn begin_write_value(&mut self, key: Key<'_>, _options: FieldOptions) {
        self.pending = Some(self.slot(key));
    }

    fn write_scalar(&mut self, value: ScalarRef<'_>) {
        if let Some(slot) = self.pending.take() {
            self.commit(&slot, to_node(value));
        }
    }

    fn end_value(&mut self) {
        if self.reading {
            self.stack.pop();
        } else {
            self.pending = None;
        }
    }

    fn write_null(&mut self, key: Key<'_>, _options: FieldOptions) {
        let slot = self.slot(key);
        self.commit(&slot, Node::Null);
    }

    fn begin_read_object(&mut self, key: Key<'_>) -> Presence {
        self.open_child(key, NodeKind::Object)
    }

    fn begin_write_object(&mut self, key: Key<'_>) {
        let slot = self.slot(key);
        let id = self.commit(&slot, Node::Object(JsonMap::new()));
        self.stack.push(id);
    }

    fn end_object(&mut self) {
        self.stack.pop();
    }

    fn begin_read_array(&mut self, key: Key<'_>) -> Presence {
        self.open_child(key, NodeKind::Array)
    }

    fn array_len(&self) -> usize {
        self.doc.len(self.top())
    }

    fn begin_write_array(&mut self, key: Key<'_>, len: usize) {
        let slot = self.slot(key);
        let id = self.commit(&slot, Node::Array(Vec::with_capacity(len)));
        self.stack.push(id);
    }

    fn end_array(&mut self) {
        self.stack.pop();
    }

    fn take_fault(&mut self) -> Option<Error> {
        self.fault.take()
    }

    fn finish(self: Box<Self>, options: OutputOptions) -> Result<Output> {
        let text = if options.contains(OutputOptions::PRETTY_PRINT) {
            self.doc.to_json_string_pretty(self.indent)
        } else {
            self.doc.to_json_string()
        };
        Ok(Output::Text(text))
    }
}
