//! Binary snapshot codec for a document tree.
//!
//! Each node is one tag byte followed by its payload. Numbers are 8-byte
//! little-endian floats, strings and arrays carry a 32-bit little-endian length,
//! and objects carry an entry count followed by `(key, node)` pairs.

use super::{JsonDocument, Node, MAX_DEPTH};
use crate::map::JsonMap;
use crate::{Error, Result};

const TAG_NULL: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_NUMBER: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_ARRAY: u8 = 5;
const TAG_OBJECT: u8 = 6;
const TAG_UNDEFINED: u8 = 7;

impl JsonDocument {
    /// Encodes the tree reachable from the root.
    ///
    /// ```rust
    /// use omniser::json::JsonDocument;
    ///
    /// let doc = JsonDocument::parse(r#"{"a": [1, "x", null]}"#).unwrap();
    /// let bytes = doc.to_snapshot();
    /// assert_eq!(JsonDocument::from_snapshot(&bytes).unwrap(), doc);
    /// ```
    #[must_use]
    pub fn to_snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        encode(self, self.root(), &mut out);
        out
    }

    /// Decodes a tree produced by [`JsonDocument::to_snapshot`].
    ///
    /// # Errors
    ///
    /// Fails on an unknown tag, truncated payload, invalid UTF-8, nesting
    /// deeper than [`MAX_DEPTH`] levels or trailing bytes.
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self> {
        let mut doc = JsonDocument::new();
        let mut reader = SnapshotReader { bytes, pos: 0 };
        let node = decode(&mut doc, &mut reader, 0)?;
        if reader.pos != bytes.len() {
            return Err(Error::invalid_format(
                "snapshot",
                format!("{} trailing bytes", bytes.len() - reader.pos),
            ));
        }
        doc.replace_root(node);
        Ok(doc)
    }
}

fn encode(doc: &JsonDocument, id: super::NodeId, out: &mut Vec<u8>) {
    match doc.node(id) {
        Node::Undefined => out.push(TAG_UNDEFINED),
        Node::Null => out.push(TAG_NULL),
        Node::Bool(false) => out.push(TAG_FALSE),
        Node::Bool(true) => out.push(TAG_TRUE),
        Node::Number(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&n.to_le_bytes());
        }
        Node::String(s) => {
            out.push(TAG_STRING);
            put_str(s, out);
        }
        Node::Array(items) => {
            out.push(TAG_ARRAY);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                encode(doc, *item, out);
            }
        }
        Node::Object(map) => {
            out.push(TAG_OBJECT);
            out.extend_from_slice(&(map.len() as u32).to_le_bytes());
            for (key, value) in map {
                put_str(key, out);
                encode(doc, *value, out);
            }
        }
    }
}

fn put_str(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

struct SnapshotReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SnapshotReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| Error::unexpected_eof("snapshot payload"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(f64::from_le_bytes(buf))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|e| Error::invalid_format("snapshot", e))
    }
}

fn decode(doc: &mut JsonDocument, reader: &mut SnapshotReader<'_>, depth: usize) -> Result<Node> {
    if depth > MAX_DEPTH {
        return Err(Error::invalid_format("snapshot", "nesting too deep"));
    }
    let node = match reader.byte()? {
        TAG_NULL => Node::Null,
        TAG_FALSE => Node::Bool(false),
        TAG_TRUE => Node::Bool(true),
        TAG_NUMBER => Node::Number(reader.f64()?),
        TAG_STRING => Node::String(reader.string()?),
        TAG_UNDEFINED => Node::Undefined,
        TAG_ARRAY => {
            let count = reader.u32()? as usize;
            // Count comes from untrusted input; grow as children decode
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let child = decode(doc, reader, depth + 1)?;
                items.push(doc.alloc(child, depth + 1));
            }
            Node::Array(items)
        }
        TAG_OBJECT => {
            let count = reader.u32()? as usize;
            let mut map = JsonMap::with_capacity(count.min(1024));
            for _ in 0..count {
                let key = reader.string()?;
                let child = decode(doc, reader, depth + 1)?;
                let id = doc.alloc(child, depth + 1);
                map.insert(key, id);
            }
            Node::Object(map)
        }
        tag => {
            return Err(Error::invalid_format(
                "snapshot",
                format!("unknown tag {tag}"),
            ))
        }
    };
    Ok(node)
}
