//! Compact and indented stringifiers.

use super::{JsonDocument, Node, NodeId};
use std::fmt;

impl JsonDocument {
    /// Renders the document without any whitespace.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        self.node_to_json_string(self.root())
    }

    /// Renders the subtree under `id` without any whitespace.
    #[must_use]
    pub fn node_to_json_string(&self, id: NodeId) -> String {
        let mut out = String::with_capacity(128);
        write_compact(self, id, &mut out);
        out
    }

    /// Renders the document with `indent` spaces per nesting level.
    ///
    /// ```rust
    /// use omniser::json::JsonDocument;
    ///
    /// let doc = JsonDocument::parse(r#"{"a":[1,2],"b":{}}"#).unwrap();
    /// assert_eq!(
    ///     doc.to_json_string_pretty(2),
    ///     "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {}\n}"
    /// );
    /// ```
    #[must_use]
    pub fn to_json_string_pretty(&self, indent: usize) -> String {
        let mut out = String::with_capacity(256);
        write_indented(self, self.root(), indent, 0, &mut out);
        out
    }
}

impl fmt::Display for JsonDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

fn write_compact(doc: &JsonDocument, id: NodeId, out: &mut String) {
    match doc.node(id) {
        Node::Undefined | Node::Null => out.push_str("null"),
        Node::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Node::Number(n) => write_number(*n, out),
        Node::String(s) => write_string(s, out),
        Node::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_compact(doc, *item, out);
            }
            out.push(']');
        }
        Node::Object(map) => {
            out.push('{');
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_compact(doc, *value, out);
            }
            out.push('}');
        }
    }
}

fn write_indented(doc: &JsonDocument, id: NodeId, indent: usize, level: usize, out: &mut String) {
    match doc.node(id) {
        Node::Array(items) if !items.is_empty() => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(indent, level + 1, out);
                write_indented(doc, *item, indent, level + 1, out);
            }
            newline(indent, level, out);
            out.push(']');
        }
        Node::Object(map) if !map.is_empty() => {
            out.push('{');
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(indent, level + 1, out);
                write_string(key, out);
                out.push_str(": ");
                write_indented(doc, *value, indent, level + 1, out);
            }
            newline(indent, level, out);
            out.push('}');
        }
        _ => write_compact(doc, id, out),
    }
}

fn newline(indent: usize, level: usize, out: &mut String) {
    out.push('\n');
    out.extend(std::iter::repeat(' ').take(indent * level));
}

fn write_number(n: f64, out: &mut String) {
    if n.is_finite() {
        out.push_str(&n.to_string());
    } else {
        out.push_str("null");
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::Node;

    #[test]
    fn test_escaping_round_trips() {
        let mut doc = JsonDocument::new();
        let root = doc.root();
        doc.insert(root, "s", Node::from("q\"b\\n\nt\tc\u{1}"))
            .unwrap();
        let text = doc.to_json_string();
        assert_eq!(text, r#"{"s":"q\"b\\n\nt\tc\u0001"}"#);
        assert_eq!(JsonDocument::parse(&text).unwrap(), doc);
    }

    #[test]
    fn test_numbers() {
        let doc = JsonDocument::parse("[1, -2.5, 0.1, 1e21]").unwrap();
        assert_eq!(doc.to_json_string(), "[1,-2.5,0.1,1000000000000000000000]");
    }

    #[test]
    fn test_empty_containers_pretty() {
        let doc = JsonDocument::parse("{\"a\": [], \"b\": {}}").unwrap();
        assert_eq!(doc.to_json_string_pretty(4), "{\n    \"a\": [],\n    \"b\": {}\n}");
    }

    #[test]
    fn test_undefined_root_renders_null() {
        assert_eq!(JsonDocument::new().to_json_string(), "null");
    }
}
