//! Serde interop: a [`JsonDocument`] serializes as its tree and deserializes
//! from any self-describing format.

use super::{JsonDocument, Node, NodeId, MAX_DEPTH};
use crate::map::JsonMap;
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Serialize for JsonDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        NodeRef {
            doc: self,
            id: self.root(),
        }
        .serialize(serializer)
    }
}

struct NodeRef<'a> {
    doc: &'a JsonDocument,
    id: NodeId,
}

impl Serialize for NodeRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.doc.node(self.id) {
            Node::Undefined | Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(n) => {
                if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Node::String(s) => serializer.serialize_str(s),
            Node::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&NodeRef {
                        doc: self.doc,
                        id: *item,
                    })?;
                }
                seq.end()
            }
            Node::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(
                        key,
                        &NodeRef {
                            doc: self.doc,
                            id: *value,
                        },
                    )?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for JsonDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut doc = JsonDocument::new();
        let node = NodeSeed {
            doc: &mut doc,
            depth: 0,
        }
        .deserialize(deserializer)?;
        doc.replace_root(node);
        Ok(doc)
    }
}

struct NodeSeed<'a> {
    doc: &'a mut JsonDocument,
    depth: usize,
}

impl<'de> DeserializeSeed<'de> for NodeSeed<'_> {
    type Value = Node;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        if self.depth > MAX_DEPTH {
            return Err(de::Error::custom(format_args!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }
        deserializer.deserialize_any(NodeVisitor {
            doc: self.doc,
            depth: self.depth,
        })
    }
}

struct NodeVisitor<'a> {
    doc: &'a mut JsonDocument,
    depth: usize,
}

impl<'de> Visitor<'de> for NodeVisitor<'_> {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Number(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E> {
        Ok(Node::Number(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Number(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_none<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        NodeSeed {
            doc: self.doc,
            depth: self.depth,
        }
        .deserialize(deserializer)
    }

    fn visit_unit<E>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let (doc, depth) = (self.doc, self.depth + 1);
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(child) = seq.next_element_seed(NodeSeed {
            doc: &mut *doc,
            depth,
        })? {
            items.push(doc.alloc(child, depth));
        }
        Ok(Node::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let (doc, depth) = (self.doc, self.depth + 1);
        let mut entries = JsonMap::new();
        while let Some(key) = map.next_key::<String>()? {
            let child = map.next_value_seed(NodeSeed {
                doc: &mut *doc,
                depth,
            })?;
            let id = doc.alloc(child, depth);
            entries.insert(key, id);
        }
        Ok(Node::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_json_round_trip() {
        let doc = JsonDocument::parse(r#"{"a": [1, 2.5, "x"], "b": null, "c": true}"#).unwrap();
        let text = serde_json::to_string(&doc).unwrap();
        assert_eq!(text, r#"{"a":[1,2.5,"x"],"b":null,"c":true}"#);

        let back: JsonDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_deserialize_rejects_deep_nesting() {
        let mut value = serde_json::Value::Null;
        for _ in 0..=MAX_DEPTH {
            value = serde_json::Value::Array(vec![value]);
        }
        assert!(serde_json::from_value::<JsonDocument>(value).is_err());
    }

    #[test]
    fn test_from_serde_json_value() {
        let value = serde_json::json!({"nested": {"list": [1, {"k": "v"}]}});
        let doc: JsonDocument = serde_json::from_value(value).unwrap();
        assert_eq!(doc.to_json_string(), r#"{"nested":{"list":[1,{"k":"v"}]}}"#);
    }
}
