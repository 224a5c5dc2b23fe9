//! Working with the JSON document model directly.
//!
//! Run with: cargo run --example json_document

use omniser::json::{JsonDocument, Node, Slot};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let mut doc = JsonDocument::parse(
        r#"{
            "name": "Alice",
            "roles": ["admin", "dev"],
            "limits": {"cpu": 4, "memory": 8192}
        }"#,
    )?;
    let root = doc.root();

    let limits = doc.get(root, "limits").ok_or("missing limits")?;
    for key in doc.keys(limits) {
        println!("limit {key}");
    }

    // Probing a missing path does not change the document
    let probe = doc.index_key(&Slot::Node(root), "profile");
    let probe = doc.index_key(&probe, "theme");
    println!("pending: {}, keys: {}", probe.is_pending(), doc.len(root));

    // Assigning through the probe creates every missing level
    doc.set(&probe, Node::from("dark"))?;
    println!("after set, keys: {}", doc.len(root));

    println!("\nCompact:\n{doc}");
    println!("\nPretty:\n{}", doc.to_json_string_pretty(2));

    // Binary snapshot of the tree
    let snapshot = doc.to_snapshot();
    let restored = JsonDocument::from_snapshot(&snapshot)?;
    assert_eq!(restored, doc);
    println!("\n✓ Snapshot round-trip ({} bytes)", snapshot.len());

    // Serde interop
    let value = serde_json::to_value(&doc)?;
    println!("serde_json sees: {}", value["profile"]["theme"]);

    Ok(())
}
