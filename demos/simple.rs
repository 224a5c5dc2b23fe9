//! Writing one object in every format and reading it back.
//!
//! Run with: cargo run --example simple
//! Set `RUST_LOG=omniser=debug` to see session logs.

use omniser::{Engine, Format, OutputOptions, Serializable, Serializer};
use std::error::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq)]
struct User {
    id: u32,
    name: String,
    email: String,
    tags: Vec<String>,
}

impl Serializable for User {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("id", &mut self.id);
        s.field("name", &mut self.name);
        s.field("email", &mut self.email);
        s.field("tags", &mut self.tags);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let engine = Engine::new();
    let mut user = User {
        id: 42,
        name: "Alice Johnson".to_string(),
        email: "alice@example.com".to_string(),
        tags: vec!["admin".to_string(), "ops".to_string()],
    };

    for format in [Format::Binary, Format::Gzip, Format::Json, Format::Xml] {
        let out = engine.write(&mut user, format, OutputOptions::empty())?.into_result()?;
        match out.as_text() {
            Some(text) => println!("{format} ({} bytes):\n{text}\n", out.len()),
            None => println!("{format} ({} bytes): {:02x?}\n", out.len(), out.as_bytes()),
        }

        // The format is detected from the leading bytes
        let back: User = omniser::from_slice(out.as_bytes())?;
        assert_eq!(back, user);
    }
    println!("✓ Round-trip successful in every format");

    // A broken document still yields a value, plus every problem found
    let outcome = engine.read::<User>(br#"{"id": "forty-two", "name": "Bob"}"#, Format::Json)?;
    println!("\nBest-effort read: {:?}", outcome.value);
    println!("Errors:\n{}", outcome.summary());

    Ok(())
}
