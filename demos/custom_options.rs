//! Engine options, output flags and per-field options.
//!
//! Run with: cargo run --example custom_options

use omniser::{Engine, EngineOptions, FieldOptions, Format, OutputOptions, Serializable, Serializer};
use std::error::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
struct Config {
    name: String,
    version: String,
    workers: u16,
    debug: bool,
    motd: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: String::new(),
            version: "1.0.0".to_string(),
            workers: 4,
            debug: false,
            motd: None,
        }
    }
}

impl Serializable for Config {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field_with("name", &mut self.name, FieldOptions::PREFER_ATTRIBUTE);
        s.field_or_with("version", &mut self.version, "1.0.0".to_string(), FieldOptions::PREFER_ATTRIBUTE);
        s.field_or("workers", &mut self.workers, 4);
        s.field_or("debug", &mut self.debug, false);
        s.field_with("motd", &mut self.motd, FieldOptions::OPTIONAL);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = Config {
        name: "MyApp".to_string(),
        workers: 16,
        motd: Some("hello".to_string()),
        ..Config::default()
    };

    // Defaults are left out of text formats
    println!("Default engine (JSON):");
    let out = Engine::new().write(&mut config, Format::Json, OutputOptions::empty())?;
    println!("{}\n", out.value.as_text().unwrap_or_default());

    // Pretty output with four-space indentation and a custom XML root
    let engine = Engine::with_options(
        EngineOptions::new()
            .with_indent(4)
            .with_xml_root("config")
            .with_serializer_version(2),
    );
    println!("Pretty JSON:");
    let out = engine.write(&mut config, Format::Json, OutputOptions::PRETTY_PRINT)?;
    println!("{}\n", out.value.as_text().unwrap_or_default());

    println!("Pretty XML (attributes for name and version):");
    let out = engine.write(&mut config, Format::Xml, OutputOptions::PRETTY_PRINT)?;
    println!("{}\n", out.value.as_text().unwrap_or_default());

    // Binary formats can travel as text
    println!("Gzip as Base64:");
    let out = engine.write(&mut config, Format::Gzip, OutputOptions::BASE64)?;
    let text = out.value.as_text().unwrap_or_default().to_string();
    println!("{text}\n");

    let back: Config = omniser::from_str(&text)?;
    assert_eq!(back, config);
    println!("✓ Base64 round-trip successful");

    Ok(())
}
