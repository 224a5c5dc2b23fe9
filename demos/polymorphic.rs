//! Trait objects tagged with registered aliases.
//!
//! Run with: cargo run --example polymorphic

use omniser::{Engine, Format, OutputOptions, Polymorphic, Serializable, Serializer, TypeRegistry};
use std::error::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Circle {
    radius: f32,
}

impl Serializable for Circle {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("radius", &mut self.radius);
    }
}

impl Polymorphic for Circle {}

#[derive(Debug, Default)]
struct Rect {
    width: f32,
    height: f32,
}

impl Serializable for Rect {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("width", &mut self.width);
        s.field("height", &mut self.height);
    }

    fn object_version(&self) -> u16 {
        2
    }
}

impl Polymorphic for Rect {}

#[derive(Default)]
struct Scene {
    title: String,
    shapes: Vec<Box<dyn Polymorphic>>,
    focus: Option<Box<dyn Polymorphic>>,
}

impl Serializable for Scene {
    fn serialize(&mut self, s: &mut Serializer<'_>) {
        s.field("title", &mut self.title);
        s.polymorphic_list("shapes", &mut self.shapes);
        s.polymorphic("focus", &mut self.focus);
    }
}

fn describe(shape: &dyn Polymorphic) -> String {
    if let Some(circle) = shape.downcast_ref::<Circle>() {
        format!("circle r={}", circle.radius)
    } else if let Some(rect) = shape.downcast_ref::<Rect>() {
        format!("rect {}x{}", rect.width, rect.height)
    } else {
        format!("unknown {}", shape.type_name())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut registry = TypeRegistry::new();
    registry.register::<Circle>("circle").register::<Rect>("rect");
    let engine = Engine::new().with_registry(registry);

    let mut scene = Scene {
        title: "demo".to_string(),
        shapes: vec![
            Box::new(Circle { radius: 1.5 }),
            Box::new(Rect {
                width: 4.0,
                height: 3.0,
            }),
        ],
        focus: Some(Box::new(Circle { radius: 0.5 })),
    };

    for format in [Format::Json, Format::Xml, Format::Binary] {
        let out = engine.write(&mut scene, format, OutputOptions::PRETTY_PRINT)?.into_result()?;
        if let Some(text) = out.as_text() {
            println!("{format}:\n{text}\n");
        }

        let back = engine.read::<Scene>(out.as_bytes(), format)?.into_result()?;
        let shapes: Vec<String> = back.shapes.iter().map(|shape| describe(shape.as_ref())).collect();
        println!("{format} read back: {shapes:?}, focus: {:?}\n", back.focus.as_deref().map(describe));
    }

    // An alias the registry does not know is a soft error
    let outcome = engine.read::<Scene>(
        br#"{"title":"x","shapes":[{"__type":"hexagon","sides":6}]}"#,
        Format::Json,
    )?;
    println!("Unknown alias: {}", outcome.summary());

    Ok(())
}
