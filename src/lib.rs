//! # omniser
//!
//! A dual-mode object serialization engine with four interchangeable wire
//! formats: tagged binary frames, gzip-compressed binary, JSON and XML.
//!
//! ## Key Features
//!
//! - **One method, two directions**: a type lists its fields once in
//!   [`Serializable::serialize`]; the same walk reads or writes
//! - **Best-effort reads**: type mismatches and missing fields are collected
//!   in an [`ErrorLog`] instead of aborting, so one pass shows every problem
//! - **Schema evolution**: per-object versions, defaults that are elided on
//!   write, and optional fields that read as their default when absent
//! - **Polymorphism**: trait objects are tagged with a registered alias and
//!   restored as their concrete type
//! - **Format detection**: every document starts with a recognizable prefix,
//!   and any format can travel as Base64 text
//!
//! ## Quick Start
//!
//! ```rust
//! use omniser::{Engine, Format, OutputOptions, Serializable, Serializer};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! impl Serializable for User {
//!     fn serialize(&mut self, s: &mut Serializer<'_>) {
//!         s.field("id", &mut self.id);
//!         s.field("name", &mut self.name);
//!         s.field("tags", &mut self.tags);
//!     }
//! }
//!
//! let engine = Engine::new();
//! let mut user = User { id: 7, name: "Ada".into(), tags: vec!["admin".into()] };
//!
//! for format in [Format::Binary, Format::Gzip, Format::Json, Format::Xml] {
//!     let out = engine.write(&mut user, format, OutputOptions::empty()).unwrap();
//!     let back = engine.read::<User>(out.value.as_bytes(), Format::AutoDetect).unwrap();
//!     assert_eq!(back.into_result().unwrap(), user);
//! }
//! ```
//!
//! ### Soft errors
//!
//! ```rust
//! use omniser::{Engine, Format, Serializable, Serializer};
//!
//! #[derive(Default)]
//! struct Player {
//!     name: String,
//!     level: u8,
//! }
//!
//! impl Serializable for Player {
//!     fn serialize(&mut self, s: &mut Serializer<'_>) {
//!         s.field("name", &mut self.name);
//!         s.field("level", &mut self.level);
//!     }
//! }
//!
//! let outcome = Engine::new()
//!     .read::<Player>(br#"{"level":"high"}"#, Format::Json)
//!     .unwrap();
//! assert!(outcome.has_errors());
//! assert_eq!(
//!     outcome.summary(),
//!     "name: missing required field\nlevel: expected u8, found text \"high\""
//! );
//! ```
//!
//! ## Formats
//!
//! | Format | Prefix | Absent values |
//! |--------|--------|---------------|
//! | [`Format::Binary`] | `FBIN!` | explicit `NULL` frame |
//! | [`Format::Gzip`] | `FBGZ!` | explicit `NULL` frame |
//! | [`Format::Json`] | `{` | key omitted |
//! | [`Format::Xml`] | `<` | element omitted |
//!
//! The [`json`] module also exposes the arena-based [`JsonDocument`] used by
//! the JSON backend, with its own parser and printers.

pub mod backend;
pub mod engine;
pub mod error;
pub mod field;
pub mod format;
pub mod fourcc;
pub mod json;
pub mod macros;
pub mod map;
pub mod object;
pub mod options;
pub mod registry;
pub mod serializer;

pub use backend::{FormatCursor, Key, Mismatch, Output, Presence, Scalar, ScalarKind, ScalarRef};
pub use engine::{Engine, Outcome};
pub use error::{Error, ErrorLog, Result};
pub use field::{Blob, Field, Shape};
pub use format::{Format, Transport};
pub use fourcc::{CaseMode, FourCC, FourCCError};
pub use json::{JsonDocument, Node, NodeId, NodeKind, Slot};
pub use map::JsonMap;
pub use object::{AsAny, IntWidth, Polymorphic, Proxy, SerialEnum, Serializable, SerializerContext};
pub use options::{EngineOptions, FieldOptions, OutputOptions, DEFAULT_MAX_INFLATED_SIZE};
pub use registry::{Registration, TypeRegistry};
pub use serializer::{Serializer, SERIALIZER_VERSION_KEY, TYPE_KEY, VERSION_KEY};

use std::io;

/// Writes `value` with a default [`Engine`].
///
/// # Examples
///
/// ```rust
/// use omniser::{to_output, Format, Serializable, Serializer};
///
/// #[derive(Default)]
/// struct Point { x: i32, y: i32 }
///
/// impl Serializable for Point {
///     fn serialize(&mut self, s: &mut Serializer<'_>) {
///         s.field("x", &mut self.x);
///         s.field("y", &mut self.y);
///     }
/// }
///
/// let out = to_output(&mut Point { x: 1, y: 2 }, Format::Json).unwrap();
/// assert_eq!(out.as_text(), Some(r#"{"x":1,"y":2}"#));
/// ```
///
/// # Errors
///
/// Returns an error if the document cannot be rendered or a field failed to
/// write.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_output<T>(value: &mut T, format: Format) -> Result<Output>
where
    T: ?Sized + Serializable,
{
    Engine::new()
        .write(value, format, OutputOptions::empty())?
        .into_result()
}

/// Writes `value` to `writer` with a default [`Engine`].
///
/// # Errors
///
/// Returns an error if the document cannot be rendered, a field failed to
/// write, or the writer fails.
pub fn to_writer<W, T>(writer: W, value: &mut T, format: Format) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serializable,
{
    Engine::new()
        .write_to(value, writer, format, OutputOptions::empty())?
        .into_result(())
}

/// Reads a `T` from bytes in any format, detected from its prefix.
///
/// # Examples
///
/// ```rust
/// use omniser::{from_slice, Serializable, Serializer};
///
/// #[derive(Default)]
/// struct Point { x: i32, y: i32 }
///
/// impl Serializable for Point {
///     fn serialize(&mut self, s: &mut Serializer<'_>) {
///         s.field("x", &mut self.x);
///         s.field("y", &mut self.y);
///     }
/// }
///
/// let point: Point = from_slice(b"<root x=\"3\"><y>4</y></root>").unwrap();
/// assert_eq!((point.x, point.y), (3, 4));
/// ```
///
/// # Errors
///
/// Returns an error if the input is malformed or any field failed to read.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(input: &[u8]) -> Result<T>
where
    T: Serializable + Default,
{
    Engine::new().read(input, Format::AutoDetect)?.into_result()
}

/// Reads a `T` from JSON or XML text, or Base64-wrapped text of any format.
///
/// # Errors
///
/// Returns an error if the input is malformed or any field failed to read.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T>(input: &str) -> Result<T>
where
    T: Serializable + Default,
{
    from_slice(input.as_bytes())
}

/// Reads a `T` from everything `reader` yields.
///
/// # Errors
///
/// Returns an error if reading fails, the input is malformed or any field
/// failed to read.
pub fn from_reader<R, T>(reader: R) -> Result<T>
where
    R: io::Read,
    T: Serializable + Default,
{
    Engine::new()
        .read_from(reader, Format::AutoDetect)?
        .into_result()
}
