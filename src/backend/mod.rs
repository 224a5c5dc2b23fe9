//! Format backends.
//!
//! Every wire format implements [`FormatCursor`]: a cursor with a stack of
//! "current node" positions that the [`Serializer`](crate::Serializer) drives
//! through balanced `begin_*` / `end_*` calls. The serializer never looks at
//! format details; it only sees [`Presence`] answers and [`Scalar`] values.
//!
//! - [`binary`]: tagged frames behind the `FBIN` magic
//! - [`gzip`]: binary frames inside a gzip stream behind the `FBGZ` magic
//! - [`json`]: built on [`JsonDocument`](crate::json::JsonDocument)
//! - [`xml`]: element tree with optional attribute placement

pub mod binary;
pub mod gzip;
pub mod json;
mod text;
pub mod xml;

pub use binary::BinaryCursor;
pub use gzip::GzipCursor;
pub use json::JsonCursor;
pub use xml::XmlCursor;

use crate::format::Format;
use crate::fourcc::FourCC;
use crate::options::{FieldOptions, OutputOptions};
use crate::{Error, Result};
use std::fmt;
use uuid::Uuid;

/// Addresses a child of the current node: a field name inside an object or a
/// position inside an array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key<'a> {
    Name(&'a str),
    Index(usize),
}

impl Key<'_> {
    #[inline]
    #[must_use]
    pub fn is_name(&self) -> bool {
        matches!(self, Key::Name(_))
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// What a cursor found when asked to open a child for reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// The child does not exist.
    Missing,
    /// The child exists and is an explicit null.
    Null,
    /// The child exists; the cursor now points at it.
    Present,
    /// The child exists but has another shape (for example a scalar where an
    /// object was expected). The cursor did not move.
    WrongKind(&'static str),
}

/// Primitive kinds a cursor can read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    U8,
    I8,
    I16,
    I32,
    I64,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Bytes,
    FourCC,
    Guid,
    /// Any integer width, returned as [`Scalar::I64`]. Used by enums.
    AnyInt,
}

impl ScalarKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::U8 => "u8",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Str => "string",
            ScalarKind::Bytes => "bytes",
            ScalarKind::FourCC => "fourcc",
            ScalarKind::Guid => "guid",
            ScalarKind::AnyInt => "integer",
        }
    }

    /// Inclusive integer range of the kind, `None` for non-integers.
    pub(crate) fn int_range(self) -> Option<(i128, i128)> {
        Some(match self {
            ScalarKind::U8 => (0, u8::MAX as i128),
            ScalarKind::I8 => (i8::MIN as i128, i8::MAX as i128),
            ScalarKind::I16 => (i16::MIN as i128, i16::MAX as i128),
            ScalarKind::I32 => (i32::MIN as i128, i32::MAX as i128),
            ScalarKind::I64 | ScalarKind::AnyInt => (i64::MIN as i128, i64::MAX as i128),
            ScalarKind::U16 => (0, u16::MAX as i128),
            ScalarKind::U32 => (0, u32::MAX as i128),
            ScalarKind::U64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

/// An owned primitive value produced by a read.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    FourCC(FourCC),
    Guid(Uuid),
}

impl Scalar {
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::U8(_) => ScalarKind::U8,
            Scalar::I8(_) => ScalarKind::I8,
            Scalar::I16(_) => ScalarKind::I16,
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::I64(_) => ScalarKind::I64,
            Scalar::U16(_) => ScalarKind::U16,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::U64(_) => ScalarKind::U64,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::F64(_) => ScalarKind::F64,
            Scalar::Str(_) => ScalarKind::Str,
            Scalar::Bytes(_) => ScalarKind::Bytes,
            Scalar::FourCC(_) => ScalarKind::FourCC,
            Scalar::Guid(_) => ScalarKind::Guid,
        }
    }

    /// Builds an integer scalar of `kind` from a wide value, checking range.
    pub(crate) fn from_int(kind: ScalarKind, value: i128) -> std::result::Result<Self, Mismatch> {
        let (min, max) = kind
            .int_range()
            .ok_or_else(|| Mismatch::new(kind.name(), "integer"))?;
        if value < min || value > max {
            return Err(Mismatch::new(kind.name(), format!("out-of-range integer {value}")));
        }
        // Range checked above
        Ok(match kind {
            ScalarKind::U8 => Scalar::U8(value as u8),
            ScalarKind::I8 => Scalar::I8(value as i8),
            ScalarKind::I16 => Scalar::I16(value as i16),
            ScalarKind::I32 => Scalar::I32(value as i32),
            ScalarKind::U16 => Scalar::U16(value as u16),
            ScalarKind::U32 => Scalar::U32(value as u32),
            ScalarKind::U64 => Scalar::U64(value as u64),
            _ => Scalar::I64(value as i64),
        })
    }
}

/// A borrowed primitive value handed to a write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarRef<'a> {
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
    FourCC(FourCC),
    Guid(Uuid),
}

impl ScalarRef<'_> {
    /// The value as a wide integer, `None` for non-integers.
    pub(crate) fn as_int(&self) -> Option<i128> {
        Some(match *self {
            ScalarRef::U8(v) => v as i128,
            ScalarRef::I8(v) => v as i128,
            ScalarRef::I16(v) => v as i128,
            ScalarRef::I32(v) => v as i128,
            ScalarRef::I64(v) => v as i128,
            ScalarRef::U16(v) => v as i128,
            ScalarRef::U32(v) => v as i128,
            ScalarRef::U64(v) => v as i128,
            _ => return None,
        })
    }
}

/// A read found a value of another kind than requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: &'static str,
    pub found: String,
}

impl Mismatch {
    pub fn new(expected: &'static str, found: impl Into<String>) -> Self {
        Mismatch {
            expected,
            found: found.into(),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

/// Rendered output of a write session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Bytes(Vec<u8>),
    Text(String),
}

impl Output {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Output::Bytes(bytes) => bytes,
            Output::Text(text) => text.as_bytes(),
        }
    }

    /// The output as text, `None` for raw binary output.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Output::Bytes(_) => None,
            Output::Text(text) => Some(text),
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Output::Bytes(bytes) => bytes,
            Output::Text(text) => text.into_bytes(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// A positioned reader or writer over one wire format.
///
/// A cursor is created for one direction and one session. `begin_*` calls
/// that return [`Presence::Present`] (or any `begin_write_*`) must be matched
/// by the corresponding `end_*` call; other presences leave the cursor where
/// it was.
///
/// A cursor that hits malformed input mid-walk keeps the first hard error as
/// a fault, answers [`Presence::Missing`] from then on, and hands the fault
/// back through [`FormatCursor::take_fault`].
pub trait FormatCursor {
    fn format(&self) -> Format;

    fn is_reading(&self) -> bool;

    /// `true` when an absent value cannot be expressed by leaving it out and
    /// must be written as an explicit null.
    fn requires_explicit_null(&self) -> bool {
        false
    }

    /// Opens the root object for writing.
    ///
    /// # Errors
    ///
    /// Fails if the cursor cannot start a document.
    fn begin_write_root(&mut self) -> Result<()>;

    /// Opens the root object for reading.
    ///
    /// # Errors
    ///
    /// Fails if the document has no object root.
    fn begin_read_root(&mut self) -> Result<()>;

    fn end_root(&mut self);

    /// Stores the serializer version in a format header. Returns `false` when
    /// the format has no header and the caller must write it as a root field.
    fn write_serializer_version(&mut self, _version: u16) -> bool {
        false
    }

    /// The serializer version from a format header, if the format has one.
    fn read_serializer_version(&mut self) -> Option<u16> {
        None
    }

    fn begin_read_value(&mut self, key: Key<'_>, options: FieldOptions) -> Presence;

    /// Reads the value opened by [`FormatCursor::begin_read_value`].
    ///
    /// # Errors
    ///
    /// Returns a [`Mismatch`] when the stored value has another kind.
    fn read_scalar(&mut self, kind: ScalarKind) -> std::result::Result<Scalar, Mismatch>;

    fn begin_write_value(&mut self, key: Key<'_>, options: FieldOptions);

    fn write_scalar(&mut self, value: ScalarRef<'_>);

    fn end_value(&mut self);

    /// Writes an explicit null under `key`.
    fn write_null(&mut self, key: Key<'_>, options: FieldOptions);

    fn begin_read_object(&mut self, key: Key<'_>) -> Presence;

    fn begin_write_object(&mut self, key: Key<'_>);

    fn end_object(&mut self);

    fn begin_read_array(&mut self, key: Key<'_>) -> Presence;

    /// Number of elements of the array opened for reading.
    fn array_len(&self) -> usize;

    /// Opens an array for writing, declaring its element count up front.
    fn begin_write_array(&mut self, key: Key<'_>, len: usize);

    fn end_array(&mut self);

    /// Takes the hard error recorded during the walk, if any.
    ///
    /// Cursors that validate their whole input before the walk starts, such
    /// as [`XmlCursor`], have nothing to record and keep this default. A
    /// structural surprise inside an already parsed tree then shows up as a
    /// per-field mismatch.
    fn take_fault(&mut self) -> Option<Error> {
        None
    }

    /// Renders the written document.
    ///
    /// # Errors
    ///
    /// Fails if the document cannot be encoded.
    fn finish(self: Box<Self>, options: OutputOptions) -> Result<Output>;
}
