//! Tagged-frame binary backend.
//!
//! A document is a flat stream of frames. Each frame is a one-byte tag
//! followed by a tag-specific payload:
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `NULL` | none |
//! | `BOOL`, `BYTE` | 1 byte |
//! | `INT16`, `UINT16` | 2 bytes LE |
//! | `INT32`, `UINT32`, `SINGLE` | 4 bytes LE |
//! | `INT64`, `UINT64`, `DOUBLE` | 8 bytes LE |
//! | `FOURCC` | 4 bytes, big-endian |
//! | `GUID` | 16 bytes, RFC 4122 order |
//! | `STRING`, `BINARY` | `u32` LE length + bytes |
//! | `ARRAY`, `OBJECT` | `u32` LE child count + child frames |
//!
//! Frames carry no keys: object fields are positional, in the order the
//! serializer visits them. Every field produces exactly one frame (absent
//! values become `NULL`), so an object's child count tells a reader where the
//! written fields end. Fields added after a document was written read as
//! missing; extra trailing fields are skipped.

use super::{FormatCursor, Key, Mismatch, Output, Presence, Scalar, ScalarKind, ScalarRef};
use crate::format::Format;
use crate::fourcc::FourCC;
use crate::options::{FieldOptions, OutputOptions};
use crate::{Error, Result};
use tracing::warn;
use uuid::Uuid;

/// Frame tags.
pub mod tag {
    pub const NULL: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const BYTE: u8 = 2;
    pub const DOUBLE: u8 = 3;
    pub const INT16: u8 = 4;
    pub const INT32: u8 = 5;
    pub const INT64: u8 = 6;
    pub const SINGLE: u8 = 7;
    pub const STRING: u8 = 8;
    pub const UINT16: u8 = 9;
    pub const UINT32: u8 = 10;
    pub const UINT64: u8 = 11;
    pub const BINARY: u8 = 12;
    pub const FOURCC: u8 = 13;
    pub const ARRAY: u8 = 14;
    pub const OBJECT: u8 = 15;
    pub const GUID: u8 = 16;

    pub fn name(tag: u8) -> &'static str {
        match tag {
            NULL => "null",
            BOOL => "bool",
            BYTE => "byte",
            DOUBLE => "double",
            INT16 => "int16",
            INT32 => "int32",
            INT64 => "int64",
            SINGLE => "single",
            STRING => "string",
            UINT16 => "uint16",
            UINT32 => "uint32",
            UINT64 => "uint64",
            BINARY => "binary",
            FOURCC => "fourcc",
            ARRAY => "array",
            OBJECT => "object",
            GUID => "guid",
            _ => "unknown tag",
        }
    }
}

const MAX_DEPTH: usize = 512;

#[derive(Debug)]
struct OpenFrame {
    count_at: usize,
    written: u32,
    declared: Option<usize>,
}

enum Decoded {
    Scalar(Scalar),
    /// Integer frames widen through `i128` and are range-checked per kind.
    Int(i128),
}

#[derive(Debug)]
struct Level {
    len: u32,
    remaining: u32,
}

/// Cursor over binary frames, without the `FBIN` header.
#[derive(Debug)]
pub struct BinaryCursor {
    reading: bool,
    buf: Vec<u8>,
    pos: usize,
    open: Vec<OpenFrame>,
    levels: Vec<Level>,
    pending: bool,
    fault: Option<Error>,
}

impl BinaryCursor {
    /// Creates a cursor that writes a new frame stream.
    #[must_use]
    pub fn writer() -> Self {
        BinaryCursor {
            reading: false,
            buf: Vec::with_capacity(256),
            pos: 0,
            open: Vec::new(),
            levels: Vec::new(),
            pending: false,
            fault: None,
        }
    }

    /// Creates a cursor that reads an existing frame stream.
    #[must_use]
    pub fn reader(frames: Vec<u8>) -> Self {
        BinaryCursor {
            reading: true,
            buf: frames,
            ..Self::writer()
        }
    }

    /// Consumes a writer and returns the raw frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<u8> {
        self.buf
    }

    // ---- writing ----

    fn note_child(&mut self) {
        if let Some(top) = self.open.last_mut() {
            top.written += 1;
        }
    }

    fn open_frame(&mut self, frame_tag: u8, declared: Option<usize>) {
        self.buf.push(frame_tag);
        let count_at = self.buf.len();
        let initial = declared.unwrap_or(0) as u32;
        self.buf.extend_from_slice(&initial.to_le_bytes());
        self.open.push(OpenFrame {
            count_at,
            written: 0,
            declared,
        });
    }

    fn close_frame(&mut self) {
        let Some(frame) = self.open.pop() else {
            return;
        };
        if let Some(declared) = frame.declared {
            if declared != frame.written as usize {
                warn!(
                    declared,
                    written = frame.written,
                    "binary array length differs from declared count"
                );
            }
        }
        self.buf[frame.count_at..frame.count_at + 4].copy_from_slice(&frame.written.to_le_bytes());
    }

    fn put_len_prefixed(&mut self, frame_tag: u8, bytes: &[u8]) {
        self.buf.push(frame_tag);
        self.buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(bytes);
    }

    fn put_fixed(&mut self, frame_tag: u8, bytes: &[u8]) {
        self.buf.push(frame_tag);
        self.buf.extend_from_slice(bytes);
    }

    // ---- reading ----

    fn fail(&mut self, err: Error) {
        if self.fault.is_none() {
            self.fault = Some(err);
        }
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| Error::unexpected_eof("binary frame payload"))?;
        let start = self.pos;
        self.pos = end;
        Ok(&self.buf[start..end])
    }

    fn fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.fixed()?))
    }

    fn read_len_prefixed(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Peeks the tag of the next child of the current level, if any remains.
    fn peek_child(&mut self) -> Option<u8> {
        if self.fault.is_some() {
            return None;
        }
        let remaining = self.levels.last().map_or(0, |level| level.remaining);
        if remaining == 0 {
            return None;
        }
        match self.buf.get(self.pos) {
            Some(&frame_tag) => Some(frame_tag),
            None => {
                self.fail(Error::unexpected_eof("binary frame"));
                None
            }
        }
    }

    fn consume_child(&mut self) {
        if let Some(level) = self.levels.last_mut() {
            level.remaining = level.remaining.saturating_sub(1);
        }
    }

    fn skip_frame(&mut self, depth: usize) -> Result<()> {
        let [frame_tag] = self.fixed::<1>()?;
        self.skip_payload(frame_tag, depth)
    }

    fn skip_payload(&mut self, frame_tag: u8, depth: usize) -> Result<()> {
        let width = match frame_tag {
            tag::NULL => 0,
            tag::BOOL | tag::BYTE => 1,
            tag::INT16 | tag::UINT16 => 2,
            tag::INT32 | tag::UINT32 | tag::SINGLE | tag::FOURCC => 4,
            tag::INT64 | tag::UINT64 | tag::DOUBLE => 8,
            tag::GUID => 16,
            tag::STRING | tag::BINARY => self.read_u32()? as usize,
            tag::ARRAY | tag::OBJECT => {
                if depth >= MAX_DEPTH {
                    return Err(Error::invalid_format("binary", "nesting too deep"));
                }
                let count = self.read_u32()?;
                for _ in 0..count {
                    self.skip_frame(depth + 1)?;
                }
                return Ok(());
            }
            other => {
                return Err(Error::invalid_format(
                    "binary",
                    format!("unknown frame tag {other} at offset {}", self.pos - 1),
                ))
            }
        };
        self.take(width).map(|_| ())
    }

    fn decode_payload(&mut self, frame_tag: u8) -> Result<Decoded> {
        let scalar = match frame_tag {
            tag::BOOL => Scalar::Bool(self.fixed::<1>()?[0] != 0),
            tag::SINGLE => Scalar::F32(f32::from_le_bytes(self.fixed()?)),
            tag::DOUBLE => Scalar::F64(f64::from_le_bytes(self.fixed()?)),
            tag::STRING => {
                let raw = self.read_len_prefixed()?;
                Scalar::Str(String::from_utf8(raw).map_err(|e| Error::invalid_format("binary", e))?)
            }
            tag::BINARY => Scalar::Bytes(self.read_len_prefixed()?),
            tag::FOURCC => Scalar::FourCC(
                FourCC::from_bytes(self.fixed()?).map_err(|e| Error::invalid_format("binary", e))?,
            ),
            tag::GUID => Scalar::Guid(Uuid::from_bytes(self.fixed()?)),
            tag::BYTE => return Ok(Decoded::Int(self.fixed::<1>()?[0] as i128)),
            tag::INT16 => return Ok(Decoded::Int(i16::from_le_bytes(self.fixed()?) as i128)),
            tag::INT32 => return Ok(Decoded::Int(i32::from_le_bytes(self.fixed()?) as i128)),
            tag::INT64 => return Ok(Decoded::Int(i64::from_le_bytes(self.fixed()?) as i128)),
            tag::UINT16 => return Ok(Decoded::Int(u16::from_le_bytes(self.fixed()?) as i128)),
            tag::UINT32 => return Ok(Decoded::Int(u32::from_le_bytes(self.fixed()?) as i128)),
            tag::UINT64 => return Ok(Decoded::Int(u64::from_le_bytes(self.fixed()?) as i128)),
            other => {
                return Err(Error::invalid_format(
                    "binary",
                    format!("unexpected frame tag {other}"),
                ))
            }
        };
        Ok(Decoded::Scalar(scalar))
    }

    fn begin_read_container(&mut self, container_tag: u8) -> Presence {
        let Some(frame_tag) = self.peek_child() else {
            return Presence::Missing;
        };
        self.consume_child();
        if frame_tag == tag::NULL {
            self.pos += 1;
            return Presence::Null;
        }
        if frame_tag != container_tag {
            if let Err(err) = self.skip_frame(0) {
                self.fail(err);
            }
            return Presence::WrongKind(tag::name(frame_tag));
        }
        self.pos += 1;
        match self.read_u32() {
            // Every child frame takes at least its tag byte
            Ok(len) if len as usize > self.buf.len() - self.pos => {
                self.fail(Error::invalid_format(
                    "binary",
                    format!(
                        "{} frame at offset {} declares {len} children but only {} bytes remain",
                        tag::name(frame_tag),
                        self.pos - 5,
                        self.buf.len() - self.pos
                    ),
                ));
                Presence::Missing
            }
            Ok(len) => {
                self.levels.push(Level {
                    len,
                    remaining: len,
                });
                Presence::Present
            }
            Err(err) => {
                self.fail(err);
                Presence::Missing
            }
        }
    }

    fn end_container(&mut self) {
        let remaining = self.levels.last().map_or(0, |level| level.remaining);
        if self.fault.is_none() {
            for _ in 0..remaining {
                if let Err(err) = self.skip_frame(0) {
                    self.fail(err);
                    break;
                }
            }
        }
        self.levels.pop();
    }
}

fn expected_tag(kind: ScalarKind) -> Option<u8> {
    Some(match kind {
        ScalarKind::Bool => tag::BOOL,
        ScalarKind::U8 => tag::BYTE,
        ScalarKind::I8 | ScalarKind::I16 => tag::INT16,
        ScalarKind::I32 => tag::INT32,
        ScalarKind::I64 => tag::INT64,
        ScalarKind::U16 => tag::UINT16,
        ScalarKind::U32 => tag::UINT32,
        ScalarKind::U64 => tag::UINT64,
        ScalarKind::F32 => tag::SINGLE,
        ScalarKind::F64 => tag::DOUBLE,
        ScalarKind::Str => tag::STRING,
        ScalarKind::Bytes => tag::BINARY,
        ScalarKind::FourCC => tag::FOURCC,
        ScalarKind::Guid => tag::GUID,
        ScalarKind::AnyInt => return None,
    })
}

fn is_int_tag(frame_tag: u8) -> bool {
    matches!(
        frame_tag,
        tag::BYTE | tag::INT16 | tag::INT32 | tag::INT64 | tag::UINT16 | tag::UINT32 | tag::UINT64
    )
}

impl FormatCursor for BinaryCursor {
    fn format(&self) -> Format {
        Format::Binary
    }

    fn is_reading(&self) -> bool {
        self.reading
    }

    fn requires_explicit_null(&self) -> bool {
        true
    }

    fn begin_write_root(&mut self) -> Result<()> {
        if !self.open.is_empty() || !self.buf.is_empty() {
            return Err(Error::custom("binary root already written"));
        }
        self.open_frame(tag::OBJECT, None);
        Ok(())
    }

    fn begin_read_root(&mut self) -> Result<()> {
        let [frame_tag] = self.fixed::<1>()?;
        if frame_tag != tag::OBJECT {
            return Err(Error::invalid_format(
                "binary",
                format!("root frame is {}, expected object", tag::name(frame_tag)),
            ));
        }
        let len = self.read_u32()?;
        if len as usize > self.buf.len() - self.pos {
            return Err(Error::invalid_format(
                "binary",
                format!(
                    "root frame declares {len} fields but only {} bytes remain",
                    self.buf.len() - self.pos
                ),
            ));
        }
        self.levels.push(Level {
            len,
            remaining: len,
        });
        Ok(())
    }

    fn end_root(&mut self) {
        if self.reading {
            self.end_container();
        } else {
            self.close_frame();
        }
    }

    fn begin_read_value(&mut self, _key: Key<'_>, _options: FieldOptions) -> Presence {
        let Some(frame_tag) = self.peek_child() else {
            return Presence::Missing;
        };
        self.consume_child();
        if frame_tag == tag::NULL {
            self.pos += 1;
            return Presence::Null;
        }
        self.pending = true;
        Presence::Present
    }

    fn read_scalar(&mut self, kind: ScalarKind) -> std::result::Result<Scalar, Mismatch> {
        if !self.pending {
            return Err(Mismatch::new(kind.name(), "no open value"));
        }
        self.pending = false;

        let frame_tag = match self.fixed::<1>() {
            Ok([frame_tag]) => frame_tag,
            Err(err) => {
                self.fail(err);
                return Err(Mismatch::new(kind.name(), "truncated frame"));
            }
        };

        let accepted = match expected_tag(kind) {
            Some(expected) => expected == frame_tag,
            None => is_int_tag(frame_tag),
        };
        if !accepted {
            if let Err(err) = self.skip_payload(frame_tag, 0) {
                self.fail(err);
            }
            return Err(Mismatch::new(kind.name(), tag::name(frame_tag)));
        }

        match self.decode_payload(frame_tag) {
            Ok(Decoded::Scalar(scalar)) => Ok(scalar),
            Ok(Decoded::Int(value)) => Scalar::from_int(kind, value),
            Err(err) => {
                let found = err.to_string();
                self.fail(err);
                Err(Mismatch::new(kind.name(), found))
            }
        }
    }

    fn begin_write_value(&mut self, _key: Key<'_>, _options: FieldOptions) {
        self.note_child();
    }

    fn write_scalar(&mut self, value: ScalarRef<'_>) {
        match value {
            ScalarRef::Bool(v) => self.put_fixed(tag::BOOL, &[v as u8]),
            ScalarRef::U8(v) => self.put_fixed(tag::BYTE, &[v]),
            ScalarRef::I8(v) => self.put_fixed(tag::INT16, &(v as i16).to_le_bytes()),
            ScalarRef::I16(v) => self.put_fixed(tag::INT16, &v.to_le_bytes()),
            ScalarRef::I32(v) => self.put_fixed(tag::INT32, &v.to_le_bytes()),
            ScalarRef::I64(v) => self.put_fixed(tag::INT64, &v.to_le_bytes()),
            ScalarRef::U16(v) => self.put_fixed(tag::UINT16, &v.to_le_bytes()),
            ScalarRef::U32(v) => self.put_fixed(tag::UINT32, &v.to_le_bytes()),
            ScalarRef::U64(v) => self.put_fixed(tag::UINT64, &v.to_le_bytes()),
            ScalarRef::F32(v) => self.put_fixed(tag::SINGLE, &v.to_le_bytes()),
            ScalarRef::F64(v) => self.put_fixed(tag::DOUBLE, &v.to_le_bytes()),
            ScalarRef::Str(s) => self.put_len_prefixed(tag::STRING, s.as_bytes()),
            ScalarRef::Bytes(bytes) => self.put_len_prefixed(tag::BINARY, bytes),
            ScalarRef::FourCC(code) => self.put_fixed(tag::FOURCC, &code.to_bytes()),
            ScalarRef::Guid(id) => self.put_fixed(tag::GUID, id.as_bytes()),
        }
    }

    fn end_value(&mut self) {
        if self.reading && self.pending {
            self.pending = false;
            if let Err(err) = self.skip_frame(0) {
                self.fail(err);
            }
        }
    }

    fn write_null(&mut self, _key: Key<'_>, _options: FieldOptions) {
        self.note_child();
        self.buf.push(tag::NULL);
    }

    fn begin_read_object(&mut self, _key: Key<'_>) -> Presence {
        self.begin_read_container(tag::OBJECT)
    }

    fn begin_write_object(&mut self, _key: Key<'_>) {
        self.note_child();
        self.open_frame(tag::OBJECT, None);
    }

    fn end_object(&mut self) {
        if self.reading {
            self.end_container();
        } else {
            self.close_frame();
        }
    }

    fn begin_read_array(&mut self, _key: Key<'_>) -> Presence {
        self.begin_read_container(tag::ARRAY)
    }

    fn array_len(&self) -> usize {
        self.levels.last().map_or(0, |level| level.len as usize)
    }

    fn begin_write_array(&mut self, _key: Key<'_>, len: usize) {
        self.note_child();
        self.open_frame(tag::ARRAY, Some(len));
    }

    fn end_array(&mut self) {
        if self.reading {
            self.end_container();
        } else {
            self.close_frame();
        }
    }

    fn take_fault(&mut self) -> Option<Error> {
        self.fault.take()
    }

    fn finish(self: Box<Self>, _options: OutputOptions) -> Result<Output> {
        if self.reading {
            return Err(Error::custom("cannot finish a binary reader"));
        }
        Ok(Output::Bytes(self.into_frames()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sample() -> Vec<u8> {
        let mut cursor = BinaryCursor::writer();
        cursor.begin_write_root().unwrap();
        cursor.begin_write_value(Key::Name("id"), FieldOptions::empty());
        cursor.write_scalar(ScalarRef::I32(-7));
        cursor.end_value();
        cursor.write_null(Key::Name("nick"), FieldOptions::empty());
        cursor.begin_write_array(Key::Name("tags"), 2);
        cursor.begin_write_value(Key::Index(0), FieldOptions::empty());
        cursor.write_scalar(ScalarRef::Str("a"));
        cursor.end_value();
        cursor.begin_write_value(Key::Index(1), FieldOptions::empty());
        cursor.write_scalar(ScalarRef::FourCC(FourCC::parse("RIFF").unwrap()));
        cursor.end_value();
        cursor.end_array();
        cursor.end_root();
        cursor.into_frames()
    }

    #[test]
    fn test_frame_layout() {
        let frames = write_sample();
        assert_eq!(frames[0], tag::OBJECT);
        assert_eq!(&frames[1..5], &3u32.to_le_bytes());
        assert_eq!(frames[5], tag::INT32);
        assert_eq!(&frames[6..10], &(-7i32).to_le_bytes());
        assert_eq!(frames[10], tag::NULL);
        assert_eq!(frames[11], tag::ARRAY);
        assert_eq!(&frames[12..16], &2u32.to_le_bytes());
        // FourCC payload is big-endian
        assert_eq!(&frames[frames.len() - 4..], b"RIFF");
    }

    #[test]
    fn test_positional_read() {
        let mut cursor = BinaryCursor::reader(write_sample());
        cursor.begin_read_root().unwrap();
        assert_eq!(cursor.begin_read_value(Key::Name("id"), FieldOptions::empty()), Presence::Present);
        assert_eq!(cursor.read_scalar(ScalarKind::I32), Ok(Scalar::I32(-7)));
        cursor.end_value();
        assert_eq!(cursor.begin_read_value(Key::Name("nick"), FieldOptions::empty()), Presence::Null);
        assert_eq!(cursor.begin_read_array(Key::Name("tags")), Presence::Present);
        assert_eq!(cursor.array_len(), 2);
        cursor.end_array();
        // Root exhausted: later fields read as missing
        assert_eq!(cursor.begin_read_value(Key::Name("extra"), FieldOptions::empty()), Presence::Missing);
        cursor.end_root();
        assert!(cursor.take_fault().is_none());
    }

    #[test]
    fn test_tag_mismatch_is_soft() {
        let mut cursor = BinaryCursor::reader(write_sample());
        cursor.begin_read_root().unwrap();
        cursor.begin_read_value(Key::Name("id"), FieldOptions::empty());
        let err = cursor.read_scalar(ScalarKind::Str).unwrap_err();
        assert_eq!(err.found, "int32");
        cursor.end_value();
        assert_eq!(cursor.begin_read_value(Key::Name("nick"), FieldOptions::empty()), Presence::Null);
        assert!(cursor.take_fault().is_none());
    }

    #[test]
    fn test_any_int_accepts_every_width() {
        let mut cursor = BinaryCursor::reader(write_sample());
        cursor.begin_read_root().unwrap();
        cursor.begin_read_value(Key::Name("id"), FieldOptions::empty());
        assert_eq!(cursor.read_scalar(ScalarKind::AnyInt), Ok(Scalar::I64(-7)));
    }

    #[test]
    fn test_truncated_input_faults() {
        let mut frames = write_sample();
        frames.truncate(8);
        let mut cursor = BinaryCursor::reader(frames);
        cursor.begin_read_root().unwrap();
        cursor.begin_read_value(Key::Name("id"), FieldOptions::empty());
        assert!(cursor.read_scalar(ScalarKind::I32).is_err());
        assert_eq!(cursor.begin_read_value(Key::Name("nick"), FieldOptions::empty()), Presence::Missing);
        assert!(cursor.take_fault().is_some());
    }

    #[test]
    fn test_count_past_end_of_input_faults() {
        let frames = vec![tag::OBJECT, 1, 0, 0, 0, tag::ARRAY, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut cursor = BinaryCursor::reader(frames);
        cursor.begin_read_root().unwrap();
        assert_eq!(cursor.begin_read_array(Key::Name("xs")), Presence::Missing);
        cursor.end_root();
        assert!(matches!(cursor.take_fault(), Some(Error::InvalidFormat { .. })));

        let mut cursor = BinaryCursor::reader(vec![tag::OBJECT, 9, 0, 0, 0, tag::NULL]);
        assert!(cursor.begin_read_root().is_err());
    }

    #[test]
    fn test_declared_length_is_patched() {
        let mut cursor = BinaryCursor::writer();
        cursor.begin_write_root().unwrap();
        cursor.begin_write_array(Key::Name("xs"), 5);
        cursor.begin_write_value(Key::Index(0), FieldOptions::empty());
        cursor.write_scalar(ScalarRef::U8(1));
        cursor.end_value();
        cursor.end_array();
        cursor.end_root();
        let frames = cursor.into_frames();
        assert_eq!(&frames[6..10], &1u32.to_le_bytes());
    }
}
