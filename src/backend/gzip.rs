//! Gzip-wrapped binary backend.
//!
//! A decorator over [`BinaryCursor`]: the frame stream is compressed with
//! gzip, and the compressed payload starts with one `UINT16` frame holding the
//! serializer version, ahead of the root object frame.

use super::binary::{tag, BinaryCursor};
use super::{FormatCursor, Key, Mismatch, Output, Presence, Scalar, ScalarKind, ScalarRef};
use crate::format::Format;
use crate::options::{FieldOptions, OutputOptions, DEFAULT_MAX_INFLATED_SIZE};
use crate::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

/// Cursor over gzip-compressed binary frames, without the `FBGZ` header.
#[derive(Debug)]
pub struct GzipCursor {
    inner: BinaryCursor,
    version: Option<u16>,
    level: Compression,
}

impl GzipCursor {
    /// Creates a cursor that writes with the default compression level.
    #[must_use]
    pub fn writer() -> Self {
        Self::with_level(Compression::default())
    }

    #[must_use]
    pub fn with_level(level: Compression) -> Self {
        GzipCursor {
            inner: BinaryCursor::writer(),
            version: None,
            level,
        }
    }

    /// Decompresses `compressed` and opens it for reading, accepting at most
    /// [`DEFAULT_MAX_INFLATED_SIZE`] bytes of inflated frames.
    ///
    /// # Errors
    ///
    /// See [`GzipCursor::reader_with_limit`].
    pub fn reader(compressed: &[u8]) -> Result<Self> {
        Self::reader_with_limit(compressed, DEFAULT_MAX_INFLATED_SIZE)
    }

    /// Decompresses at most `limit` bytes of `compressed` and opens the
    /// result for reading.
    ///
    /// # Errors
    ///
    /// Fails when the gzip stream is corrupt, inflates past `limit`, or does
    /// not start with the serializer version frame.
    pub fn reader_with_limit(compressed: &[u8], limit: usize) -> Result<Self> {
        let mut decoder = GzDecoder::new(compressed).take((limit as u64).saturating_add(1));
        let mut data = Vec::with_capacity(compressed.len().saturating_mul(2).min(limit));
        decoder
            .read_to_end(&mut data)
            .map_err(|e| Error::Compression(e.to_string()))?;
        if data.len() > limit {
            return Err(Error::invalid_format(
                "gzip",
                format!("payload inflates past the {limit} byte limit"),
            ));
        }
        debug!(
            compressed = compressed.len(),
            decompressed = data.len(),
            "inflated gzip payload"
        );

        if data.len() < 3 || data[0] != tag::UINT16 {
            return Err(Error::invalid_format(
                "gzip",
                "payload does not start with a serializer version frame",
            ));
        }
        let version = u16::from_le_bytes([data[1], data[2]]);
        let frames = data.split_off(3);
        Ok(GzipCursor {
            inner: BinaryCursor::reader(frames),
            version: Some(version),
            level: Compression::default(),
        })
    }
}

impl FormatCursor for GzipCursor {
    fn format(&self) -> Format {
        Format::Gzip
    }

    fn is_reading(&self) -> bool {
        self.inner.is_reading()
    }

    fn requires_explicit_null(&self) -> bool {
        self.inner.requires_explicit_null()
    }

    fn begin_write_root(&mut self) -> Result<()> {
        self.inner.begin_write_root()
    }

    fn begin_read_root(&mut self) -> Result<()> {
        self.inner.begin_read_root()
    }

    fn end_root(&mut self) {
        self.inner.end_root();
    }

    fn write_serializer_version(&mut self, version: u16) -> bool {
        self.version = Some(version);
        true
    }

    fn read_serializer_version(&mut self) -> Option<u16> {
        self.version
    }

    fn begin_read_value(&mut self, key: Key<'_>, options: FieldOptions) -> Presence {
        self.inner.begin_read_value(key, options)
    }

    fn read_scalar(&mut self, kind: ScalarKind) -> std::result::Result<Scalar, Mismatch> {
        self.inner.read_scalar(kind)
    }

    fn begin_write_value(&mut self, key: Key<'_>, options: FieldOptions) {
        self.inner.begin_write_value(key, options);
    }

    fn write_scalar(&mut self, value: ScalarRef<'_>) {
        self.inner.write_scalar(value);
    }

    fn end_value(&mut self) {
        self.inner.end_value();
    }

    fn write_null(&mut self, key: Key<'_>, options: FieldOptions) {
        self.inner.write_null(key, options);
    }

    fn begin_read_object(&mut self, key: Key<'_>) -> Presence {
        self.inner.begin_read_object(key)
    }

    fn begin_write_object(&mut self, key: Key<'_>) {
        self.inner.begin_write_object(key);
    }

    fn end_object(&mut self) {
        self.inner.end_object();
    }

    fn begin_read_array(&mut self, key: Key<'_>) -> Presence {
        self.inner.begin_read_array(key)
    }

    fn array_len(&self) -> usize {
        self.inner.array_len()
    }

    fn begin_write_array(&mut self, key: Key<'_>, len: usize) {
        self.inner.begin_write_array(key, len);
    }

    fn end_array(&mut self) {
        self.inner.end_array();
    }

    fn take_fault(&mut self) -> Option<Error> {
        self.inner.take_fault()
    }

    fn finish(self: Box<Self>, _options: OutputOptions) -> Result<Output> {
        let GzipCursor {
            inner,
            version,
            level,
        } = *self;
        if inner.is_reading() {
            return Err(Error::custom("cannot finish a gzip reader"));
        }
        let frames = inner.into_frames();

        let mut encoder = GzEncoder::new(Vec::with_capacity(frames.len() / 2 + 16), level);
        let compress = |encoder: &mut GzEncoder<Vec<u8>>| -> std::io::Result<()> {
            encoder.write_all(&[tag::UINT16])?;
            encoder.write_all(&version.unwrap_or(1).to_le_bytes())?;
            encoder.write_all(&frames)
        };
        compress(&mut encoder).map_err(|e| Error::Compression(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| Error::Compression(e.to_string()))?;

        debug!(
            frames = frames.len(),
            compressed = compressed.len(),
            "deflated gzip payload"
        );
        Ok(Output::Bytes(compressed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_frame_precedes_root() {
        let mut cursor = GzipCursor::writer();
        assert!(cursor.write_serializer_version(7));
        cursor.begin_write_root().unwrap();
        cursor.begin_write_value(Key::Name("n"), FieldOptions::empty());
        cursor.write_scalar(ScalarRef::U16(42));
        cursor.end_value();
        cursor.end_root();
        let compressed = Box::new(cursor)
            .finish(OutputOptions::empty())
            .unwrap()
            .into_bytes();

        let mut plain = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut plain)
            .unwrap();
        assert_eq!(&plain[..3], &[tag::UINT16, 7, 0]);
        assert_eq!(plain[3], tag::OBJECT);

        let mut reader = GzipCursor::reader(&compressed).unwrap();
        assert_eq!(reader.read_serializer_version(), Some(7));
        reader.begin_read_root().unwrap();
        assert_eq!(
            reader.begin_read_value(Key::Name("n"), FieldOptions::empty()),
            Presence::Present
        );
        assert_eq!(reader.read_scalar(ScalarKind::U16), Ok(Scalar::U16(42)));
    }

    #[test]
    fn test_inflated_size_is_capped() {
        let mut plain = vec![tag::UINT16, 1, 0, tag::OBJECT, 0, 0, 0, 0];
        plain.resize(4096, 0);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&plain).unwrap();
        let compressed = encoder.finish().unwrap();

        assert!(matches!(
            GzipCursor::reader_with_limit(&compressed, 1024),
            Err(Error::InvalidFormat { .. })
        ));
        assert!(GzipCursor::reader_with_limit(&compressed, plain.len()).is_ok());
    }

    #[test]
    fn test_corrupt_stream() {
        assert!(matches!(
            GzipCursor::reader(b"not gzip at all"),
            Err(Error::Compression(_))
        ));
    }
}
