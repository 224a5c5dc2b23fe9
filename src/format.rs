//! Wire format selection, magic prefixes and Base64 transport.
//!
//! Every output starts with enough bytes to identify its format:
//!
//! | Format | Raw                      | Base64                    |
//! |--------|--------------------------|---------------------------|
//! | Binary | `FBIN` `!` + frames      | `FBIN` `"` + Base64 text  |
//! | Gzip   | `FBGZ` `!` + gzip stream | `FBGZ` `"` + Base64 text  |
//! | JSON   | `{` ...                  | `FJSN` `"` + Base64 text  |
//! | XML    | `<` ...                  | `FXML` `"` + Base64 text  |
//!
//! The binary header is exactly [`HEADER_LEN`] (5) bytes: the magic and one
//! mode byte, with the root object frame at offset 5. GZIP keeps its
//! serializer version in a `UINT16` frame at the start of the compressed
//! payload, not in the uncompressed header, so it is only visible after
//! inflating.
//!
//! ```rust
//! use omniser::format::HEADER_LEN;
//! use omniser::{Format, Transport};
//!
//! assert_eq!(HEADER_LEN, 5);
//! assert_eq!(Format::detect(b"FBIN!\x0f").unwrap(), (Format::Binary, Transport::Raw));
//! assert_eq!(Format::detect(b"  {\"a\":1}").unwrap(), (Format::Json, Transport::Raw));
//! assert!(Format::detect(b"hello").is_err());
//! ```

use crate::backend::Output;
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::borrow::Cow;
use std::fmt;

/// Mode byte following a magic for a raw payload: `!`.
pub const MODE_RAW: u8 = 0x21;
/// Mode byte following a magic for a Base64 payload: `"`.
pub const MODE_BASE64: u8 = 0x22;

pub const BINARY_MAGIC: [u8; 4] = *b"FBIN";
pub const GZIP_MAGIC: [u8; 4] = *b"FBGZ";
pub const JSON_MAGIC: [u8; 4] = *b"FJSN";
pub const XML_MAGIC: [u8; 4] = *b"FXML";

/// Magic plus mode byte.
pub const HEADER_LEN: usize = 5;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A wire format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Pick the format from the input's leading bytes. Valid for reads only.
    #[default]
    AutoDetect,
    Json,
    Xml,
    Binary,
    Gzip,
}

/// How a payload is carried: as-is or as Base64 text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Transport {
    #[default]
    Raw,
    Base64,
}

impl Format {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Format::AutoDetect => "auto",
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Binary => "binary",
            Format::Gzip => "gzip",
        }
    }

    /// The four-byte magic of the format, `None` for auto-detection.
    #[must_use]
    pub const fn magic(self) -> Option<[u8; 4]> {
        match self {
            Format::AutoDetect => None,
            Format::Json => Some(JSON_MAGIC),
            Format::Xml => Some(XML_MAGIC),
            Format::Binary => Some(BINARY_MAGIC),
            Format::Gzip => Some(GZIP_MAGIC),
        }
    }

    /// `true` for the formats whose raw payload is text.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Format::Json | Format::Xml)
    }

    /// Identifies the format and transport of `input`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFormat`] when no magic matches and the first
    /// non-whitespace character is neither `{` nor `<`.
    pub fn detect(input: &[u8]) -> Result<(Format, Transport)> {
        for format in [Format::Binary, Format::Gzip, Format::Json, Format::Xml] {
            if let Some(transport) = format.match_header(input) {
                return Ok((format, transport));
            }
        }

        let text = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        match text.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Ok((Format::Json, Transport::Raw)),
            Some(b'<') => Ok((Format::Xml, Transport::Raw)),
            Some(_) => Err(Error::UnknownFormat(preview(input))),
            None => Err(Error::unexpected_eof("a document")),
        }
    }

    fn match_header(self, input: &[u8]) -> Option<Transport> {
        let magic = self.magic()?;
        if input.len() < HEADER_LEN || input[..4] != magic {
            return None;
        }
        match input[4] {
            MODE_BASE64 => Some(Transport::Base64),
            // Text formats only carry a magic when Base64-wrapped
            MODE_RAW if !self.is_text() => Some(Transport::Raw),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves the format of `input` and strips its framing, returning the bare
/// payload: binary frames, a gzip stream, or UTF-8 document text.
///
/// # Errors
///
/// Fails when the format cannot be detected, a binary input lacks its magic,
/// or a Base64 payload does not decode.
pub(crate) fn open_input(input: &[u8], format: Format) -> Result<(Format, Cow<'_, [u8]>)> {
    let (format, transport) = match format {
        Format::AutoDetect => Format::detect(input)?,
        explicit => match explicit.match_header(input) {
            Some(transport) => (explicit, transport),
            None if explicit.is_text() => (explicit, Transport::Raw),
            None => {
                return Err(Error::invalid_format(
                    explicit.name(),
                    format!("missing {} header, found {}", explicit.name(), preview(input)),
                ))
            }
        },
    };

    let payload = match transport {
        Transport::Base64 => {
            let encoded: Vec<u8> = input[HEADER_LEN..]
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            Cow::Owned(STANDARD.decode(encoded)?)
        }
        Transport::Raw if format.is_text() => {
            Cow::Borrowed(input.strip_prefix(UTF8_BOM).unwrap_or(input))
        }
        Transport::Raw => Cow::Borrowed(&input[HEADER_LEN..]),
    };
    Ok((format, payload))
}

/// Adds the framing of `format` around a payload produced by a cursor.
pub(crate) fn frame_output(format: Format, payload: Output, base64: bool) -> Output {
    let magic = format.magic().unwrap_or(BINARY_MAGIC);
    if base64 {
        let mut text = String::with_capacity(HEADER_LEN + payload.len() * 4 / 3 + 4);
        text.extend(magic.iter().map(|&b| b as char));
        text.push(MODE_BASE64 as char);
        text.push_str(&STANDARD.encode(payload.as_bytes()));
        return Output::Text(text);
    }
    if format.is_text() {
        return payload;
    }
    let body = payload.into_bytes();
    let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
    bytes.extend_from_slice(&magic);
    bytes.push(MODE_RAW);
    bytes.extend_from_slice(&body);
    Output::Bytes(bytes)
}

fn preview(input: &[u8]) -> String {
    let head = &input[..input.len().min(8)];
    format!("{:?}", String::from_utf8_lossy(head))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_magics() {
        assert_eq!(Format::detect(b"FBGZ!xx").unwrap(), (Format::Gzip, Transport::Raw));
        assert_eq!(Format::detect(b"FBIN\"AAAA").unwrap(), (Format::Binary, Transport::Base64));
        assert_eq!(Format::detect(b"FJSN\"e30=").unwrap(), (Format::Json, Transport::Base64));
        assert_eq!(Format::detect(b"FXML\"PGEvPg==").unwrap(), (Format::Xml, Transport::Base64));
        assert_eq!(Format::detect(b"\xEF\xBB\xBF<a/>").unwrap(), (Format::Xml, Transport::Raw));
    }

    #[test]
    fn test_detect_failures() {
        assert!(matches!(Format::detect(b"FJSN!{}"), Err(Error::UnknownFormat(_))));
        assert!(matches!(Format::detect(b"   "), Err(Error::UnexpectedEof { .. })));
    }

    #[test]
    fn test_frame_and_open_binary() {
        let framed = frame_output(Format::Binary, Output::Bytes(vec![1, 2, 3]), false);
        assert_eq!(framed.as_bytes(), b"FBIN!\x01\x02\x03");
        let (format, payload) = open_input(framed.as_bytes(), Format::AutoDetect).unwrap();
        assert_eq!(format, Format::Binary);
        assert_eq!(payload.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn test_base64_json_transport() {
        let framed = frame_output(Format::Json, Output::Text("{}".to_string()), true);
        assert_eq!(framed.as_text(), Some("FJSN\"e30="));
        let (format, payload) = open_input(framed.as_bytes(), Format::Json).unwrap();
        assert_eq!(format, Format::Json);
        assert_eq!(payload.as_ref(), b"{}");
    }

    #[test]
    fn test_explicit_binary_requires_header() {
        assert!(open_input(b"{}", Format::Binary).is_err());
    }
}
