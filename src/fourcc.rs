//! Packed four-character codes.
//!
//! A [`FourCC`] packs up to four characters into a `u32`, byte 0 most
//! significant. Each slot holds either `0` (trailing padding) or one character
//! of the class `A-Z 0-9 ! # $ + - _ ?`. Lower-case letters are folded to upper
//! case unless [`CaseMode::Sensitive`] is requested, in which case they are
//! kept as distinct characters.
//!
//! ```rust
//! use omniser::FourCC;
//!
//! let code = FourCC::parse("AB").unwrap();
//! assert_eq!(code.to_text(false), "AB  ");
//! assert_eq!(code.to_text(true), "AB");
//! assert!(FourCC::try_parse("A B").is_none());
//! assert!(FourCC::parse("AAAA").unwrap() < FourCC::parse("AAAB").unwrap());
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use thiserror::Error;

/// Whether lower-case letters are folded to upper case when parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaseMode {
    #[default]
    Insensitive,
    Sensitive,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FourCCError {
    #[error("FourCC text is longer than four characters: {0:?}")]
    TooLong(String),
    #[error("invalid FourCC character {ch:?} at position {index}")]
    InvalidChar { ch: char, index: usize },
    #[error("FourCC character at position {index} follows padding")]
    CharAfterPadding { index: usize },
}

/// A four-character code packed into 32 bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FourCC(u32);

impl FourCC {
    /// The all-padding code.
    pub const EMPTY: FourCC = FourCC(0);

    /// Parses text with case folding.
    ///
    /// # Errors
    ///
    /// Fails on invalid characters, more than four characters, or a
    /// non-space character after a space.
    pub fn parse(text: &str) -> Result<Self, FourCCError> {
        Self::parse_with(text, CaseMode::Insensitive)
    }

    /// Parses text with an explicit case mode.
    ///
    /// # Errors
    ///
    /// See [`FourCC::parse`].
    pub fn parse_with(text: &str, mode: CaseMode) -> Result<Self, FourCCError> {
        let mut slots = [0u8; 4];
        let mut padded = false;
        for (index, ch) in text.chars().enumerate() {
            if ch == ' ' {
                padded = true;
                continue;
            }
            if padded {
                return Err(FourCCError::CharAfterPadding { index });
            }
            if index >= 4 {
                return Err(FourCCError::TooLong(text.to_string()));
            }
            slots[index] = sanitize(ch, mode).ok_or(FourCCError::InvalidChar { ch, index })?;
        }
        Ok(Self::pack(slots))
    }

    /// Like [`FourCC::parse`] but discards the reason for failure.
    #[must_use]
    pub fn try_parse(text: &str) -> Option<Self> {
        Self::parse(text).ok()
    }

    /// Packs four byte slots, byte 0 most significant. Slots are not validated.
    #[inline]
    #[must_use]
    pub const fn pack(slots: [u8; 4]) -> Self {
        FourCC(u32::from_be_bytes(slots))
    }

    #[inline]
    #[must_use]
    pub const fn unpack(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Validates a packed value: every byte must be a valid character or
    /// trailing padding.
    ///
    /// # Errors
    ///
    /// Fails when a byte is outside the character class or follows padding.
    pub fn from_u32(value: u32) -> Result<Self, FourCCError> {
        Self::from_bytes(value.to_be_bytes())
    }

    /// Validates four raw bytes in wire order.
    ///
    /// # Errors
    ///
    /// See [`FourCC::from_u32`].
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self, FourCCError> {
        let mut padded = false;
        for (index, &byte) in bytes.iter().enumerate() {
            if byte == 0 {
                padded = true;
                continue;
            }
            if padded {
                return Err(FourCCError::CharAfterPadding { index });
            }
            if sanitize(byte as char, CaseMode::Sensitive).is_none() {
                return Err(FourCCError::InvalidChar {
                    ch: byte as char,
                    index,
                });
            }
        }
        Ok(Self::pack(bytes))
    }

    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.unpack()
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Renders four characters with padding as spaces, trimming trailing
    /// padding when `trim` is set.
    #[must_use]
    pub fn to_text(self, trim: bool) -> String {
        let mut text: String = self
            .unpack()
            .iter()
            .map(|&b| if b == 0 { ' ' } else { b as char })
            .collect();
        if trim {
            text.truncate(text.trim_end_matches(' ').len());
        }
        text
    }

    /// Writes the four bytes in big-endian order.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures of the writer.
    pub fn write_to<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Reads four big-endian bytes and validates them.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures; invalid characters map to `InvalidData`.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; 4];
        reader.read_exact(&mut bytes)?;
        Self::from_bytes(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Writes the packed value as a little-endian `u32` primitive.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures of the writer.
    pub fn write_primitive<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0.to_le_bytes())
    }

    /// Reads a little-endian `u32` primitive and validates it.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures; invalid characters map to `InvalidData`.
    pub fn read_primitive<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; 4];
        reader.read_exact(&mut bytes)?;
        Self::from_u32(u32::from_le_bytes(bytes))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn sanitize(ch: char, mode: CaseMode) -> Option<u8> {
    match ch {
        'A'..='Z' | '0'..='9' | '!' | '#' | '$' | '+' | '-' | '_' | '?' => Some(ch as u8),
        'a'..='z' => match mode {
            CaseMode::Insensitive => Some(ch.to_ascii_uppercase() as u8),
            CaseMode::Sensitive => Some(ch as u8),
        },
        _ => None,
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(true))
    }
}

impl FromStr for FourCC {
    type Err = FourCCError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FourCC::parse(s)
    }
}

impl Serialize for FourCC {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_text(true))
    }
}

impl<'de> Deserialize<'de> for FourCC {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        FourCC::parse_with(&text, CaseMode::Sensitive).map_err(serde::de::Error::custom)
    }
}
