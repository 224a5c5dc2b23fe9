//! Configuration for fields, output rendering and engine sessions.
//!
//! - [`FieldOptions`]: per-field flags passed to the traversal engine
//! - [`OutputOptions`]: final rendering flags (pretty printing, Base64 wrapping)
//! - [`EngineOptions`]: session-wide settings such as the serializer version
//!
//! ## Examples
//!
//! ```rust
//! use omniser::{EngineOptions, FieldOptions, OutputOptions};
//!
//! let field = FieldOptions::OPTIONAL | FieldOptions::PREFER_ATTRIBUTE;
//! assert!(field.contains(FieldOptions::OPTIONAL));
//!
//! let output = OutputOptions::PRETTY_PRINT;
//! assert!(!output.contains(OutputOptions::BASE64));
//!
//! let options = EngineOptions::new()
//!     .with_serializer_version(2)
//!     .with_indent(4);
//! assert_eq!(options.indent, 4);
//! ```

use bitflags::bitflags;

bitflags! {
    /// Flags controlling how a single field is read and written.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FieldOptions: u8 {
        /// A missing field is not an error; it reads as the type default.
        const OPTIONAL         = 1 << 0;
        /// Place a scalar as an attribute of the enclosing element (XML only).
        const PREFER_ATTRIBUTE = 1 << 1;
    }
}

bitflags! {
    /// Flags applied when rendering the finished document.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OutputOptions: u8 {
        /// Indent text formats. Ignored by binary formats.
        const PRETTY_PRINT = 1 << 0;
        /// Wrap the output as Base64 text behind a format-identifying prefix.
        const BASE64       = 1 << 1;
    }
}

/// Session-wide configuration for an [`Engine`](crate::Engine).
///
/// # Examples
///
/// ```rust
/// use omniser::EngineOptions;
///
/// let options = EngineOptions::default();
/// assert_eq!(options.serializer_version, 1);
/// assert_eq!(options.indent, 2);
/// assert_eq!(options.xml_root, "root");
/// assert_eq!(options.max_inflated_size, omniser::DEFAULT_MAX_INFLATED_SIZE);
/// ```
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// Container format version written once near the document root.
    pub serializer_version: u16,
    /// Spaces per nesting level for pretty JSON and XML.
    pub indent: usize,
    /// Element name used for the XML document root.
    pub xml_root: String,
    /// Largest decompressed size accepted from a GZIP document, in bytes.
    pub max_inflated_size: usize,
}

/// Default for [`EngineOptions::max_inflated_size`]: 64 MiB.
pub const DEFAULT_MAX_INFLATED_SIZE: usize = 64 * 1024 * 1024;

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            serializer_version: 1,
            indent: 2,
            xml_root: "root".to_string(),
            max_inflated_size: DEFAULT_MAX_INFLATED_SIZE,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the serializer version written by every session of the engine.
    #[must_use]
    pub fn with_serializer_version(mut self, version: u16) -> Self {
        self.serializer_version = version;
        self
    }

    /// Sets the indentation size used by pretty-printed output.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the element name of the XML document root.
    #[must_use]
    pub fn with_xml_root(mut self, name: impl Into<String>) -> Self {
        self.xml_root = name.into();
        self
    }

    /// Caps how many bytes a GZIP document may inflate to before reading
    /// fails.
    #[must_use]
    pub fn with_max_inflated_size(mut self, bytes: usize) -> Self {
        self.max_inflated_size = bytes;
        self
    }
}
