//! Session entry points.
//!
//! An [`Engine`] owns a [`TypeRegistry`] and [`EngineOptions`] and opens one
//! [`Serializer`] session per call. Every read and write follows the same
//! pipeline:
//!
//! ```text
//! read:  input -> detect format/transport -> strip framing -> cursor -> walk
//! write: walk -> cursor -> render -> add framing (magic, Base64)
//! ```
//!
//! Hard failures (malformed input, unknown format) are returned as `Err`.
//! Field-level problems are collected in the [`Outcome`] next to the
//! best-effort value.

use crate::backend::{BinaryCursor, FormatCursor, GzipCursor, JsonCursor, Output, XmlCursor};
use crate::error::{Error, ErrorLog, Result};
use crate::format::{frame_output, open_input, Format};
use crate::object::{Polymorphic, Serializable, SerializerContext};
use crate::options::{EngineOptions, OutputOptions};
use crate::registry::TypeRegistry;
use crate::serializer::Serializer;
use std::io::{Read, Write};
use tracing::debug;

/// A session result: the value plus every soft error recorded on the way.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub errors: ErrorLog,
}

impl<T> Outcome<T> {
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    /// Newline-joined error messages.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors.summary()
    }

    /// The value if no error was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Field`] with the error summary otherwise.
    pub fn into_result(self) -> Result<T> {
        self.errors.into_result(self.value)
    }

    #[must_use]
    pub fn into_parts(self) -> (T, ErrorLog) {
        (self.value, self.errors)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            errors: self.errors,
        }
    }
}

/// Reads and writes [`Serializable`] values in any supported [`Format`].
///
/// # Examples
///
/// ```rust
/// use omniser::{Engine, Format, OutputOptions, Serializable, Serializer};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Settings {
///     volume: u8,
///     title: String,
/// }
///
/// impl Serializable for Settings {
///     fn serialize(&mut self, s: &mut Serializer<'_>) {
///         s.field_or("volume", &mut self.volume, 80);
///         s.field("title", &mut self.title);
///     }
/// }
///
/// let engine = Engine::new();
/// let mut settings = Settings { volume: 80, title: "main".into() };
///
/// let out = engine.write(&mut settings, Format::Binary, OutputOptions::empty()).unwrap();
/// assert_eq!(&out.value.as_bytes()[..5], b"FBIN!");
///
/// let back = engine.read::<Settings>(out.value.as_bytes(), Format::AutoDetect).unwrap();
/// assert!(!back.has_errors());
/// assert_eq!(back.value, settings);
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    registry: TypeRegistry,
    options: EngineOptions,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: EngineOptions) -> Self {
        Engine {
            registry: TypeRegistry::new(),
            options,
        }
    }

    /// Replaces the registry.
    #[must_use]
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    // ---- writing ----

    /// Writes `value` as the root object of a new document.
    ///
    /// # Errors
    ///
    /// Fails for [`Format::AutoDetect`] or when the document cannot be
    /// rendered.
    pub fn write<T: Serializable + ?Sized>(
        &self,
        value: &mut T,
        format: Format,
        output: OutputOptions,
    ) -> Result<Outcome<Output>> {
        self.write_with(value, format, output, None)
    }

    /// Like [`Engine::write`], with an asset context for proxy values.
    ///
    /// # Errors
    ///
    /// See [`Engine::write`].
    pub fn write_with<T: Serializable + ?Sized>(
        &self,
        value: &mut T,
        format: Format,
        output: OutputOptions,
        context: Option<&dyn SerializerContext>,
    ) -> Result<Outcome<Output>> {
        self.write_session(format, output, context, |s| s.run_root(|s| s.object_fields(value)))
    }

    /// Writes a polymorphic root, always tagged with its type alias.
    ///
    /// # Errors
    ///
    /// See [`Engine::write`].
    pub fn write_polymorphic(
        &self,
        object: &mut dyn Polymorphic,
        format: Format,
        output: OutputOptions,
    ) -> Result<Outcome<Output>> {
        self.write_session(format, output, None, |s| s.write_root_polymorphic(object))
    }

    /// Writes `value` and copies the rendered bytes into `writer`.
    ///
    /// # Errors
    ///
    /// See [`Engine::write`]; also fails when `writer` does.
    pub fn write_to<T: Serializable + ?Sized, W: Write>(
        &self,
        value: &mut T,
        mut writer: W,
        format: Format,
        output: OutputOptions,
    ) -> Result<ErrorLog> {
        let outcome = self.write(value, format, output)?;
        writer.write_all(outcome.value.as_bytes())?;
        writer.flush()?;
        Ok(outcome.errors)
    }

    fn writer(&self, format: Format) -> Result<Box<dyn FormatCursor>> {
        let cursor: Box<dyn FormatCursor> = match format {
            Format::Json => Box::new(JsonCursor::writer(self.options.indent)),
            Format::Xml => Box::new(XmlCursor::writer(&self.options.xml_root, self.options.indent)),
            Format::Binary => Box::new(BinaryCursor::writer()),
            Format::Gzip => Box::new(GzipCursor::writer()),
            Format::AutoDetect => {
                return Err(Error::UnknownFormat(
                    "a format must be chosen explicitly for writing".to_string(),
                ))
            }
        };
        Ok(cursor)
    }

    fn write_session(
        &self,
        format: Format,
        output: OutputOptions,
        context: Option<&dyn SerializerContext>,
        body: impl FnOnce(&mut Serializer<'_>) -> Result<()>,
    ) -> Result<Outcome<Output>> {
        let mut cursor = self.writer(format)?;
        debug!(%format, "starting write session");

        let errors = {
            let mut session = Serializer::new(
                &mut *cursor,
                &self.registry,
                context,
                self.options.serializer_version,
            );
            body(&mut session)?;
            session.into_errors()
        };

        let payload = cursor.finish(output)?;
        let framed = frame_output(format, payload, output.contains(OutputOptions::BASE64));
        debug!(
            %format,
            bytes = framed.len(),
            errors = errors.len(),
            "finished write session"
        );
        Ok(Outcome {
            value: framed,
            errors,
        })
    }

    // ---- reading ----

    /// Reads a new `T` from `input`.
    ///
    /// # Errors
    ///
    /// Fails when the format cannot be detected, the framing or Base64 is
    /// invalid, or the document is malformed. Field-level problems are
    /// reported in the [`Outcome`] instead.
    pub fn read<T: Serializable + Default>(&self, input: &[u8], format: Format) -> Result<Outcome<T>> {
        self.read_with(input, format, None)
    }

    /// Like [`Engine::read`], with an asset context for proxy values.
    ///
    /// # Errors
    ///
    /// See [`Engine::read`].
    pub fn read_with<T: Serializable + Default>(
        &self,
        input: &[u8],
        format: Format,
        context: Option<&dyn SerializerContext>,
    ) -> Result<Outcome<T>> {
        let mut value = T::default();
        let errors = self.read_into(&mut value, input, format, context)?;
        Ok(Outcome { value, errors })
    }

    /// Reads `input` into an existing value. Fields absent from the document
    /// keep their current value unless they are optional or defaulted.
    ///
    /// # Errors
    ///
    /// See [`Engine::read`].
    pub fn read_into<T: Serializable + ?Sized>(
        &self,
        value: &mut T,
        input: &[u8],
        format: Format,
        context: Option<&dyn SerializerContext>,
    ) -> Result<ErrorLog> {
        self.read_session(input, format, context, |s| s.run_root(|s| s.object_fields(value)))
            .map(|((), errors)| errors)
    }

    /// Reads a polymorphic root written by [`Engine::write_polymorphic`].
    /// The value is `None` when the alias could not be resolved.
    ///
    /// # Errors
    ///
    /// See [`Engine::read`].
    pub fn read_polymorphic(
        &self,
        input: &[u8],
        format: Format,
    ) -> Result<Outcome<Option<Box<dyn Polymorphic>>>> {
        let (value, errors) =
            self.read_session(input, format, None, |s| s.read_root_polymorphic())?;
        Ok(Outcome { value, errors })
    }

    /// Reads a new `T` from everything `reader` yields.
    ///
    /// # Errors
    ///
    /// See [`Engine::read`]; also fails when `reader` does.
    pub fn read_from<T: Serializable + Default, R: Read>(
        &self,
        mut reader: R,
        format: Format,
    ) -> Result<Outcome<T>> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        self.read(&input, format)
    }

    fn reader(&self, input: &[u8], format: Format) -> Result<Box<dyn FormatCursor>> {
        let (format, payload) = open_input(input, format)?;
        let cursor: Box<dyn FormatCursor> = match format {
            Format::Binary => Box::new(BinaryCursor::reader(payload.into_owned())),
            Format::Gzip => Box::new(GzipCursor::reader_with_limit(
                &payload,
                self.options.max_inflated_size,
            )?),
            Format::Json => Box::new(JsonCursor::reader(utf8(&payload)?)?),
            Format::Xml => Box::new(XmlCursor::reader(utf8(&payload)?)?),
            Format::AutoDetect => {
                return Err(Error::UnknownFormat("format detection failed".to_string()))
            }
        };
        Ok(cursor)
    }

    fn read_session<R>(
        &self,
        input: &[u8],
        format: Format,
        context: Option<&dyn SerializerContext>,
        body: impl FnOnce(&mut Serializer<'_>) -> Result<R>,
    ) -> Result<(R, ErrorLog)> {
        let mut cursor = self.reader(input, format)?;
        let detected = cursor.format();
        debug!(format = %detected, bytes = input.len(), "starting read session");

        let mut session = Serializer::new(
            &mut *cursor,
            &self.registry,
            context,
            self.options.serializer_version,
        );
        let value = body(&mut session)?;
        let errors = session.into_errors();
        debug!(format = %detected, errors = errors.len(), "finished read session");
        Ok((value, errors))
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::invalid_format("text", e))
}
