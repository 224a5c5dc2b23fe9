//! The dual-mode traversal engine.
//!
//! A [`Serializer`] walks one object graph in one direction. The same
//! [`Serializable::serialize`] method drives both reading and writing: each
//! `field*` call either writes the value at the cursor or reads the stored
//! value into it.
//!
//! Field-level problems never abort the walk. A missing required field, a
//! value of the wrong kind or an unknown type alias is recorded in the
//! session's [`ErrorLog`], prefixed with the path of the field, and the walk
//! continues with the next field.
//!
//! ## Absent values
//!
//! A value is absent when it is `None` or, for [`Serializer::field_or`],
//! equal to the declared default. An absent value under a field name is left
//! out of formats that can express omission (JSON, XML) when the field is
//! [`FieldOptions::OPTIONAL`] or has a default; otherwise it is written as an
//! explicit null. Binary formats always write the null, since their frames
//! are positional.
//!
//! ## Reserved keys
//!
//! Every object carries an optional `__version` (omitted when 1), every
//! polymorphic object a `__type` alias, and the root a `__sv` serializer
//! version unless the format stores it in its header. User fields cannot use
//! these names.

use crate::backend::{FormatCursor, Key, Mismatch, Presence, Scalar, ScalarKind, ScalarRef};
use crate::error::{ErrorLog, Result};
use crate::field::{Field, Shape};
use crate::format::Format;
use crate::object::{IntWidth, Polymorphic, Proxy, SerialEnum, Serializable, SerializerContext};
use crate::options::FieldOptions;
use crate::registry::{construct, Constructor, TypeRegistry};
use std::any::{Any, TypeId};
use std::fmt;
use tracing::trace;

/// Key of the type alias of a polymorphic object.
pub const TYPE_KEY: &str = "__type";
/// Key of the version of an object.
pub const VERSION_KEY: &str = "__version";
/// Key of the serializer version on the root object.
pub const SERIALIZER_VERSION_KEY: &str = "__sv";

const RESERVED_KEYS: [&str; 3] = [TYPE_KEY, VERSION_KEY, SERIALIZER_VERSION_KEY];

const RESERVED_OPTIONS: FieldOptions = FieldOptions::OPTIONAL.union(FieldOptions::PREFER_ATTRIBUTE);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visit {
    Present,
    Absent,
    Failed,
}

/// Statically declared type of a polymorphic slot.
#[derive(Clone, Copy)]
struct Declared {
    type_id: TypeId,
    type_name: &'static str,
    construct: Constructor,
}

impl Declared {
    fn of<D: Polymorphic + Default>() -> Self {
        Declared {
            type_id: TypeId::of::<D>(),
            type_name: std::any::type_name::<D>(),
            construct: construct::<D>,
        }
    }
}

/// A read or write session over one [`FormatCursor`].
pub struct Serializer<'a> {
    cursor: &'a mut dyn FormatCursor,
    registry: &'a TypeRegistry,
    context: Option<&'a dyn SerializerContext>,
    reading: bool,
    errors: ErrorLog,
    serializer_version: u16,
    object_version: u16,
    path: Vec<String>,
}

impl<'a> Serializer<'a> {
    pub(crate) fn new(
        cursor: &'a mut dyn FormatCursor,
        registry: &'a TypeRegistry,
        context: Option<&'a dyn SerializerContext>,
        serializer_version: u16,
    ) -> Self {
        let reading = cursor.is_reading();
        Serializer {
            cursor,
            registry,
            context,
            reading,
            errors: ErrorLog::new(),
            serializer_version,
            object_version: 1,
            path: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.reading
    }

    #[inline]
    #[must_use]
    pub fn is_writing(&self) -> bool {
        !self.reading
    }

    #[must_use]
    pub fn format(&self) -> Format {
        self.cursor.format()
    }

    /// Version of the document container. When reading, the stored value.
    #[inline]
    #[must_use]
    pub fn serializer_version(&self) -> u16 {
        self.serializer_version
    }

    /// Version of the object being visited. When reading, the stored value,
    /// so `serialize` can branch on older layouts.
    #[inline]
    #[must_use]
    pub fn object_version(&self) -> u16 {
        self.object_version
    }

    #[must_use]
    pub fn context(&self) -> Option<&'a dyn SerializerContext> {
        self.context
    }

    #[must_use]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Errors recorded so far.
    #[must_use]
    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    pub(crate) fn into_errors(self) -> ErrorLog {
        self.errors
    }

    // ---- fields ----

    /// Visits a required field. Returns `false` if the field failed to read.
    pub fn field<T: Field>(&mut self, key: &str, value: &mut T) -> bool {
        self.field_with(key, value, FieldOptions::empty())
    }

    /// Visits a field with explicit options.
    pub fn field_with<T: Field>(&mut self, key: &str, value: &mut T, options: FieldOptions) -> bool {
        if !self.check_key(key) {
            return false;
        }
        self.visit(Key::Name(key), value, options, None, false) != Visit::Failed
    }

    /// Visits a field with a declared default.
    ///
    /// A value equal to `default` is not written, and a missing or null
    /// stored value reads as `default` without error.
    pub fn field_or<T: Field + PartialEq>(&mut self, key: &str, value: &mut T, default: T) -> bool {
        self.field_or_with(key, value, default, FieldOptions::empty())
    }

    pub fn field_or_with<T: Field + PartialEq>(
        &mut self,
        key: &str,
        value: &mut T,
        default: T,
        options: FieldOptions,
    ) -> bool {
        if !self.check_key(key) {
            return false;
        }
        let is_default = !self.reading && *value == default;
        self.visit(Key::Name(key), value, options, Some(default), is_default) != Visit::Failed
    }

    /// Visits the element at `index` of the array being read or written.
    /// Used by [`Field`] implementations of containers.
    pub fn element<T: Field>(&mut self, index: usize, value: &mut T) -> bool {
        self.visit(Key::Index(index), value, FieldOptions::empty(), None, false) != Visit::Failed
    }

    /// Visits the map entry at `index` as a `{key, value}` object.
    pub fn entry<K: Field, V: Field>(&mut self, index: usize, key: &mut K, value: &mut V) -> bool {
        let at = Key::Index(index);
        if self.reading {
            match self.cursor.begin_read_object(at) {
                Presence::Present => {}
                Presence::WrongKind(found) => {
                    self.record_at(at, Mismatch::new("map entry", found));
                    return false;
                }
                Presence::Missing | Presence::Null => {
                    self.record_at(at, "missing map entry");
                    return false;
                }
            }
        } else {
            self.cursor.begin_write_object(at);
        }

        self.path.push(at.to_string());
        let key_ok = self.visit(Key::Name("key"), key, FieldOptions::empty(), None, false);
        let value_ok = self.visit(Key::Name("value"), value, FieldOptions::empty(), None, false);
        self.path.pop();
        self.cursor.end_object();
        key_ok != Visit::Failed && value_ok != Visit::Failed
    }

    /// Number of elements of the array being read.
    #[must_use]
    pub fn array_len(&self) -> usize {
        self.cursor.array_len()
    }

    /// Reads the scalar the cursor points at.
    ///
    /// # Errors
    ///
    /// Returns a [`Mismatch`] when the stored value has another kind.
    pub fn read_scalar(&mut self, kind: ScalarKind) -> std::result::Result<Scalar, Mismatch> {
        self.cursor.read_scalar(kind)
    }

    pub fn write_scalar(&mut self, value: ScalarRef<'_>) {
        self.cursor.write_scalar(value);
    }

    /// Reads an enum written by [`Serializer::write_enum`]. Any integer
    /// width is accepted.
    ///
    /// # Errors
    ///
    /// Fails on a non-integer value or an unknown discriminant.
    pub fn read_enum<E: SerialEnum>(&mut self) -> std::result::Result<E, Mismatch> {
        match self.cursor.read_scalar(ScalarKind::AnyInt)? {
            Scalar::I64(raw) => E::from_repr(raw)
                .ok_or_else(|| Mismatch::new("enum", format!("unknown discriminant {raw}"))),
            other => Err(Mismatch::new("enum", other.kind().name())),
        }
    }

    /// Writes an enum at its declared width.
    pub fn write_enum<E: SerialEnum>(&mut self, value: E) {
        let raw = value.to_repr();
        let scalar = match E::WIDTH {
            IntWidth::U8 => ScalarRef::U8(raw as u8),
            IntWidth::I16 => ScalarRef::I16(raw as i16),
            IntWidth::I32 => ScalarRef::I32(raw as i32),
            IntWidth::I64 => ScalarRef::I64(raw),
        };
        self.cursor.write_scalar(scalar);
    }

    // ---- polymorphic objects ----

    /// Visits a polymorphic object. Its alias is always written.
    ///
    /// `None` is omitted where the format allows it and written as null
    /// otherwise; a missing or null stored value reads as `None`.
    pub fn polymorphic(&mut self, key: &str, value: &mut Option<Box<dyn Polymorphic>>) -> bool {
        if !self.check_key(key) {
            return false;
        }
        self.polymorphic_at(Key::Name(key), value, None)
    }

    /// Visits a polymorphic object declared as `D`. The alias is omitted when
    /// the runtime type is `D`, and a stored object without alias reads as `D`.
    pub fn polymorphic_as<D: Polymorphic + Default>(
        &mut self,
        key: &str,
        value: &mut Option<Box<dyn Polymorphic>>,
    ) -> bool {
        if !self.check_key(key) {
            return false;
        }
        self.polymorphic_at(Key::Name(key), value, Some(Declared::of::<D>()))
    }

    /// Visits a list of polymorphic objects, each carrying its own alias.
    pub fn polymorphic_list(&mut self, key: &str, list: &mut Vec<Box<dyn Polymorphic>>) -> bool {
        if !self.check_key(key) {
            return false;
        }
        let at = Key::Name(key);

        if !self.reading {
            self.cursor.begin_write_array(at, list.len());
            self.path.push(key.to_string());
            for (index, object) in list.iter_mut().enumerate() {
                self.write_polymorphic(Key::Index(index), &mut **object, None);
            }
            self.path.pop();
            self.cursor.end_array();
            return true;
        }

        match self.cursor.begin_read_array(at) {
            Presence::Present => {}
            Presence::Null => {
                list.clear();
                return true;
            }
            Presence::Missing => {
                self.record_at(at, "missing required field");
                return false;
            }
            Presence::WrongKind(found) => {
                self.record_at(at, Mismatch::new("array", found));
                return false;
            }
        }

        let len = self.cursor.array_len();
        list.clear();
        list.reserve(len.min(crate::field::MAX_PREALLOC));
        self.path.push(key.to_string());
        let mut ok = true;
        for index in 0..len {
            let mut slot = None;
            ok &= self.polymorphic_at(Key::Index(index), &mut slot, None);
            list.extend(slot);
        }
        self.path.pop();
        self.cursor.end_array();
        ok
    }

    fn polymorphic_at(
        &mut self,
        key: Key<'_>,
        value: &mut Option<Box<dyn Polymorphic>>,
        declared: Option<Declared>,
    ) -> bool {
        if !self.reading {
            match value {
                Some(object) => self.write_polymorphic(key, &mut **object, declared),
                None => self.write_absent(key, FieldOptions::OPTIONAL, true),
            }
            return true;
        }

        match self.cursor.begin_read_object(key) {
            Presence::Present => {}
            Presence::Missing | Presence::Null => {
                *value = None;
                return true;
            }
            Presence::WrongKind(found) => {
                self.record_at(key, Mismatch::new("object", found));
                return false;
            }
        }
        self.path.push(key.to_string());
        let ok = self.read_polymorphic_body(value, declared);
        self.path.pop();
        self.cursor.end_object();
        ok
    }

    fn write_polymorphic(&mut self, key: Key<'_>, object: &mut dyn Polymorphic, declared: Option<Declared>) {
        let registry = self.registry;
        let alias = match declared {
            Some(declared) if declared.type_id == (*object).as_any().type_id() => None,
            _ => Some(registry.alias_of(object.type_name())),
        };

        self.cursor.begin_write_object(key);
        self.path.push(key.to_string());
        self.write_type_alias(alias);
        self.object_fields(object);
        self.path.pop();
        self.cursor.end_object();
    }

    /// Reads the alias and fields of an open polymorphic object into `slot`.
    /// An instance of the stored type already in `slot` is reused.
    fn read_polymorphic_body(
        &mut self,
        slot: &mut Option<Box<dyn Polymorphic>>,
        declared: Option<Declared>,
    ) -> bool {
        let alias = self.read_type_alias();
        let registry = self.registry;

        let (type_id, type_name, constructor) = match (alias.as_deref(), declared) {
            (Some(alias), _) => match registry.resolve(alias) {
                Some(registration) => (
                    registration.type_id(),
                    registration.type_name(),
                    registration.constructor(),
                ),
                None => {
                    self.record_error(format!("unknown type alias `{alias}`"));
                    return false;
                }
            },
            (None, Some(declared)) => (declared.type_id, declared.type_name, Some(declared.construct)),
            (None, None) => {
                self.record_error(format!("polymorphic object without `{TYPE_KEY}`"));
                return false;
            }
        };

        let mut instance = match slot.take() {
            Some(current) if (*current).as_any().type_id() == type_id => current,
            previous => match constructor {
                Some(constructor) => constructor(),
                None => {
                    *slot = previous;
                    self.record_error(format!("no constructor registered for {type_name}"));
                    return false;
                }
            },
        };
        self.object_fields(&mut *instance);
        *slot = Some(instance);
        true
    }

    fn write_type_alias(&mut self, alias: Option<&str>) {
        let mut alias = alias.map(str::to_string);
        self.visit(Key::Name(TYPE_KEY), &mut alias, RESERVED_OPTIONS, None, false);
    }

    fn read_type_alias(&mut self) -> Option<String> {
        let mut alias: Option<String> = None;
        self.visit(Key::Name(TYPE_KEY), &mut alias, RESERVED_OPTIONS, None, false);
        alias
    }

    // ---- proxies and custom serializers ----

    /// Visits a value through its [`Proxy`] representation.
    ///
    /// A conversion that fails records an error; on write the field is stored
    /// as null.
    pub fn proxy<P: Proxy>(&mut self, key: &str, value: &mut P) -> bool {
        if !self.check_key(key) {
            return false;
        }
        let at = Key::Name(key);
        let context = self.context;

        if !self.reading {
            return match value.get_proxy_value(context) {
                Some(mut inner) => self.visit(at, &mut inner, FieldOptions::empty(), None, false) != Visit::Failed,
                None => {
                    self.record_at(at, format!("{} has no proxy value", std::any::type_name::<P>()));
                    self.cursor.write_null(at, FieldOptions::empty());
                    false
                }
            };
        }

        let mut inner = <P::Inner as Field>::absent();
        match self.visit(at, &mut inner, FieldOptions::empty(), None, false) {
            Visit::Present => match P::set_proxy_value(inner, context) {
                Some(resolved) => {
                    *value = resolved;
                    true
                }
                None => {
                    self.record_at(
                        at,
                        format!("could not restore {} from its proxy value", std::any::type_name::<P>()),
                    );
                    false
                }
            },
            Visit::Absent => true,
            Visit::Failed => false,
        }
    }

    /// Visits a value through the custom serializer registered for `T`.
    pub fn custom<T: Any>(&mut self, key: &str, value: &mut T) -> bool {
        if !self.check_key(key) {
            return false;
        }
        let at = Key::Name(key);
        let Some(serializer) = self.registry.custom_serializer::<T>() else {
            self.record_at(
                at,
                format!("no custom serializer registered for {}", std::any::type_name::<T>()),
            );
            if !self.reading {
                self.cursor.write_null(at, FieldOptions::empty());
            }
            return false;
        };

        if self.reading {
            match self.cursor.begin_read_object(at) {
                Presence::Present => {}
                Presence::Null => return true,
                Presence::Missing => {
                    self.record_at(at, "missing required field");
                    return false;
                }
                Presence::WrongKind(found) => {
                    self.record_at(at, Mismatch::new("object", found));
                    return false;
                }
            }
        } else {
            self.cursor.begin_write_object(at);
        }

        let errors_before = self.errors.len();
        self.path.push(key.to_string());
        serializer(value as &mut dyn Any, self);
        self.path.pop();
        self.cursor.end_object();
        self.errors.len() == errors_before
    }

    // ---- errors ----

    /// Records a soft error at the current path.
    pub fn record_error(&mut self, message: impl fmt::Display) {
        let location = self.location(None);
        self.push_error(location, message);
    }

    fn record_at(&mut self, key: Key<'_>, message: impl fmt::Display) {
        let location = self.location(Some(key));
        self.push_error(location, message);
    }

    fn push_error(&mut self, location: String, message: impl fmt::Display) {
        let line = if location.is_empty() {
            message.to_string()
        } else {
            format!("{location}: {message}")
        };
        trace!(error = %line, "recorded serialization error");
        self.errors.record(line);
    }

    fn location(&self, key: Option<Key<'_>>) -> String {
        let tail = key.map(|key| key.to_string());
        let mut out = String::new();
        for segment in self.path.iter().chain(tail.iter()) {
            if !out.is_empty() && !segment.starts_with('[') {
                out.push('.');
            }
            out.push_str(segment);
        }
        out
    }

    fn check_key(&mut self, key: &str) -> bool {
        if RESERVED_KEYS.contains(&key) {
            self.record_at(Key::Name(key), "field name is reserved");
            return false;
        }
        true
    }

    // ---- traversal ----

    fn visit<T: Field>(
        &mut self,
        key: Key<'_>,
        value: &mut T,
        options: FieldOptions,
        default: Option<T>,
        is_default: bool,
    ) -> Visit {
        if self.reading {
            self.read_visit(key, value, options, default)
        } else {
            self.write_visit(key, value, options, default.is_some(), is_default)
        }
    }

    fn read_visit<T: Field>(&mut self, key: Key<'_>, value: &mut T, options: FieldOptions, default: Option<T>) -> Visit {
        let presence = match T::SHAPE {
            Shape::Value => self.cursor.begin_read_value(key, options),
            Shape::Array => self.cursor.begin_read_array(key),
            Shape::Object => self.cursor.begin_read_object(key),
        };

        match presence {
            Presence::Missing if default.is_none() && !options.contains(FieldOptions::OPTIONAL) => {
                self.record_at(key, "missing required field");
                Visit::Failed
            }
            Presence::Missing | Presence::Null => {
                *value = default.unwrap_or_else(T::absent);
                Visit::Absent
            }
            Presence::WrongKind(found) => {
                self.record_at(key, Mismatch::new(T::KIND, found));
                Visit::Failed
            }
            Presence::Present => {
                self.enter(key, T::SHAPE);
                let result = value.read_field(self);
                self.leave(T::SHAPE);
                match result {
                    Ok(()) => Visit::Present,
                    Err(mismatch) => {
                        self.record_at(key, mismatch);
                        Visit::Failed
                    }
                }
            }
        }
    }

    fn write_visit<T: Field>(
        &mut self,
        key: Key<'_>,
        value: &mut T,
        options: FieldOptions,
        has_default: bool,
        is_default: bool,
    ) -> Visit {
        if value.is_absent() || is_default {
            let omittable = has_default || options.contains(FieldOptions::OPTIONAL);
            self.write_absent(key, options, omittable);
            return Visit::Absent;
        }

        match T::SHAPE {
            Shape::Value => self.cursor.begin_write_value(key, options),
            Shape::Array => self.cursor.begin_write_array(key, value.len_hint()),
            Shape::Object => self.cursor.begin_write_object(key),
        }
        self.enter(key, T::SHAPE);
        value.write_field(self);
        self.leave(T::SHAPE);
        Visit::Present
    }

    fn write_absent(&mut self, key: Key<'_>, options: FieldOptions, omittable: bool) {
        let omit = omittable && key.is_name() && !self.cursor.requires_explicit_null();
        if !omit {
            self.cursor.write_null(key, options);
        }
    }

    fn enter(&mut self, key: Key<'_>, shape: Shape) {
        if shape != Shape::Value {
            self.path.push(key.to_string());
        }
    }

    fn leave(&mut self, shape: Shape) {
        match shape {
            Shape::Value => self.cursor.end_value(),
            Shape::Array => {
                self.path.pop();
                self.cursor.end_array();
            }
            Shape::Object => {
                self.path.pop();
                self.cursor.end_object();
            }
        }
    }

    /// Visits the version and fields of an object whose frame is open.
    pub(crate) fn object_fields<O: Serializable + ?Sized>(&mut self, object: &mut O) {
        let mut version = if self.reading { 1 } else { object.object_version() };
        let is_default = !self.reading && version == 1;
        self.visit(Key::Name(VERSION_KEY), &mut version, RESERVED_OPTIONS, Some(1), is_default);

        let enclosing = std::mem::replace(&mut self.object_version, version);
        object.serialize(self);
        if self.reading {
            object.after_read();
        }
        self.object_version = enclosing;
    }

    // ---- root ----

    /// Opens the root, handles the serializer version, runs `body` and closes
    /// the root.
    ///
    /// # Errors
    ///
    /// Returns the cursor's error when the root cannot be opened or the input
    /// turned out to be malformed during the walk.
    pub(crate) fn run_root(&mut self, body: impl FnOnce(&mut Self)) -> Result<()> {
        if self.reading {
            let header = self.cursor.read_serializer_version();
            self.cursor.begin_read_root()?;
            self.serializer_version = match header {
                Some(version) => version,
                None => {
                    let mut version = 1u16;
                    self.visit(Key::Name(SERIALIZER_VERSION_KEY), &mut version, RESERVED_OPTIONS, Some(1), false);
                    version
                }
            };
        } else {
            let in_header = self.cursor.write_serializer_version(self.serializer_version);
            self.cursor.begin_write_root()?;
            if !in_header {
                let mut version = self.serializer_version;
                let is_default = version == 1;
                self.visit(Key::Name(SERIALIZER_VERSION_KEY), &mut version, RESERVED_OPTIONS, Some(1), is_default);
            }
        }

        body(self);
        self.cursor.end_root();

        match self.cursor.take_fault() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    pub(crate) fn write_root_polymorphic(&mut self, object: &mut dyn Polymorphic) -> Result<()> {
        let registry = self.registry;
        let alias = registry.alias_of(object.type_name());
        self.run_root(|s| {
            s.write_type_alias(Some(alias));
            s.object_fields(object);
        })
    }

    pub(crate) fn read_root_polymorphic(&mut self) -> Result<Option<Box<dyn Polymorphic>>> {
        let mut slot = None;
        self.run_root(|s| {
            s.read_polymorphic_body(&mut slot, None);
        })?;
        Ok(slot)
    }
}

impl fmt::Debug for Serializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("format", &self.cursor.format())
            .field("reading", &self.reading)
            .field("serializer_version", &self.serializer_version)
            .field("object_version", &self.object_version)
            .field("errors", &self.errors.len())
            .finish()
    }
}
