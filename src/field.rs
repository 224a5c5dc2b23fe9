//! Field values the [`Serializer`] can visit.
//!
//! [`Field`] is implemented for:
//!
//! - primitives: `bool`, `u8`, `i8`, `i16`, `i32`, `i64`, `u16`, `u32`, `u64`,
//!   `f32`, `f64`, `String`
//! - [`Blob`] (binary data), [`FourCC`], [`Uuid`], `DateTime<Utc>`
//! - `Option<T>`, where `None` is the absent value
//! - `Vec<T>`, `[T; N]`, `HashSet<T>`, `BTreeSet<T>`
//! - `HashMap<K, V>`, `BTreeMap<K, V>`, `IndexMap<K, V>` as arrays of
//!   `{key, value}` objects
//! - every [`Serializable`] type with a [`Default`]
//!
//! Fieldless enums implement it through [`enum_field!`](crate::enum_field).
//!
//! Reading happens in place: a failed read leaves the previous value.

use crate::backend::{Mismatch, Scalar, ScalarKind, ScalarRef};
use crate::fourcc::FourCC;
use crate::object::Serializable;
use crate::serializer::Serializer;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

/// Upper bound on capacity reserved from a stored element count.
pub(crate) const MAX_PREALLOC: usize = 1024;

/// How a field is opened on the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// A single scalar.
    Value,
    /// An array of elements.
    Array,
    /// An object with named fields.
    Object,
}

/// A value that can be read and written by a [`Serializer`].
pub trait Field: Sized {
    const SHAPE: Shape = Shape::Value;

    /// Name used in mismatch messages.
    const KIND: &'static str;

    /// Value assigned when the field is absent or null.
    fn absent() -> Self;

    /// `true` if writing this value should produce no value at all.
    fn is_absent(&self) -> bool {
        false
    }

    /// Element count announced before an array is written.
    fn len_hint(&self) -> usize {
        0
    }

    /// Reads the value the cursor points at into `self`.
    ///
    /// # Errors
    ///
    /// Returns a [`Mismatch`] when the stored value has another kind.
    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch>;

    /// Writes `self` at the cursor.
    fn write_field(&mut self, s: &mut Serializer<'_>);
}

macro_rules! scalar_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Field for $ty {
                const KIND: &'static str = ScalarKind::$variant.name();

                fn absent() -> Self {
                    <$ty>::default()
                }

                fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
                    match s.read_scalar(ScalarKind::$variant)? {
                        Scalar::$variant(v) => {
                            *self = v;
                            Ok(())
                        }
                        other => Err(Mismatch::new(Self::KIND, other.kind().name())),
                    }
                }

                fn write_field(&mut self, s: &mut Serializer<'_>) {
                    s.write_scalar(ScalarRef::$variant(*self));
                }
            }
        )*
    };
}

scalar_field! {
    bool => Bool,
    u8 => U8,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    FourCC => FourCC,
    Uuid => Guid,
}

impl Field for String {
    const KIND: &'static str = ScalarKind::Str.name();

    fn absent() -> Self {
        String::new()
    }

    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
        match s.read_scalar(ScalarKind::Str)? {
            Scalar::Str(text) => {
                *self = text;
                Ok(())
            }
            other => Err(Mismatch::new(Self::KIND, other.kind().name())),
        }
    }

    fn write_field(&mut self, s: &mut Serializer<'_>) {
        s.write_scalar(ScalarRef::Str(self.as_str()));
    }
}

/// Binary data, written as a `BINARY` frame or Base64 text.
///
/// A plain `Vec<u8>` is an array of bytes; wrap it in `Blob` to store it as
/// one opaque value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Blob {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for Blob {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Blob(bytes.to_vec())
    }
}

impl Field for Blob {
    const KIND: &'static str = ScalarKind::Bytes.name();

    fn absent() -> Self {
        Blob::default()
    }

    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
        match s.read_scalar(ScalarKind::Bytes)? {
            Scalar::Bytes(bytes) => {
                self.0 = bytes;
                Ok(())
            }
            other => Err(Mismatch::new(Self::KIND, other.kind().name())),
        }
    }

    fn write_field(&mut self, s: &mut Serializer<'_>) {
        s.write_scalar(ScalarRef::Bytes(&self.0));
    }
}

/// Timestamps are RFC 3339 strings in every format.
impl Field for DateTime<Utc> {
    const KIND: &'static str = "datetime";

    fn absent() -> Self {
        DateTime::<Utc>::default()
    }

    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
        let text = match s.read_scalar(ScalarKind::Str)? {
            Scalar::Str(text) => text,
            other => return Err(Mismatch::new(Self::KIND, other.kind().name())),
        };
        let parsed = DateTime::parse_from_rfc3339(&text)
            .map_err(|e| Mismatch::new(Self::KIND, format!("{text:?} ({e})")))?;
        *self = parsed.with_timezone(&Utc);
        Ok(())
    }

    fn write_field(&mut self, s: &mut Serializer<'_>) {
        s.write_scalar(ScalarRef::Str(&self.to_rfc3339()));
    }
}

impl<T: Field> Field for Option<T> {
    const SHAPE: Shape = T::SHAPE;
    const KIND: &'static str = T::KIND;

    fn absent() -> Self {
        None
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn len_hint(&self) -> usize {
        self.as_ref().map_or(0, T::len_hint)
    }

    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
        let mut inner = self.take().unwrap_or_else(T::absent);
        let result = inner.read_field(s);
        *self = Some(inner);
        result
    }

    fn write_field(&mut self, s: &mut Serializer<'_>) {
        if let Some(inner) = self {
            inner.write_field(s);
        }
    }
}

impl<T: Field> Field for Vec<T> {
    const SHAPE: Shape = Shape::Array;
    const KIND: &'static str = "array";

    fn absent() -> Self {
        Vec::new()
    }

    fn len_hint(&self) -> usize {
        self.len()
    }

    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
        let len = s.array_len();
        self.clear();
        // Stored counts are untrusted; grow as elements decode
        self.reserve(len.min(MAX_PREALLOC));
        for index in 0..len {
            let mut item = T::absent();
            s.element(index, &mut item);
            self.push(item);
        }
        Ok(())
    }

    fn write_field(&mut self, s: &mut Serializer<'_>) {
        for (index, item) in self.iter_mut().enumerate() {
            s.element(index, item);
        }
    }
}

/// Extra stored elements are ignored and missing ones keep their value; both
/// report a length mismatch.
impl<T: Field, const N: usize> Field for [T; N] {
    const SHAPE: Shape = Shape::Array;
    const KIND: &'static str = "fixed array";

    fn absent() -> Self {
        std::array::from_fn(|_| T::absent())
    }

    fn len_hint(&self) -> usize {
        N
    }

    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
        let len = s.array_len();
        for (index, item) in self.iter_mut().enumerate().take(len) {
            s.element(index, item);
        }
        if len != N {
            return Err(Mismatch::new(Self::KIND, format!("{len} elements, expected {N}")));
        }
        Ok(())
    }

    fn write_field(&mut self, s: &mut Serializer<'_>) {
        for (index, item) in self.iter_mut().enumerate() {
            s.element(index, item);
        }
    }
}

macro_rules! set_field {
    ($set:ident, $($bound:path),+) => {
        impl<T: Field + Clone $(+ $bound)+> Field for $set<T> {
            const SHAPE: Shape = Shape::Array;
            const KIND: &'static str = "set";

            fn absent() -> Self {
                $set::new()
            }

            fn len_hint(&self) -> usize {
                self.len()
            }

            fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
                self.clear();
                for index in 0..s.array_len() {
                    let mut item = T::absent();
                    if s.element(index, &mut item) {
                        self.insert(item);
                    }
                }
                Ok(())
            }

            fn write_field(&mut self, s: &mut Serializer<'_>) {
                for (index, item) in self.iter().enumerate() {
                    let mut item = item.clone();
                    s.element(index, &mut item);
                }
            }
        }
    };
}

set_field!(HashSet, Eq, Hash);
set_field!(BTreeSet, Ord);

macro_rules! map_field {
    ($map:ident, $($bound:path),+) => {
        impl<K: Field + Clone $(+ $bound)+, V: Field> Field for $map<K, V> {
            const SHAPE: Shape = Shape::Array;
            const KIND: &'static str = "map";

            fn absent() -> Self {
                $map::new()
            }

            fn len_hint(&self) -> usize {
                self.len()
            }

            fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
                self.clear();
                for index in 0..s.array_len() {
                    let mut key = K::absent();
                    let mut value = V::absent();
                    if s.entry(index, &mut key, &mut value) {
                        self.insert(key, value);
                    }
                }
                Ok(())
            }

            fn write_field(&mut self, s: &mut Serializer<'_>) {
                for (index, (key, value)) in self.iter_mut().enumerate() {
                    let mut key = key.clone();
                    s.entry(index, &mut key, value);
                }
            }
        }
    };
}

map_field!(HashMap, Eq, Hash);
map_field!(BTreeMap, Ord);
map_field!(IndexMap, Eq, Hash);

impl<T: Serializable + Default> Field for T {
    const SHAPE: Shape = Shape::Object;
    const KIND: &'static str = "object";

    fn absent() -> Self {
        T::default()
    }

    fn read_field(&mut self, s: &mut Serializer<'_>) -> Result<(), Mismatch> {
        s.object_fields(self);
        Ok(())
    }

    fn write_field(&mut self, s: &mut Serializer<'_>) {
        s.object_fields(self);
    }
}
