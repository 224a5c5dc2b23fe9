//! Traits implemented by serializable types.
//!
//! - [`Serializable`]: a type that lists its fields to a [`Serializer`]. The
//!   same method reads and writes, so the field list cannot drift between the
//!   two directions.
//! - [`Polymorphic`]: a [`Serializable`] that can sit behind a
//!   `Box<dyn Polymorphic>` and be restored as its concrete type through a type
//!   alias.
//! - [`Proxy`]: a value that serializes as some other [`Field`] type.
//! - [`SerialEnum`]: a fieldless enum with an explicit integer width.
//! - [`SerializerContext`]: external asset lookup handed to a session.
//!
//! ## Examples
//!
//! ```rust
//! use omniser::{Engine, Format, OutputOptions, Serializable, Serializer};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Player {
//!     name: String,
//!     hp: i32,
//! }
//!
//! impl Serializable for Player {
//!     fn serialize(&mut self, s: &mut Serializer<'_>) {
//!         s.field("name", &mut self.name);
//!         s.field("hp", &mut self.hp);
//!     }
//! }
//!
//! let engine = Engine::new();
//! let mut player = Player { name: "Ada".into(), hp: 30 };
//! let out = engine.write(&mut player, Format::Json, OutputOptions::empty()).unwrap();
//! assert_eq!(out.value.as_text(), Some(r#"{"name":"Ada","hp":30}"#));
//! ```

use crate::field::Field;
use crate::serializer::Serializer;
use std::any::Any;
use std::sync::Arc;

/// A type whose fields are walked by a [`Serializer`].
pub trait Serializable {
    /// Lists every field, in a fixed order, through `s`.
    fn serialize(&mut self, s: &mut Serializer<'_>);

    /// Version written next to this object. Readers see the stored value
    /// through [`Serializer::object_version`].
    fn object_version(&self) -> u16 {
        1
    }

    /// Called after every field was read.
    fn after_read(&mut self) {}
}

/// Access to [`Any`] for trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A [`Serializable`] stored behind `Box<dyn Polymorphic>`.
///
/// Register concrete types with
/// [`TypeRegistry::register`](crate::TypeRegistry::register) so readers can
/// instantiate them from their alias.
pub trait Polymorphic: Serializable + AsAny {
    /// Stable identity of the concrete type.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl dyn Polymorphic {
    /// Returns `true` if the concrete type is `T`.
    #[must_use]
    pub fn is<T: Polymorphic>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: Polymorphic>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Polymorphic>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// A value serialized as a stand-in [`Field`] type.
///
/// Both conversions receive the session's [`SerializerContext`], if any.
/// Returning `None` records a soft error.
pub trait Proxy: Sized {
    type Inner: Field;

    fn get_proxy_value(&self, context: Option<&dyn SerializerContext>) -> Option<Self::Inner>;

    fn set_proxy_value(inner: Self::Inner, context: Option<&dyn SerializerContext>) -> Option<Self>;
}

/// Lookup of externally owned assets by id.
pub trait SerializerContext {
    fn try_resolve_asset_by_id(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>>;

    fn try_get_id_for_asset(&self, asset: &dyn Any) -> Option<String>;
}

/// Integer width of an enum on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntWidth {
    U8,
    I16,
    I32,
    I64,
}

/// A fieldless enum with an explicit integer representation.
///
/// Implement [`Field`] for it with [`enum_field!`](crate::enum_field).
pub trait SerialEnum: Copy + 'static {
    /// Width of the frame written for the enum.
    const WIDTH: IntWidth;

    fn to_repr(self) -> i64;

    fn from_repr(value: i64) -> Option<Self>;

    /// Value used when the enum is absent.
    fn fallback() -> Self;
}
