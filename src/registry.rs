//! Type registry: aliases, constructors and custom serializers.
//!
//! Polymorphic objects are written with a short alias next to their fields.
//! On read the alias is resolved back to a registered type and a fresh
//! instance is built from its constructor before its fields are visited.
//!
//! Types that cannot implement [`Serializable`](crate::Serializable)
//! themselves (foreign types) can still take part through a custom structural
//! serializer registered with [`TypeRegistry::register_serializer`].
//!
//! # Example
//!
//! ```
//! use omniser::{Polymorphic, Serializable, Serializer, TypeRegistry};
//!
//! #[derive(Default)]
//! struct Circle {
//!     radius: f32,
//! }
//!
//! impl Serializable for Circle {
//!     fn serialize(&mut self, s: &mut Serializer<'_>) {
//!         s.field("radius", &mut self.radius);
//!     }
//! }
//!
//! impl Polymorphic for Circle {}
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Circle>("circle");
//!
//! let shape = registry.instantiate("circle").unwrap();
//! assert!(shape.is::<Circle>());
//! assert_eq!(registry.alias_of(shape.type_name()), "circle");
//! ```

use crate::object::Polymorphic;
use crate::serializer::Serializer;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds a default instance of a registered polymorphic type.
pub type Constructor = fn() -> Box<dyn Polymorphic>;

/// A structural serializer for a type that does not implement
/// [`Serializable`](crate::Serializable).
pub type CustomSerializer = Arc<dyn Fn(&mut dyn Any, &mut Serializer<'_>) + Send + Sync>;

/// Registration data of one polymorphic type.
#[derive(Clone, Debug)]
pub struct Registration {
    type_id: TypeId,
    type_name: &'static str,
    alias: String,
    constructor: Option<Constructor>,
}

impl Registration {
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[inline]
    #[must_use]
    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    #[inline]
    #[must_use]
    pub fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    /// Builds a fresh instance, `None` without a constructor.
    #[must_use]
    pub fn instantiate(&self) -> Option<Box<dyn Polymorphic>> {
        self.constructor.map(|constructor| constructor())
    }
}

pub(crate) fn construct<T: Polymorphic + Default>() -> Box<dyn Polymorphic> {
    Box::<T>::default()
}

/// Table of polymorphic types and custom serializers.
///
/// A registry is filled before sessions start and then shared read-only by
/// every session of an [`Engine`](crate::Engine).
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<TypeId, Registration>,
    type_name_to_id: HashMap<&'static str, TypeId>,
    alias_to_id: HashMap<String, TypeId>,
    serializers: HashMap<TypeId, CustomSerializer>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `alias`, constructed through [`Default`].
    ///
    /// Registering the same type again replaces its alias.
    pub fn register<T: Polymorphic + Default>(&mut self, alias: impl Into<String>) -> &mut Self {
        self.insert::<T>(alias.into(), Some(construct::<T>))
    }

    /// Registers `T` under `alias` with an explicit constructor, for types
    /// without a meaningful [`Default`].
    pub fn register_with<T: Polymorphic>(
        &mut self,
        alias: impl Into<String>,
        constructor: Constructor,
    ) -> &mut Self {
        self.insert::<T>(alias.into(), Some(constructor))
    }

    /// Registers an alias for `T` without a constructor. Such a type can be
    /// written, and read back only into an already allocated instance.
    pub fn register_alias<T: Polymorphic>(&mut self, alias: impl Into<String>) -> &mut Self {
        self.insert::<T>(alias.into(), None)
    }

    fn insert<T: Polymorphic>(&mut self, alias: String, constructor: Option<Constructor>) -> &mut Self {
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        if let Some(previous) = self.alias_to_id.get(&alias) {
            if *previous != type_id {
                warn!(alias = %alias, type_name, "type alias already registered, replacing");
            }
        }
        if let Some(old) = self.types.get(&type_id) {
            self.alias_to_id.remove(&old.alias);
        }

        debug!(alias = %alias, type_name, "registered polymorphic type");
        self.alias_to_id.insert(alias.clone(), type_id);
        self.type_name_to_id.insert(type_name, type_id);
        self.types.insert(
            type_id,
            Registration {
                type_id,
                type_name,
                alias,
                constructor,
            },
        );
        self
    }

    /// Registers a structural serializer for `T`.
    pub fn register_serializer<T, F>(&mut self, serializer: F) -> &mut Self
    where
        T: Any,
        F: Fn(&mut T, &mut Serializer<'_>) + Send + Sync + 'static,
    {
        debug!(type_name = std::any::type_name::<T>(), "registered custom serializer");
        let erased: CustomSerializer = Arc::new(move |value: &mut dyn Any, s: &mut Serializer<'_>| {
            if let Some(value) = value.downcast_mut::<T>() {
                serializer(value, s);
            }
        });
        self.serializers.insert(TypeId::of::<T>(), erased);
        self
    }

    /// The custom serializer registered for `T`.
    #[must_use]
    pub fn custom_serializer<T: Any>(&self) -> Option<CustomSerializer> {
        self.serializers.get(&TypeId::of::<T>()).cloned()
    }

    #[must_use]
    pub fn has_serializer<T: Any>(&self) -> bool {
        self.serializers.contains_key(&TypeId::of::<T>())
    }

    /// The alias written for a type name. Unregistered types use their full
    /// type name.
    #[must_use]
    pub fn alias_of<'a>(&'a self, type_name: &'a str) -> &'a str {
        self.type_name_to_id
            .get(type_name)
            .and_then(|id| self.types.get(id))
            .map_or(type_name, |registration| registration.alias.as_str())
    }

    /// Looks up a registration by alias, falling back to the full type name.
    #[must_use]
    pub fn resolve(&self, alias: &str) -> Option<&Registration> {
        self.alias_to_id
            .get(alias)
            .or_else(|| self.type_name_to_id.get(alias))
            .and_then(|id| self.types.get(id))
    }

    #[must_use]
    pub fn get<T: Polymorphic>(&self) -> Option<&Registration> {
        self.types.get(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn is_registered<T: Polymorphic>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    /// Creates an instance of the type registered under `alias`.
    ///
    /// Returns `None` for an unknown alias or a type without constructor.
    #[must_use]
    pub fn instantiate(&self, alias: &str) -> Option<Box<dyn Polymorphic>> {
        self.resolve(alias)?.instantiate()
    }

    /// Number of registered polymorphic types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.types.values()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliases: Vec<&str> = self.alias_to_id.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("aliases", &aliases)
            .field("serializers", &self.serializers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Serializable;

    #[derive(Default)]
    struct Square {
        side: f32,
    }

    impl Serializable for Square {
        fn serialize(&mut self, s: &mut Serializer<'_>) {
            s.field("side", &mut self.side);
        }
    }

    impl Polymorphic for Square {}

    struct Handle {
        id: u32,
    }

    impl Serializable for Handle {
        fn serialize(&mut self, s: &mut Serializer<'_>) {
            s.field("id", &mut self.id);
        }
    }

    impl Polymorphic for Handle {}

    #[test]
    fn test_alias_round_trip() {
        let mut registry = TypeRegistry::new();
        registry.register::<Square>("square");

        let name = std::any::type_name::<Square>();
        assert_eq!(registry.alias_of(name), "square");
        assert_eq!(registry.resolve("square").unwrap().type_name(), name);
        assert_eq!(registry.resolve(name).unwrap().alias(), "square");
        assert!(registry.instantiate("square").unwrap().is::<Square>());
        assert!(registry.instantiate("circle").is_none());
    }

    #[test]
    fn test_unregistered_alias_is_type_name() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.alias_of("my::Thing"), "my::Thing");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistering_replaces_alias() {
        let mut registry = TypeRegistry::new();
        registry.register::<Square>("sq").register::<Square>("square");
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("sq").is_none());
        assert!(registry.resolve("square").is_some());
    }

    #[test]
    fn test_constructor_kinds() {
        let mut registry = TypeRegistry::new();
        registry.register_with::<Handle>("handle", || Box::new(Handle { id: 9 }));
        let handle = registry.instantiate("handle").unwrap();
        assert_eq!(handle.downcast_ref::<Handle>().unwrap().id, 9);

        let mut bare = TypeRegistry::new();
        bare.register_alias::<Handle>("handle");
        assert!(!bare.get::<Handle>().unwrap().has_constructor());
        assert!(bare.instantiate("handle").is_none());
    }

    #[test]
    fn test_custom_serializer_lookup() {
        struct Foreign;
        let mut registry = TypeRegistry::new();
        registry.register_serializer::<Foreign, _>(|_, _| {});
        assert!(registry.has_serializer::<Foreign>());
        assert!(registry.custom_serializer::<Foreign>().is_some());
        assert!(!registry.has_serializer::<Square>());
    }
}
