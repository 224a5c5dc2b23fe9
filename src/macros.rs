/// Implements [`Field`](crate::Field) for a fieldless enum.
///
/// With only a type, the enum must already implement
/// [`SerialEnum`](crate::SerialEnum). With a width and a variant list the
/// macro implements both traits; the first variant is the fallback used when
/// the field is absent.
///
/// ```rust
/// use omniser::{enum_field, Serializable, Serializer};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Element {
///     Fire,
///     Water,
///     Earth,
/// }
///
/// enum_field!(Element: U8 { Fire = 1, Water = 2, Earth = 3 });
///
/// #[derive(Default)]
/// struct Spell {
///     element: Option<Element>,
/// }
///
/// impl Serializable for Spell {
///     fn serialize(&mut self, s: &mut Serializer<'_>) {
///         s.field("element", &mut self.element);
///     }
/// }
/// ```
#[macro_export]
macro_rules! enum_field {
    ($ty:ident : $width:ident { $first:ident = $first_value:expr $(, $variant:ident = $value:expr)* $(,)? }) => {
        impl $crate::SerialEnum for $ty {
            const WIDTH: $crate::IntWidth = $crate::IntWidth::$width;

            fn to_repr(self) -> i64 {
                match self {
                    $ty::$first => $first_value,
                    $($ty::$variant => $value,)*
                }
            }

            fn from_repr(value: i64) -> ::std::option::Option<Self> {
                $(
                    if value == $value {
                        return ::std::option::Option::Some($ty::$variant);
                    }
                )*
                if value == $first_value {
                    return ::std::option::Option::Some($ty::$first);
                }
                ::std::option::Option::None
            }

            fn fallback() -> Self {
                $ty::$first
            }
        }

        $crate::enum_field!($ty);
    };

    ($ty:ty) => {
        impl $crate::Field for $ty {
            const KIND: &'static str = "enum";

            fn absent() -> Self {
                <$ty as $crate::SerialEnum>::fallback()
            }

            fn read_field(
                &mut self,
                s: &mut $crate::Serializer<'_>,
            ) -> ::std::result::Result<(), $crate::Mismatch> {
                *self = s.read_enum::<$ty>()?;
                Ok(())
            }

            fn write_field(&mut self, s: &mut $crate::Serializer<'_>) {
                s.write_enum(*self);
            }
        }
    };
}
