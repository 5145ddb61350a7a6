//! Static shape descriptors and the [`Describe`] capability.
//!
//! A [`Shape`] describes the structure of a value independently of how it is
//! represented in memory. Shapes are never written to the wire; both sides
//! of an exchange must agree on the shape out of band. The
//! [`Dispatcher`](crate::Dispatcher) turns a shape into an encode/decode
//! routine, and [`Describe`] lets a Rust type report the shape its
//! [`Encode`](crate::Encode) implementation follows.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    fmt::{self, Display},
    rc::Rc,
    sync::Arc,
};

use enum_as_inner::EnumAsInner;

/// The static structural type of a value.
///
/// Integer and float shapes carry their width in bits. Widths outside the
/// supported catalog (for instance `UInt(128)`) can be expressed so that
/// they can be rejected with
/// [`Error::UnsupportedType`](crate::Error::UnsupportedType) when a routine
/// is resolved. The same holds for [`Shape::Variant`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumAsInner,
)]
pub enum Shape {
    /// One byte, `0x00` or `0x01`.
    Bool,

    /// Unsigned little-endian integer of the given bit width.
    UInt(u16),

    /// Two's-complement little-endian integer of the given bit width.
    Int(u16),

    /// IEEE 754 float of the given bit width.
    Float(u16),

    /// Exactly `len` elements with no length prefix.
    FixedArray(Box<Shape>, usize),

    /// `u32` count followed by the elements.
    Sequence(Box<Shape>),

    /// `u32` byte length followed by UTF-8 bytes.
    String,

    /// Fields concatenated in declaration order.
    Record(Record),

    /// `u32` count followed by key/value pairs sorted by encoded key.
    Map(Box<Shape>, Box<Shape>),

    /// `u32` count followed by keys sorted by their encoding.
    Set(Box<Shape>),

    /// Presence byte followed by the element if present.
    Optional(Box<Shape>),

    /// A tagged union. Not part of the wire format; resolving a routine for
    /// it always fails.
    Variant(Variant),
}

/// A record shape: a named, ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    /// Name of the record type. Tuples use an empty name.
    pub name: String,

    /// Fields in declaration (and therefore wire) order.
    pub fields: Vec<Field>,
}

/// A single named field of a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Field {
    /// Field name; positional fields use their index.
    pub name: String,

    /// Shape of the field's value.
    pub shape: Shape,
}

impl Field {
    /// Creates a new field.
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self { name: name.into(), shape }
    }
}

/// A tagged-union shape, kept only so it can be reported as unsupported.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variant {
    /// Name of the union type.
    pub name: String,

    /// Names of its variants.
    pub variants: Vec<String>,
}

impl Shape {
    /// Creates a [`Shape::FixedArray`].
    #[must_use]
    pub fn fixed_array(element: Self, len: usize) -> Self {
        Self::FixedArray(Box::new(element), len)
    }

    /// Creates a [`Shape::Sequence`].
    #[must_use]
    pub fn sequence(element: Self) -> Self { Self::Sequence(Box::new(element)) }

    /// Creates a [`Shape::Map`].
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Creates a [`Shape::Set`].
    #[must_use]
    pub fn set(key: Self) -> Self { Self::Set(Box::new(key)) }

    /// Creates a [`Shape::Optional`].
    #[must_use]
    pub fn optional(element: Self) -> Self { Self::Optional(Box::new(element)) }

    /// Creates a [`Shape::Record`] from `(name, shape)` pairs.
    pub fn record<N: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, Self)>,
    ) -> Self {
        Self::Record(Record {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, shape)| Field::new(name, shape))
                .collect(),
        })
    }

    /// Creates an unnamed record whose fields are named by position, which
    /// is how tuples are described.
    pub fn tuple(elements: impl IntoIterator<Item = Self>) -> Self {
        Self::record(
            "",
            elements
                .into_iter()
                .enumerate()
                .map(|(index, shape)| (index.to_string(), shape)),
        )
    }

    /// Creates a [`Shape::Variant`].
    pub fn variant<V: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Variant(Variant {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        })
    }

    /// The smallest number of bytes any value of this shape can occupy.
    ///
    /// Decoding uses this to reject element counts that the remaining
    /// input cannot possibly hold.
    #[must_use]
    pub fn min_encoded_len(&self) -> usize {
        match self {
            Self::Bool | Self::Optional(_) | Self::Variant(_) => 1,
            Self::UInt(bits) | Self::Int(bits) | Self::Float(bits) => {
                usize::from(*bits) / 8
            }
            Self::FixedArray(element, len) => {
                element.min_encoded_len().saturating_mul(*len)
            }
            Self::Sequence(_) | Self::String | Self::Map(..) | Self::Set(_) => {
                4
            }
            Self::Record(record) => record
                .fields
                .iter()
                .map(|field| field.shape.min_encoded_len())
                .fold(0, usize::saturating_add),
        }
    }

    /// Compares two shapes by structure only, ignoring record, field and
    /// variant names.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool, Self::Bool) | (Self::String, Self::String) => true,
            (Self::UInt(a), Self::UInt(b))
            | (Self::Int(a), Self::Int(b))
            | (Self::Float(a), Self::Float(b)) => a == b,
            (Self::FixedArray(a, n), Self::FixedArray(b, m)) => {
                n == m && a.matches(b)
            }
            (Self::Sequence(a), Self::Sequence(b))
            | (Self::Set(a), Self::Set(b))
            | (Self::Optional(a), Self::Optional(b)) => a.matches(b),
            (Self::Map(ak, av), Self::Map(bk, bv)) => {
                ak.matches(bk) && av.matches(bv)
            }
            (Self::Record(a), Self::Record(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|(a, b)| a.shape.matches(&b.shape))
            }
            (Self::Variant(a), Self::Variant(b)) => {
                a.variants.len() == b.variants.len()
            }
            _ => false,
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::UInt(bits) => write!(f, "u{bits}"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Float(bits) => write!(f, "f{bits}"),
            Self::FixedArray(element, len) => write!(f, "[{element}; {len}]"),
            Self::Sequence(element) => write!(f, "Vec<{element}>"),
            Self::String => f.write_str("String"),
            Self::Record(record) => Display::fmt(record, f),
            Self::Map(key, value) => write!(f, "Map<{key}, {value}>"),
            Self::Set(key) => write!(f, "Set<{key}>"),
            Self::Optional(element) => write!(f, "Option<{element}>"),
            Self::Variant(variant) => write!(
                f,
                "enum {} {{ {} }}",
                variant.name,
                variant.variants.join(", ")
            ),
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str("(")?;
            for (index, field) in self.fields.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", field.shape)?;
            }
            return f.write_str(")");
        }

        if self.fields.is_empty() {
            return f.write_str(&self.name);
        }

        write!(f, "{} {{ ", self.name)?;
        for (index, field) in self.fields.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.name, field.shape)?;
        }
        f.write_str(" }")
    }
}

/// A type that can report the [`Shape`] its encoding follows.
///
/// Implementations must agree with the type's [`Encode`](crate::Encode) and
/// [`Decode`](crate::Decode) implementations, so that a value encoded
/// through the trait and a [`Value`](crate::Value) encoded through the
/// described shape produce identical bytes. Structs usually derive it with
/// `#[derive(Describe)]`.
pub trait Describe {
    /// Returns the shape of this type.
    fn describe() -> Shape;
}

macro_rules! impl_describe_scalar {
    ($($ty:ty => $shape:expr),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> Shape { $shape }
            }
        )+
    };
}

impl_describe_scalar!(
    bool => Shape::Bool,
    u8 => Shape::UInt(8),
    u16 => Shape::UInt(16),
    u32 => Shape::UInt(32),
    u64 => Shape::UInt(64),
    i8 => Shape::Int(8),
    i16 => Shape::Int(16),
    i32 => Shape::Int(32),
    i64 => Shape::Int(64),
    f32 => Shape::Float(32),
    f64 => Shape::Float(64),
    str => Shape::String,
    String => Shape::String,
    Box<str> => Shape::String,
    Rc<str> => Shape::String,
    Arc<str> => Shape::String,
);

macro_rules! impl_describe_transparent {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<T: Describe + ?Sized> Describe for $ty {
                fn describe() -> Shape { T::describe() }
            }
        )+
    };
}

impl_describe_transparent!(&T, &mut T);

impl<T: Describe> Describe for Box<T> {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe> Describe for Rc<T> {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe> Describe for Arc<T> {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe + ToOwned + ?Sized> Describe for Cow<'_, T> {
    fn describe() -> Shape { T::describe() }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> Shape { Shape::optional(T::describe()) }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> Shape { Shape::sequence(T::describe()) }
}

impl<T: Describe> Describe for Box<[T]> {
    fn describe() -> Shape { Shape::sequence(T::describe()) }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> Shape { Shape::sequence(T::describe()) }
}

impl<T: Describe> Describe for VecDeque<T> {
    fn describe() -> Shape { Shape::sequence(T::describe()) }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> Shape { Shape::fixed_array(T::describe(), N) }
}

impl<K: Describe, V: Describe, S> Describe for HashMap<K, V, S> {
    fn describe() -> Shape { Shape::map(K::describe(), V::describe()) }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe() -> Shape { Shape::map(K::describe(), V::describe()) }
}

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn describe() -> Shape { Shape::set(T::describe()) }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn describe() -> Shape { Shape::set(T::describe()) }
}

impl Describe for () {
    fn describe() -> Shape { Shape::tuple([]) }
}

macro_rules! impl_describe_tuple {
    ($($name:ident),+) => {
        impl<$($name: Describe),+> Describe for ($($name,)+) {
            fn describe() -> Shape { Shape::tuple([$($name::describe()),+]) }
        }
    };
}

impl_describe_tuple!(A);
impl_describe_tuple!(A, B);
impl_describe_tuple!(A, B, C);
impl_describe_tuple!(A, B, C, D);
impl_describe_tuple!(A, B, C, D, E);
impl_describe_tuple!(A, B, C, D, E, F);
impl_describe_tuple!(A, B, C, D, E, F, G);
impl_describe_tuple!(A, B, C, D, E, F, G, H);
impl_describe_tuple!(A, B, C, D, E, F, G, H, I);
impl_describe_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_describe_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_describe_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);

impl<T: ?Sized> Describe for std::marker::PhantomData<T> {
    fn describe() -> Shape {
        Shape::record("PhantomData", std::iter::empty::<(String, Shape)>())
    }
}
