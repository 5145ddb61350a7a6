//! Dynamically shaped values for the shape-driven codec.

use enum_as_inner::EnumAsInner;

/// A value whose structure is only known at runtime.
///
/// A `Value` carries no field names or element shapes of its own; it is
/// always interpreted against a [`Shape`](crate::Shape). Record fields are
/// stored by position, and map pairs and set keys are stored in the order
/// they were given. Encoding puts them into canonical order; decoding
/// returns them in wire order.
///
/// # Example
///
/// ```ignore
/// let point = Value::Record(vec![Value::I32(3), Value::I32(-4)]);
/// let shape = Shape::record(
///     "Point",
///     [("x", Shape::Int(32)), ("y", Shape::Int(32))],
/// );
///
/// let bytes = encode_value(&shape, &point)?;
/// ```
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// An 8-bit unsigned integer.
    U8(u8),
    /// A 16-bit unsigned integer.
    U16(u16),
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit unsigned integer.
    U64(u64),
    /// An 8-bit signed integer.
    I8(i8),
    /// A 16-bit signed integer.
    I16(i16),
    /// A 32-bit signed integer.
    I32(i32),
    /// A 64-bit signed integer.
    I64(i64),
    /// A 32-bit float.
    F32(f32),
    /// A 64-bit float.
    F64(f64),
    /// A UTF-8 string.
    String(String),

    /// Elements of a fixed-length array.
    Array(Vec<Value>),

    /// Elements of a length-prefixed sequence.
    Sequence(Vec<Value>),

    /// Field values in declaration order.
    Record(Vec<Value>),

    /// Key/value pairs.
    Map(Vec<(Value, Value)>),

    /// Keys of a set.
    Set(Vec<Value>),

    /// An optional value; `None` is absent.
    Optional(Option<Box<Value>>),
}

impl Value {
    /// An absent optional.
    #[must_use]
    pub const fn absent() -> Self { Self::Optional(None) }

    /// A present optional holding `value`.
    #[must_use]
    pub fn present(value: impl Into<Self>) -> Self {
        Self::Optional(Some(Box::new(value.into())))
    }

    /// A short name of the value's kind, used in mismatch diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Sequence(_) => "sequence",
            Self::Record(_) => "record",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Optional(_) => "optional",
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self { Self::$variant(value) }
            }
        )+
    };
}

impl_from_scalar!(
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => String,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self { Self::String(value.to_owned()) }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        Self::Optional(value.map(|value| Box::new(value.into())))
    }
}
