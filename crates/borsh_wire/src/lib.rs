//! Deterministic binary serialization in the borsh wire format.
//!
//! The format is compact, unambiguous and canonical: a value of a given
//! shape always encodes to the same bytes, so encodings can be hashed,
//! signed and compared byte for byte. Integers are fixed-width
//! little-endian, strings and sequences carry a `u32` length prefix,
//! records are their fields concatenated in declaration order, and map
//! entries and set keys are written in ascending order of their encoded
//! keys. Nothing about a value's type is written to the wire; both sides
//! agree on the shape out of band.
//!
//! # Overview
//!
//! The crate offers two front-ends over the same wire contract:
//!
//! - The static front-end: [`Encode`] and [`Decode`] are implemented for
//!   the supported Rust types and derived for structs. A type outside the
//!   format (`u128`, `char`, enums) has no implementation, so it is
//!   rejected at compile time. [`Describe`] reports the [`Shape`] a type
//!   encodes as.
//! - The dynamic front-end: a [`Shape`] built at runtime is resolved by a
//!   [`Dispatcher`] into a memoized [`Routine`] that encodes and decodes a
//!   [`Value`]. Unsupported shapes fail with [`Error::UnsupportedType`]
//!   before any byte is read or written.
//!
//! Both produce byte-identical output for equivalent data.
//!
//! # Derive Macros
//!
//! ```ignore
//! #[derive(Encode, Decode, Describe)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! #[derive(Encode, Decode, Describe)]
//! struct Id(u64);
//!
//! #[derive(Encode, Decode, Describe)]
//! struct Marker;
//! ```
//!
//! ## Field Attributes
//!
//! Use `#[borsh(skip)]` to leave a field out of the encoding. The field
//! must implement `Default`, which is used when decoding:
//!
//! ```ignore
//! #[derive(Encode, Decode, Describe)]
//! struct Entry {
//!     name: String,
//!     #[borsh(skip)]
//!     cache: Vec<u8>, // Uses Default::default() when decoding
//! }
//! ```
//!
//! # Example
//!
//! ```ignore
//! let bytes = borsh_wire::to_vec(&Point { x: 3, y: -4 })?;
//! let point: Point = borsh_wire::from_slice(&bytes)?;
//!
//! // the same bytes through the dynamic front-end
//! let value = Value::Record(vec![Value::I32(3), Value::I32(-4)]);
//! assert_eq!(borsh_wire::encode_value(&Point::describe(), &value)?, bytes);
//! ```

// Allow derive macros to reference this crate as `borsh_wire` internally
extern crate self as borsh_wire;

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod decode;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod shape;
pub mod value;

// Re-export main traits and types at the crate root for convenience
pub use buffer::Buffer;
// Re-export derive macros
pub use borsh_wire_derive::{Decode, Describe, Encode};
pub use config::{Config, DefaultConfig};
pub use cursor::Cursor;
pub use decode::{Decode, Decoder};
pub use dispatch::{Dispatcher, Routine};
pub use encode::{Encode, Encoder};
pub use error::{Error, Result};
pub use shape::{Describe, Field, Record, Shape, Variant};
pub use value::Value;

/// Encodes `value` into a freshly allocated byte vector.
///
/// # Errors
///
/// Returns [`Error::LengthOverflow`] if a length does not fit in its `u32`
/// prefix.
pub fn to_vec<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Buffer::new();
    value.encode(&mut buffer)?;
    Ok(buffer.into_vec())
}

/// Appends the encoding of `value` to an existing buffer.
///
/// # Errors
///
/// See [`to_vec`].
pub fn to_writer<T: Encode + ?Sized, C: Config>(
    value: &T,
    buffer: &mut Buffer<C>,
) -> Result<()> {
    value.encode(buffer)
}

/// Decodes a `T` from the start of `bytes`, ignoring anything after it.
///
/// # Errors
///
/// Returns [`Error::UnexpectedEof`] if `bytes` is too short and
/// [`Error::InvalidData`] if a string is not valid UTF-8.
pub fn decode<T: Decode>(bytes: &[u8]) -> Result<T> {
    T::decode(&mut Cursor::new(bytes))
}

/// Decodes a `T` that must occupy all of `bytes`.
///
/// # Errors
///
/// Same as [`decode`], plus [`Error::TrailingBytes`] if input is left over.
pub fn from_slice<T: Decode>(bytes: &[u8]) -> Result<T> {
    let mut cursor = Cursor::new(bytes);
    let value = T::decode(&mut cursor)?;

    match cursor.remaining() {
        0 => Ok(value),
        remaining => Err(Error::TrailingBytes { remaining }),
    }
}

/// Encodes a dynamic `value` as `shape` using the global [`Dispatcher`].
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] if `shape` is outside the format and
/// [`Error::ShapeMismatch`] if `value` does not match it.
pub fn encode_value(shape: &Shape, value: &Value) -> Result<Vec<u8>> {
    Dispatcher::global().encode(shape, value)
}

/// Decodes a dynamic value of `shape` from the start of `bytes` using the
/// global [`Dispatcher`].
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] before reading anything if `shape` is
/// outside the format, and the errors of [`decode`] otherwise.
pub fn decode_value(bytes: &[u8], shape: &Shape) -> Result<Value> {
    Dispatcher::global().decode(bytes, shape)
}

/// Decodes a `T` from `bytes` after checking that `T` is described by
/// `shape`.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] without reading anything if
/// `T::describe()` does not structurally match `shape`, and the errors of
/// [`decode`] otherwise.
pub fn decode_as<T: Decode + Describe>(
    bytes: &[u8],
    shape: &Shape,
) -> Result<T> {
    let described = T::describe();
    if !described.matches(shape) {
        return Err(Error::mismatch(shape, described));
    }

    decode(bytes)
}
