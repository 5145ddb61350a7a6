//! Encoding traits and implementations for serialization.
//!
//! This module provides the [`Encoder`] trait for byte sinks that speak the
//! borsh wire format, and the [`Encode`] trait for types that can be
//! serialized through one.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    hash::BuildHasher,
    rc::Rc,
    sync::Arc,
};

use crate::{
    buffer::Buffer,
    error::{Error, Result},
};

/// A sink for fixed-width little-endian primitives.
///
/// Implementors provide the physical writes; the default methods build the
/// remaining wire constructs (booleans, floats, length prefixes, strings) on
/// top of them so every encoder agrees on the layout.
///
/// The trait is object safe: routines produced by the
/// [`Dispatcher`](crate::Dispatcher) write through `&mut dyn Encoder`.
///
/// # Example
///
/// ```ignore
/// struct CountingEncoder {
///     written: usize,
/// }
///
/// impl Encoder for CountingEncoder {
///     fn emit_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
///         self.written += bytes.len();
///         Ok(())
///     }
///
///     // ... the fixed-width methods forward to `emit_raw_bytes`
/// }
/// ```
pub trait Encoder {
    // =========================================================================
    // Required methods - these must be implemented by all encoders
    // =========================================================================

    /// Emits a single unsigned byte.
    fn emit_u8(&mut self, v: u8) -> Result<()>;

    /// Emits a 16-bit unsigned integer in little-endian format.
    fn emit_u16(&mut self, v: u16) -> Result<()>;

    /// Emits a 32-bit unsigned integer in little-endian format.
    fn emit_u32(&mut self, v: u32) -> Result<()>;

    /// Emits a 64-bit unsigned integer in little-endian format.
    fn emit_u64(&mut self, v: u64) -> Result<()>;

    /// Emits raw bytes directly to the output.
    fn emit_raw_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    // =========================================================================
    // Default implementations - can be overridden for optimization
    // =========================================================================

    /// Emits a single signed byte (two's complement).
    #[allow(clippy::cast_sign_loss)]
    fn emit_i8(&mut self, v: i8) -> Result<()> { self.emit_u8(v as u8) }

    /// Emits a 16-bit signed integer (two's complement, little-endian).
    #[allow(clippy::cast_sign_loss)]
    fn emit_i16(&mut self, v: i16) -> Result<()> { self.emit_u16(v as u16) }

    /// Emits a 32-bit signed integer (two's complement, little-endian).
    #[allow(clippy::cast_sign_loss)]
    fn emit_i32(&mut self, v: i32) -> Result<()> { self.emit_u32(v as u32) }

    /// Emits a 64-bit signed integer (two's complement, little-endian).
    #[allow(clippy::cast_sign_loss)]
    fn emit_i64(&mut self, v: i64) -> Result<()> { self.emit_u64(v as u64) }

    /// Emits a boolean value.
    ///
    /// `true` is always written as `0x01` and `false` as `0x00`.
    fn emit_bool(&mut self, v: bool) -> Result<()> {
        self.emit_u8(u8::from(v))
    }

    /// Emits a 32-bit floating-point number as its IEEE 754 bit pattern.
    fn emit_f32(&mut self, v: f32) -> Result<()> { self.emit_u32(v.to_bits()) }

    /// Emits a 64-bit floating-point number as its IEEE 754 bit pattern.
    fn emit_f64(&mut self, v: f64) -> Result<()> { self.emit_u64(v.to_bits()) }

    /// Emits a `u32` length or count prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthOverflow`] if `len` exceeds `u32::MAX`.
    fn emit_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| Error::LengthOverflow(len))?;
        self.emit_u32(len)
    }

    /// Emits a string slice: its byte length as `u32` followed by the UTF-8
    /// bytes, without a terminator.
    fn emit_str(&mut self, v: &str) -> Result<()> {
        self.emit_len(v.len())?;
        self.emit_raw_bytes(v.as_bytes())
    }

    /// Encodes a value of type `T` using this encoder.
    ///
    /// This is the primary entry point for encoding values.
    fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        value.encode(self)
    }
}

/// A trait for types that can be serialized to the borsh wire format.
///
/// A type without an implementation cannot be encoded, so unsupported
/// types are rejected at compile time. Structs usually derive it with
/// `#[derive(Encode)]`.
///
/// # Example
///
/// ```ignore
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Encode for Point {
///     fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
///         self.x.encode(encoder)?;
///         self.y.encode(encoder)
///     }
/// }
/// ```
pub trait Encode {
    /// Encodes this value using the provided encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if a length does not fit in its `u32` prefix or if
    /// the underlying encoder fails.
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()>;
}

// =============================================================================
// Implementations for primitive types
// =============================================================================

macro_rules! impl_encode_primitive {
    ($($ty:ty => $method:ident),+ $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode<E: Encoder + ?Sized>(
                    &self,
                    encoder: &mut E,
                ) -> Result<()> {
                    encoder.$method(*self)
                }
            }
        )+
    };
}

impl_encode_primitive!(
    u8 => emit_u8,
    u16 => emit_u16,
    u32 => emit_u32,
    u64 => emit_u64,
    i8 => emit_i8,
    i16 => emit_i16,
    i32 => emit_i32,
    i64 => emit_i64,
    bool => emit_bool,
    f32 => emit_f32,
    f64 => emit_f64,
);

impl Encode for str {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encoder.emit_str(self)
    }
}

impl Encode for String {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encoder.emit_str(self)
    }
}

// =============================================================================
// Implementations for references and smart pointers
// =============================================================================

macro_rules! impl_encode_deref {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<T: Encode + ?Sized> Encode for $ty {
                fn encode<E: Encoder + ?Sized>(
                    &self,
                    encoder: &mut E,
                ) -> Result<()> {
                    (**self).encode(encoder)
                }
            }
        )+
    };
}

impl_encode_deref!(&T, &mut T, Box<T>, Rc<T>, Arc<T>);

impl<T: Encode + ToOwned + ?Sized> Encode for Cow<'_, T> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        (**self).encode(encoder)
    }
}

// =============================================================================
// Implementation for Option
// =============================================================================

impl<T: Encode> Encode for Option<T> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        match self {
            Some(v) => {
                encoder.emit_u8(1)?;
                v.encode(encoder)
            }
            None => encoder.emit_u8(0),
        }
    }
}

// =============================================================================
// Implementations for sequences
// =============================================================================

impl<T: Encode> Encode for [T] {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encoder.emit_len(self.len())?;
        for item in self {
            item.encode(encoder)?;
        }
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        self.as_slice().encode(encoder)
    }
}

impl<T: Encode> Encode for VecDeque<T> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encoder.emit_len(self.len())?;
        for item in self {
            item.encode(encoder)?;
        }
        Ok(())
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        // the length is part of the type and never written
        for item in self {
            item.encode(encoder)?;
        }
        Ok(())
    }
}

// =============================================================================
// Implementations for maps and sets
// =============================================================================

/// Writes a count prefix followed by `entries` in canonical order: ascending
/// by the encoded bytes of each key.
///
/// Keys are encoded once into a scratch buffer, their byte ranges are
/// sorted, and the pre-encoded key bytes are copied out in that order. The
/// sort is stable, so keys with identical encodings keep their input order.
pub(crate) fn encode_canonical_entries<'a, E, K, V>(
    encoder: &mut E,
    entries: impl ExactSizeIterator<Item = (&'a K, &'a V)>,
) -> Result<()>
where
    E: Encoder + ?Sized,
    K: Encode + ?Sized + 'a,
    V: Encode + ?Sized + 'a,
{
    let mut scratch = Buffer::new();
    let mut sorted = Vec::with_capacity(entries.len());

    for (key, value) in entries {
        let start = scratch.len();
        key.encode(&mut scratch)?;
        sorted.push((start..scratch.len(), value));
    }

    let keys = scratch.finish();
    sorted.sort_by(|(a, _), (b, _)| keys[a.clone()].cmp(&keys[b.clone()]));

    encoder.emit_len(sorted.len())?;
    for (range, value) in sorted {
        encoder.emit_raw_bytes(&keys[range])?;
        value.encode(encoder)?;
    }

    Ok(())
}

impl<K: Encode, V: Encode, S: BuildHasher> Encode for HashMap<K, V, S> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encode_canonical_entries(encoder, self.iter())
    }
}

impl<T: Encode, S: BuildHasher> Encode for HashSet<T, S> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encode_canonical_entries(encoder, self.iter().map(|key| (key, &())))
    }
}

// `Ord` order and encoded-byte order differ (negative integers, strings of
// different lengths), so ordered collections are re-sorted too.
impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encode_canonical_entries(encoder, self.iter())
    }
}

impl<T: Encode> Encode for BTreeSet<T> {
    fn encode<E: Encoder + ?Sized>(&self, encoder: &mut E) -> Result<()> {
        encode_canonical_entries(encoder, self.iter().map(|key| (key, &())))
    }
}

// =============================================================================
// Implementations for tuples
// =============================================================================

impl Encode for () {
    fn encode<E: Encoder + ?Sized>(&self, _encoder: &mut E) -> Result<()> {
        Ok(())
    }
}

macro_rules! impl_encode_tuple {
    ($($name:ident),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode<E: Encoder + ?Sized>(
                &self,
                encoder: &mut E,
            ) -> Result<()> {
                let ($($name,)+) = self;
                $(
                    $name.encode(encoder)?;
                )+
                Ok(())
            }
        }
    };
}

impl_encode_tuple!(A);
impl_encode_tuple!(A, B);
impl_encode_tuple!(A, B, C);
impl_encode_tuple!(A, B, C, D);
impl_encode_tuple!(A, B, C, D, E_);
impl_encode_tuple!(A, B, C, D, E_, F);
impl_encode_tuple!(A, B, C, D, E_, F, G);
impl_encode_tuple!(A, B, C, D, E_, F, G, H);
impl_encode_tuple!(A, B, C, D, E_, F, G, H, I);
impl_encode_tuple!(A, B, C, D, E_, F, G, H, I, J);
impl_encode_tuple!(A, B, C, D, E_, F, G, H, I, J, K);
impl_encode_tuple!(A, B, C, D, E_, F, G, H, I, J, K, L);

impl<T: ?Sized> Encode for std::marker::PhantomData<T> {
    fn encode<E: Encoder + ?Sized>(&self, _encoder: &mut E) -> Result<()> {
        Ok(())
    }
}
