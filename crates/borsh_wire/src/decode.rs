//! Decoding traits and implementations for deserialization.
//!
//! This module provides the [`Decoder`] trait for byte sources that speak the
//! borsh wire format, and the [`Decode`] trait for types that can be
//! deserialized from one.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    hash::{BuildHasher, Hash},
    rc::Rc,
    sync::Arc,
};

use crate::{
    config::{Config, DefaultConfig, cautious_capacity},
    error::{Error, Result},
};

/// A source of fixed-width little-endian primitives.
///
/// Implementors provide the physical reads; the default methods build the
/// remaining wire constructs on top of them. Any read that runs out of
/// input fails with [`Error::UnexpectedEof`].
///
/// The trait is object safe: routines produced by the
/// [`Dispatcher`](crate::Dispatcher) read through `&mut dyn Decoder`.
pub trait Decoder {
    // =========================================================================
    // Required methods - these must be implemented by all decoders
    // =========================================================================

    /// Reads a single unsigned byte.
    fn read_u8(&mut self) -> Result<u8>;

    /// Reads a 16-bit unsigned integer in little-endian format.
    fn read_u16(&mut self) -> Result<u16>;

    /// Reads a 32-bit unsigned integer in little-endian format.
    fn read_u32(&mut self) -> Result<u32>;

    /// Reads a 64-bit unsigned integer in little-endian format.
    fn read_u64(&mut self) -> Result<u64>;

    /// Reads exactly `len` raw bytes.
    fn read_raw_bytes(&mut self, len: usize) -> Result<Vec<u8>>;

    // =========================================================================
    // Default implementations - can be overridden for optimization
    // =========================================================================

    /// Number of bytes left in the input, if the decoder knows it.
    ///
    /// Used to reject length prefixes that cannot possibly be satisfied
    /// before any allocation happens.
    fn remaining_hint(&self) -> Option<usize> { None }

    /// Upper bound of the memory reserved up front for a collection whose
    /// length prefix has not been validated yet.
    fn max_preallocation_bytes(&self) -> usize {
        DefaultConfig::max_preallocation_bytes()
    }

    /// Reads a single signed byte (two's complement).
    #[allow(clippy::cast_possible_wrap)]
    fn read_i8(&mut self) -> Result<i8> { Ok(self.read_u8()? as i8) }

    /// Reads a 16-bit signed integer (two's complement, little-endian).
    #[allow(clippy::cast_possible_wrap)]
    fn read_i16(&mut self) -> Result<i16> { Ok(self.read_u16()? as i16) }

    /// Reads a 32-bit signed integer (two's complement, little-endian).
    #[allow(clippy::cast_possible_wrap)]
    fn read_i32(&mut self) -> Result<i32> { Ok(self.read_u32()? as i32) }

    /// Reads a 64-bit signed integer (two's complement, little-endian).
    #[allow(clippy::cast_possible_wrap)]
    fn read_i64(&mut self) -> Result<i64> { Ok(self.read_u64()? as i64) }

    /// Reads a boolean value.
    ///
    /// `0x00` decodes as `false` and any other byte as `true`.
    fn read_bool(&mut self) -> Result<bool> { Ok(self.read_u8()? != 0) }

    /// Reads a 32-bit floating-point number from its IEEE 754 bit pattern.
    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads a 64-bit floating-point number from its IEEE 754 bit pattern.
    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a `u32` length or count prefix.
    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u32()?;
        usize::try_from(len).map_err(|_| {
            Error::InvalidData(format!(
                "length {len} is out of range for this platform"
            ))
        })
    }

    /// Reads a string: a `u32` byte length followed by that many UTF-8
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] if the bytes are not valid UTF-8.
    fn read_str(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.read_raw_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::InvalidData(format!("invalid UTF-8: {e}")))
    }

    /// Decodes a value of type `T` from this decoder.
    ///
    /// This is the primary entry point for decoding values.
    fn decode<T: Decode>(&mut self) -> Result<T>
    where
        Self: Sized,
    {
        T::decode(self)
    }
}

/// A trait for types that can be deserialized from the borsh wire format.
///
/// Structs usually derive it with `#[derive(Decode)]`.
///
/// # Example
///
/// ```ignore
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Decode for Point {
///     fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
///         let x = i32::decode(decoder)?;
///         let y = i32::decode(decoder)?;
///         Ok(Point { x, y })
///     }
/// }
/// ```
pub trait Decode: Sized {
    /// Decodes a value using the provided decoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is truncated or not a valid encoding of
    /// `Self`.
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self>;
}

/// Reads a count prefix and returns it together with a safe capacity to
/// reserve for `T` elements.
///
/// A non-empty collection of zero-sized elements is rejected with
/// [`Error::UnsupportedType`]: its elements consume no input, so the count
/// alone would decide how long decoding runs.
fn read_count<T, D: Decoder + ?Sized>(
    decoder: &mut D,
) -> Result<(usize, usize)> {
    let count = decoder.read_len()?;
    if count > 0 && std::mem::size_of::<T>() == 0 {
        return Err(Error::UnsupportedType(format!(
            "collection of zero-sized `{}`",
            std::any::type_name::<T>()
        )));
    }
    let capacity =
        cautious_capacity::<T>(count, decoder.max_preallocation_bytes());
    Ok((count, capacity))
}

// =============================================================================
// Implementations for primitive types
// =============================================================================

macro_rules! impl_decode_primitive {
    ($($ty:ty => $method:ident),+ $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
                    decoder.$method()
                }
            }
        )+
    };
}

impl_decode_primitive!(
    u8 => read_u8,
    u16 => read_u16,
    u32 => read_u32,
    u64 => read_u64,
    i8 => read_i8,
    i16 => read_i16,
    i32 => read_i32,
    i64 => read_i64,
    bool => read_bool,
    f32 => read_f32,
    f64 => read_f64,
    String => read_str,
);

impl Decode for Box<str> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        Ok(decoder.read_str()?.into_boxed_str())
    }
}

impl Decode for Rc<str> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        Ok(Self::from(decoder.read_str()?))
    }
}

impl Decode for Arc<str> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        Ok(Self::from(decoder.read_str()?))
    }
}

// =============================================================================
// Implementations for smart pointers
// =============================================================================

impl<T: Decode> Decode for Box<T> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        Ok(Self::new(T::decode(decoder)?))
    }
}

impl<T: Decode> Decode for Rc<T> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        Ok(Self::new(T::decode(decoder)?))
    }
}

impl<T: Decode> Decode for Arc<T> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        Ok(Self::new(T::decode(decoder)?))
    }
}

impl<T: Decode> Decode for Box<[T]> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        Ok(Vec::<T>::decode(decoder)?.into_boxed_slice())
    }
}

// =============================================================================
// Implementation for Option
// =============================================================================

impl<T: Decode> Decode for Option<T> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        // any non-zero presence byte means present
        if decoder.read_u8()? == 0 {
            Ok(None)
        } else {
            Ok(Some(T::decode(decoder)?))
        }
    }
}

// =============================================================================
// Implementations for sequences
// =============================================================================

impl<T: Decode> Decode for Vec<T> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        let (len, capacity) = read_count::<T, _>(decoder)?;
        let mut vec = Self::with_capacity(capacity);
        for _ in 0..len {
            vec.push(T::decode(decoder)?);
        }
        Ok(vec)
    }
}

impl<T: Decode> Decode for VecDeque<T> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        let (len, capacity) = read_count::<T, _>(decoder)?;
        let mut deque = Self::with_capacity(capacity);
        for _ in 0..len {
            deque.push_back(T::decode(decoder)?);
        }
        Ok(deque)
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::decode(decoder)?);
        }

        items.try_into().map_err(|items: Vec<T>| {
            Error::InvalidData(format!(
                "decoded {} elements for an array of length {N}",
                items.len()
            ))
        })
    }
}

// =============================================================================
// Implementations for maps and sets
// =============================================================================

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: Decode + Eq + Hash,
    V: Decode,
    S: BuildHasher + Default,
{
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        let (len, capacity) = read_count::<(K, V), _>(decoder)?;
        let mut map = Self::with_capacity_and_hasher(capacity, S::default());
        for _ in 0..len {
            let key = K::decode(decoder)?;
            let value = V::decode(decoder)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<T, S> Decode for HashSet<T, S>
where
    T: Decode + Eq + Hash,
    S: BuildHasher + Default,
{
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        let (len, capacity) = read_count::<T, _>(decoder)?;
        let mut set = Self::with_capacity_and_hasher(capacity, S::default());
        for _ in 0..len {
            set.insert(T::decode(decoder)?);
        }
        Ok(set)
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        // nodes are allocated per insert, only the count check applies
        let (len, _) = read_count::<(K, V), _>(decoder)?;
        let mut map = Self::new();
        for _ in 0..len {
            let key = K::decode(decoder)?;
            let value = V::decode(decoder)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<T: Decode + Ord> Decode for BTreeSet<T> {
    fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
        let (len, _) = read_count::<T, _>(decoder)?;
        let mut set = Self::new();
        for _ in 0..len {
            set.insert(T::decode(decoder)?);
        }
        Ok(set)
    }
}

// =============================================================================
// Implementations for tuples
// =============================================================================

impl Decode for () {
    fn decode<D: Decoder + ?Sized>(_decoder: &mut D) -> Result<Self> { Ok(()) }
}

macro_rules! impl_decode_tuple {
    ($($name:ident),+) => {
        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode<D: Decoder + ?Sized>(decoder: &mut D) -> Result<Self> {
                Ok(($($name::decode(decoder)?,)+))
            }
        }
    };
}

impl_decode_tuple!(A);
impl_decode_tuple!(A, B);
impl_decode_tuple!(A, B, C);
impl_decode_tuple!(A, B, C, D_);
impl_decode_tuple!(A, B, C, D_, E);
impl_decode_tuple!(A, B, C, D_, E, F);
impl_decode_tuple!(A, B, C, D_, E, F, G);
impl_decode_tuple!(A, B, C, D_, E, F, G, H);
impl_decode_tuple!(A, B, C, D_, E, F, G, H, I);
impl_decode_tuple!(A, B, C, D_, E, F, G, H, I, J);
impl_decode_tuple!(A, B, C, D_, E, F, G, H, I, J, K);
impl_decode_tuple!(A, B, C, D_, E, F, G, H, I, J, K, L);

impl<T: ?Sized> Decode for std::marker::PhantomData<T> {
    fn decode<D: Decoder + ?Sized>(_decoder: &mut D) -> Result<Self> {
        Ok(Self)
    }
}
