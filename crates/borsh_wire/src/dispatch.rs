//! Shape-directed resolution of encode/decode routines.
//!
//! The [`Dispatcher`] turns a [`Shape`] into a [`Routine`]: a pair of
//! closures bound to that shape which encode a [`Value`] into any
//! [`Encoder`] and decode one from any [`Decoder`]. Composite shapes are
//! resolved by first resolving their element, field, key and value shapes
//! and binding the resulting routines into the composite's closures.
//!
//! Resolution is purely structural. It never looks at wire content, and it
//! rejects unsupported constructs (128-bit integers, tagged unions, odd
//! widths) before a single byte is read or written.
//!
//! # Memoization
//!
//! Resolved routines are cached per distinct shape. The cache is shared
//! read-mostly across threads: the slot for a shape is created under the
//! map's shard lock, then the routine is built under the slot's own mutex,
//! so concurrent callers asking for the same shape wait for one construction
//! instead of racing. Child shapes are strictly smaller than their parent,
//! so slot locks are always taken in a consistent order.
//!
//! # Example
//!
//! ```ignore
//! let dispatcher = Dispatcher::new();
//! let shape = Shape::sequence(Shape::UInt(16));
//!
//! let value = Value::Sequence(vec![Value::U16(257)]);
//! let bytes = dispatcher.encode(&shape, &value)?;
//! assert_eq!(bytes, [1, 0, 0, 0, 0x01, 0x01]);
//!
//! let value = dispatcher.decode(&bytes, &shape)?;
//! ```

use std::{
    marker::PhantomData,
    ops::Range,
    sync::{Arc, LazyLock},
};

use dashmap::DashMap;
use fxhash::FxBuildHasher;
use parking_lot::Mutex;

use crate::{
    buffer::Buffer,
    config::{Config, DefaultConfig, cautious_capacity},
    cursor::Cursor,
    decode::Decoder,
    encode::Encoder,
    error::{Error, Result},
    shape::{Record, Shape},
    value::Value,
};

type EncodeFn = dyn Fn(&Value, &mut dyn Encoder) -> Result<()> + Send + Sync;
type DecodeFn = dyn Fn(&mut dyn Decoder) -> Result<Value> + Send + Sync;

/// An encode/decode pair bound to exactly one [`Shape`].
///
/// Routines are stateless and can be shared freely between threads and
/// reused across any number of calls.
pub struct Routine {
    shape: Shape,
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

impl Routine {
    /// The shape this routine is bound to.
    #[must_use]
    pub const fn shape(&self) -> &Shape { &self.shape }

    /// Encodes `value` into `encoder`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `value` does not match the
    /// routine's shape, and [`Error::LengthOverflow`] if a length does not
    /// fit in its prefix.
    pub fn encode(
        &self,
        value: &Value,
        encoder: &mut dyn Encoder,
    ) -> Result<()> {
        (self.encode)(value, encoder)
    }

    /// Decodes one value of the routine's shape from `decoder`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if the input is truncated and
    /// [`Error::InvalidData`] if a string is not valid UTF-8.
    pub fn decode(&self, decoder: &mut dyn Decoder) -> Result<Value> {
        (self.decode)(decoder)
    }
}

impl std::fmt::Debug for Routine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Routine")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

type RoutineFns = (Box<EncodeFn>, Box<DecodeFn>);

fn routine_fns<E, D>(encode: E, decode: D) -> RoutineFns
where
    E: Fn(&Value, &mut dyn Encoder) -> Result<()> + Send + Sync + 'static,
    D: Fn(&mut dyn Decoder) -> Result<Value> + Send + Sync + 'static,
{
    (Box::new(encode), Box::new(decode))
}

/// Builds the routine pair for a scalar shape from the matching `Value`
/// variant and encoder/decoder methods.
macro_rules! scalar {
    ($shape:expr, $variant:ident, $emit:ident, $read:ident) => {{
        let expected = $shape.clone();
        routine_fns(
            move |value, encoder| match value {
                Value::$variant(v) => encoder.$emit(*v),
                other => Err(Error::mismatch(&expected, other.kind())),
            },
            |decoder| decoder.$read().map(Value::$variant),
        )
    }};
}

type Slot = Arc<Mutex<Option<Arc<Routine>>>>;

/// Resolves shapes into routines and memoizes the result.
pub struct Dispatcher<C: Config = DefaultConfig> {
    routines: DashMap<Shape, Slot, FxBuildHasher>,
    _config: PhantomData<fn() -> C>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default configuration and an empty
    /// cache.
    #[must_use]
    pub fn new() -> Self { Self::with_config() }

    /// Returns the process-wide dispatcher used by the crate-level
    /// functions.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: LazyLock<Dispatcher> = LazyLock::new(Dispatcher::new);

        &GLOBAL
    }
}

impl Default for Dispatcher {
    fn default() -> Self { Self::new() }
}

impl<C: Config> Dispatcher<C> {
    /// Creates a dispatcher whose behavior is tuned by `C`.
    #[must_use]
    pub fn with_config() -> Self {
        Self {
            routines: DashMap::with_hasher(FxBuildHasher::default()),
            _config: PhantomData,
        }
    }

    /// Resolves the routine for `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] if `shape` or any shape nested in
    /// it lies outside the supported catalog.
    #[tracing::instrument(skip_all, level = "debug", fields(shape = %shape))]
    pub fn resolve(&self, shape: &Shape) -> Result<Arc<Routine>> {
        if let Err(error) = check_supported(shape) {
            tracing::warn!(%error, "rejected shape");
            return Err(error);
        }

        self.resolve_supported(shape)
    }

    /// Number of shapes that currently have a memoized routine slot.
    #[must_use]
    pub fn cached_shapes(&self) -> usize { self.routines.len() }

    /// Drops every memoized routine.
    pub fn clear(&self) { self.routines.clear(); }

    /// Encodes `value` as `shape` into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for unsupported shapes and
    /// [`Error::ShapeMismatch`] if `value` does not match `shape`.
    pub fn encode(&self, shape: &Shape, value: &Value) -> Result<Vec<u8>> {
        let routine = self.resolve(shape)?;
        let mut buffer = Buffer::<C>::with_config();
        routine.encode(value, &mut buffer)?;
        Ok(buffer.into_vec())
    }

    /// Decodes a value of `shape` from the start of `bytes`, ignoring any
    /// trailing bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for unsupported shapes (before
    /// reading anything) and [`Error::UnexpectedEof`] for truncated input.
    pub fn decode(&self, bytes: &[u8], shape: &Shape) -> Result<Value> {
        let routine = self.resolve(shape)?;
        routine.decode(&mut Cursor::<C>::with_config(bytes))
    }

    /// Like [`decode`](Self::decode), but fails with
    /// [`Error::TrailingBytes`] unless all of `bytes` was consumed.
    ///
    /// # Errors
    ///
    /// See [`decode`](Self::decode).
    pub fn decode_exact(&self, bytes: &[u8], shape: &Shape) -> Result<Value> {
        let routine = self.resolve(shape)?;
        let mut cursor = Cursor::<C>::with_config(bytes);
        let value = routine.decode(&mut cursor)?;

        match cursor.remaining() {
            0 => Ok(value),
            remaining => Err(Error::TrailingBytes { remaining }),
        }
    }

    fn resolve_supported(&self, shape: &Shape) -> Result<Arc<Routine>> {
        if !C::memoize_routines() {
            return self.build(shape).map(Arc::new);
        }

        let existing = self.routines.get(shape).map(|slot| Arc::clone(&slot));
        let slot = existing.unwrap_or_else(|| {
            Arc::clone(&self.routines.entry(shape.clone()).or_default())
        });

        let mut slot = slot.lock();
        if let Some(routine) = slot.as_ref() {
            tracing::trace!(%shape, "routine cache hit");
            return Ok(Arc::clone(routine));
        }

        let routine = Arc::new(self.build(shape)?);
        *slot = Some(Arc::clone(&routine));
        tracing::debug!(%shape, "resolved and memoized routine");

        Ok(routine)
    }

    fn build(&self, shape: &Shape) -> Result<Routine> {
        let (encode, decode) = match shape {
            Shape::Bool => scalar!(shape, Bool, emit_bool, read_bool),
            Shape::UInt(8) => scalar!(shape, U8, emit_u8, read_u8),
            Shape::UInt(16) => scalar!(shape, U16, emit_u16, read_u16),
            Shape::UInt(32) => scalar!(shape, U32, emit_u32, read_u32),
            Shape::UInt(64) => scalar!(shape, U64, emit_u64, read_u64),
            Shape::Int(8) => scalar!(shape, I8, emit_i8, read_i8),
            Shape::Int(16) => scalar!(shape, I16, emit_i16, read_i16),
            Shape::Int(32) => scalar!(shape, I32, emit_i32, read_i32),
            Shape::Int(64) => scalar!(shape, I64, emit_i64, read_i64),
            Shape::Float(32) => scalar!(shape, F32, emit_f32, read_f32),
            Shape::Float(64) => scalar!(shape, F64, emit_f64, read_f64),

            Shape::String => {
                let expected = shape.clone();
                routine_fns(
                    move |value, encoder| match value {
                        Value::String(text) => encoder.emit_str(text),
                        other => Err(Error::mismatch(&expected, other.kind())),
                    },
                    |decoder| decoder.read_str().map(Value::String),
                )
            }

            Shape::FixedArray(element, len) => fixed_array_routine(
                shape,
                &self.resolve_supported(element)?,
                *len,
            ),

            Shape::Sequence(element) => {
                sequence_routine(shape, &self.resolve_supported(element)?)
            }

            Shape::Record(record) => self.record(shape, record)?,

            Shape::Map(key, value) => map_routine(
                shape,
                &self.resolve_supported(key)?,
                &self.resolve_supported(value)?,
            ),

            Shape::Set(key) => {
                set_routine(shape, &self.resolve_supported(key)?)
            }

            Shape::Optional(element) => {
                optional_routine(shape, &self.resolve_supported(element)?)
            }

            Shape::UInt(_)
            | Shape::Int(_)
            | Shape::Float(_)
            | Shape::Variant(_) => return Err(unsupported(shape)),
        };

        Ok(Routine { shape: shape.clone(), encode, decode })
    }

    fn record(&self, shape: &Shape, record: &Record) -> Result<RoutineFns> {
        let fields = record
            .fields
            .iter()
            .map(|field| self.resolve_supported(&field.shape))
            .collect::<Result<Arc<[_]>>>()?;

        let expected = shape.clone();
        let encode_fields = Arc::clone(&fields);
        let decode_fields = fields;

        Ok(routine_fns(
            move |value, encoder| match value {
                Value::Record(values)
                    if values.len() == encode_fields.len() =>
                {
                    for (field, value) in encode_fields.iter().zip(values) {
                        field.encode(value, encoder)?;
                    }
                    Ok(())
                }
                Value::Record(values) => Err(Error::mismatch(
                    &expected,
                    format_args!("record with {} fields", values.len()),
                )),
                other => Err(Error::mismatch(&expected, other.kind())),
            },
            move |decoder| {
                decode_fields
                    .iter()
                    .map(|field| field.decode(decoder))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Record)
            },
        ))
    }
}

impl<C: Config> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("cached_shapes", &self.routines.len())
            .finish_non_exhaustive()
    }
}

fn fixed_array_routine(
    shape: &Shape,
    element: &Arc<Routine>,
    len: usize,
) -> RoutineFns {
    let expected = shape.clone();
    let encode_element = Arc::clone(element);
    let decode_element = Arc::clone(element);

    routine_fns(
        move |value, encoder| match value {
            Value::Array(items) if items.len() == len => {
                for item in items {
                    encode_element.encode(item, encoder)?;
                }
                Ok(())
            }
            Value::Array(items) => Err(Error::mismatch(
                &expected,
                format_args!("array of length {}", items.len()),
            )),
            other => Err(Error::mismatch(&expected, other.kind())),
        },
        move |decoder| {
            decode_items(decoder, &decode_element, len).map(Value::Array)
        },
    )
}

fn sequence_routine(shape: &Shape, element: &Arc<Routine>) -> RoutineFns {
    let expected = shape.clone();
    let encode_element = Arc::clone(element);
    let decode_element = Arc::clone(element);

    routine_fns(
        move |value, encoder| match value {
            Value::Sequence(items) => {
                encoder.emit_len(items.len())?;
                for item in items {
                    encode_element.encode(item, encoder)?;
                }
                Ok(())
            }
            other => Err(Error::mismatch(&expected, other.kind())),
        },
        move |decoder| {
            let count = read_plausible_count(
                decoder,
                decode_element.shape().min_encoded_len(),
            )?;
            decode_items(decoder, &decode_element, count)
                .map(Value::Sequence)
        },
    )
}

fn map_routine(
    shape: &Shape,
    key: &Arc<Routine>,
    value: &Arc<Routine>,
) -> RoutineFns {
    let expected = shape.clone();
    let (encode_key, encode_value) = (Arc::clone(key), Arc::clone(value));
    let (decode_key, decode_value) = (Arc::clone(key), Arc::clone(value));
    let min_pair_len = key
        .shape()
        .min_encoded_len()
        .saturating_add(value.shape().min_encoded_len());

    routine_fns(
        move |map, encoder| match map {
            Value::Map(pairs) => {
                let keys = pairs.iter().map(|(key, _)| key);
                let (scratch, order) = sort_by_encoding(&encode_key, keys)?;

                encoder.emit_len(order.len())?;
                for (range, index) in order {
                    encoder.emit_raw_bytes(&scratch[range])?;
                    encode_value.encode(&pairs[index].1, encoder)?;
                }
                Ok(())
            }
            other => Err(Error::mismatch(&expected, other.kind())),
        },
        move |decoder| {
            let count = read_plausible_count(decoder, min_pair_len)?;
            let capacity = cautious_capacity::<(Value, Value)>(
                count,
                decoder.max_preallocation_bytes(),
            );
            let mut pairs = Vec::with_capacity(capacity);
            for _ in 0..count {
                let key = decode_key.decode(decoder)?;
                let value = decode_value.decode(decoder)?;
                pairs.push((key, value));
            }
            Ok(Value::Map(pairs))
        },
    )
}

fn set_routine(shape: &Shape, key: &Arc<Routine>) -> RoutineFns {
    let expected = shape.clone();
    let encode_key = Arc::clone(key);
    let decode_key = Arc::clone(key);

    routine_fns(
        move |set, encoder| match set {
            Value::Set(keys) => {
                let (scratch, order) =
                    sort_by_encoding(&encode_key, keys.iter())?;

                encoder.emit_len(order.len())?;
                for (range, _) in order {
                    encoder.emit_raw_bytes(&scratch[range])?;
                }
                Ok(())
            }
            other => Err(Error::mismatch(&expected, other.kind())),
        },
        move |decoder| {
            let count = read_plausible_count(
                decoder,
                decode_key.shape().min_encoded_len(),
            )?;
            decode_items(decoder, &decode_key, count).map(Value::Set)
        },
    )
}

fn optional_routine(shape: &Shape, element: &Arc<Routine>) -> RoutineFns {
    let expected = shape.clone();
    let encode_element = Arc::clone(element);
    let decode_element = Arc::clone(element);

    routine_fns(
        move |value, encoder| match value {
            Value::Optional(None) => encoder.emit_u8(0),
            Value::Optional(Some(inner)) => {
                encoder.emit_u8(1)?;
                encode_element.encode(inner, encoder)
            }
            other => Err(Error::mismatch(&expected, other.kind())),
        },
        move |decoder| {
            // any non-zero presence byte means present
            if decoder.read_u8()? == 0 {
                return Ok(Value::Optional(None));
            }
            let inner = decode_element.decode(decoder)?;
            Ok(Value::Optional(Some(Box::new(inner))))
        },
    )
}

/// Rejects every construct outside the supported catalog, anywhere in the
/// shape tree.
fn check_supported(shape: &Shape) -> Result<()> {
    match shape {
        Shape::Bool | Shape::String => Ok(()),
        Shape::UInt(8 | 16 | 32 | 64)
        | Shape::Int(8 | 16 | 32 | 64)
        | Shape::Float(32 | 64) => Ok(()),
        Shape::UInt(_)
        | Shape::Int(_)
        | Shape::Float(_)
        | Shape::Variant(_) => Err(unsupported(shape)),
        Shape::FixedArray(element, _) | Shape::Optional(element) => {
            check_supported(element)
        }
        Shape::Sequence(element) | Shape::Set(element) => {
            check_supported(element)?;
            if element.min_encoded_len() == 0 {
                return Err(unsupported(shape));
            }
            Ok(())
        }
        Shape::Map(key, value) => {
            check_supported(key)?;
            check_supported(value)?;
            if key.min_encoded_len() == 0 && value.min_encoded_len() == 0 {
                return Err(unsupported(shape));
            }
            Ok(())
        }
        Shape::Record(record) => record
            .fields
            .iter()
            .try_for_each(|field| check_supported(&field.shape)),
    }
}

fn unsupported(shape: &Shape) -> Error {
    let reason = match shape {
        Shape::UInt(128) | Shape::Int(128) => {
            format!("{shape} (128-bit integers are not part of the format)")
        }
        Shape::UInt(bits) | Shape::Int(bits) => {
            format!("{shape} (integer width {bits} is not 8, 16, 32 or 64)")
        }
        Shape::Float(bits) => {
            format!("{shape} (float width {bits} is not 32 or 64)")
        }
        Shape::Variant(variant) => {
            format!("tagged union `{}`", variant.name)
        }
        Shape::Sequence(_) | Shape::Set(_) | Shape::Map(..) => {
            format!("{shape} (collection of zero-sized elements)")
        }
        other => other.to_string(),
    };

    Error::UnsupportedType(reason)
}

/// Reads a count prefix and rejects it if the remaining input cannot hold
/// that many elements of at least `min_len` bytes each.
fn read_plausible_count(
    decoder: &mut dyn Decoder,
    min_len: usize,
) -> Result<usize> {
    let count = decoder.read_len()?;

    if let Some(remaining) = decoder.remaining_hint() {
        let needed = count.saturating_mul(min_len);
        if needed > remaining {
            return Err(Error::UnexpectedEof { needed, remaining });
        }
    }

    Ok(count)
}

fn decode_items(
    decoder: &mut dyn Decoder,
    element: &Routine,
    count: usize,
) -> Result<Vec<Value>> {
    let mut items = Vec::with_capacity(cautious_capacity::<Value>(
        count,
        decoder.max_preallocation_bytes(),
    ));
    for _ in 0..count {
        items.push(element.decode(decoder)?);
    }
    Ok(items)
}

/// Encodes every key into one scratch buffer and returns it with the key
/// byte ranges (paired with the key's input index) sorted ascending by the
/// bytes they cover. The sort is stable.
fn sort_by_encoding<'a>(
    key: &Routine,
    keys: impl Iterator<Item = &'a Value>,
) -> Result<(Vec<u8>, Vec<(Range<usize>, usize)>)> {
    let mut scratch = Buffer::new();
    let mut order = Vec::new();

    for (index, value) in keys.enumerate() {
        let start = scratch.len();
        key.encode(value, &mut scratch)?;
        order.push((start..scratch.len(), index));
    }

    let scratch = scratch.into_vec();
    order.sort_by(|(a, _), (b, _)| {
        scratch[a.clone()].cmp(&scratch[b.clone()])
    });

    Ok((scratch, order))
}

#[cfg(test)]
mod test;
