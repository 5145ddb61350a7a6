//! Bounds-checked sequential reads over a borrowed byte slice.

use std::marker::PhantomData;

use crate::{
    config::{Config, DefaultConfig},
    decode::Decoder,
    error::{Error, Result},
};

/// A read position over an immutable byte slice.
///
/// The position only moves forward and never passes the end of the slice.
/// Every read either advances by exactly the requested width or fails with
/// [`Error::UnexpectedEof`] and leaves the position where it was.
///
/// # Example
///
/// ```ignore
/// let mut cursor = Cursor::new(&[0x01, 0x01, 0xFF]);
/// assert_eq!(cursor.read_fixed::<2>()?, [0x01, 0x01]);
/// assert_eq!(cursor.remainder(), &[0xFF]);
/// ```
pub struct Cursor<'a, C: Config = DefaultConfig> {
    bytes: &'a [u8],
    position: usize,
    _config: PhantomData<fn() -> C>,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `bytes` with the default
    /// configuration.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self { Self::with_config(bytes) }
}

impl<'a, C: Config> Cursor<'a, C> {
    /// Creates a cursor at the start of `bytes`.
    #[must_use]
    pub const fn with_config(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0, _config: PhantomData }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize { self.position }

    /// Number of bytes not yet consumed.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Returns `true` if every byte has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.remaining() == 0 }

    /// Returns the unconsumed bytes without advancing.
    #[must_use]
    pub fn remainder(&self) -> &'a [u8] { &self.bytes[self.position..] }

    /// Consumes the next `len` bytes and returns them as a sub-slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if fewer than `len` bytes remain.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::UnexpectedEof { needed: len, remaining });
        }

        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;

        Ok(slice)
    }

    /// Consumes the next `N` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEof`] if fewer than `N` bytes remain.
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_slice(N)?);
        Ok(array)
    }
}

impl<C: Config> std::fmt::Debug for Cursor<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("position", &self.position)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl<C: Config> Decoder for Cursor<'_, C> {
    fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.read_fixed()?;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_fixed()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_fixed()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_fixed()?))
    }

    fn read_raw_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.read_slice(len)?.to_vec())
    }

    fn remaining_hint(&self) -> Option<usize> { Some(self.remaining()) }

    fn max_preallocation_bytes(&self) -> usize { C::max_preallocation_bytes() }

    // Override to read floats straight from their little-endian bytes
    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_fixed()?))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_fixed()?))
    }

    // Override to validate UTF-8 in place instead of copying first
    fn read_str(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.read_slice(len)?;

        std::str::from_utf8(bytes).map(str::to_owned).map_err(|error| {
            Error::InvalidData(format!("invalid UTF-8: {error}"))
        })
    }
}
