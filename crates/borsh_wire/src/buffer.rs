//! The growable byte buffer that backs every encode call.

use std::marker::PhantomData;

use crate::{
    config::{Config, DefaultConfig},
    encode::Encoder,
    error::Result,
};

/// An owned, growable byte sequence with an explicit growth policy.
///
/// Before a write of `n` bytes that does not fit in the spare capacity, the
/// capacity becomes `max(capacity * growth, len + n)` where the growth factor
/// comes from [`Config::growth_factor_percent`]. Capacity never shrinks and
/// bytes once written are never changed; a reallocation preserves them.
///
/// A buffer is created per encode call and owned exclusively by it.
///
/// # Example
///
/// ```ignore
/// let mut buffer = Buffer::new();
/// buffer.write_fixed(257u16.to_le_bytes());
/// assert_eq!(buffer.finish(), &[0x01, 0x01]);
/// ```
pub struct Buffer<C: Config = DefaultConfig> {
    bytes: Vec<u8>,
    _config: PhantomData<fn() -> C>,
}

impl Buffer {
    /// Creates an empty buffer with the default configuration.
    #[must_use]
    pub fn new() -> Self { Self::with_config() }
}

impl Default for Buffer {
    fn default() -> Self { Self::new() }
}

impl<C: Config> Buffer<C> {
    /// Creates an empty buffer whose initial capacity is taken from `C`.
    #[must_use]
    pub fn with_config() -> Self {
        Self {
            bytes: Vec::with_capacity(C::initial_buffer_capacity()),
            _config: PhantomData,
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize { self.bytes.len() }

    /// Returns `true` if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    /// Currently allocated capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize { self.bytes.capacity() }

    /// Ensures that at least `needed` more bytes can be written without
    /// another reallocation, growing per the buffer's policy.
    pub fn reserve(&mut self, needed: usize) {
        let len = self.bytes.len();
        if self.bytes.capacity() - len >= needed {
            return;
        }

        let grown = self
            .bytes
            .capacity()
            .saturating_mul(C::growth_factor_percent())
            .div_ceil(100);
        let target = grown.max(len.saturating_add(needed));

        self.bytes.reserve_exact(target - len);
    }

    /// Appends exactly `N` bytes, already in little-endian order.
    pub fn write_fixed<const N: usize>(&mut self, bytes: [u8; N]) {
        self.reserve(N);
        self.bytes.extend_from_slice(&bytes);
    }

    /// Appends a run of raw bytes.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.bytes.extend_from_slice(bytes);
    }

    /// Returns every byte written so far.
    ///
    /// Calling this repeatedly returns the same bytes, and the buffer stays
    /// usable for further writes.
    #[must_use]
    pub fn finish(&self) -> &[u8] { &self.bytes }

    /// Consumes the buffer and returns the written bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> { self.bytes }
}

impl<C: Config> std::fmt::Debug for Buffer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.bytes.len())
            .field("capacity", &self.bytes.capacity())
            .finish_non_exhaustive()
    }
}

impl<C: Config> Encoder for Buffer<C> {
    fn emit_u8(&mut self, v: u8) -> Result<()> {
        self.write_fixed([v]);
        Ok(())
    }

    fn emit_u16(&mut self, v: u16) -> Result<()> {
        self.write_fixed(v.to_le_bytes());
        Ok(())
    }

    fn emit_u32(&mut self, v: u32) -> Result<()> {
        self.write_fixed(v.to_le_bytes());
        Ok(())
    }

    fn emit_u64(&mut self, v: u64) -> Result<()> {
        self.write_fixed(v.to_le_bytes());
        Ok(())
    }

    fn emit_raw_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_raw(bytes);
        Ok(())
    }

    // Override to write floats straight from their little-endian bytes
    fn emit_f32(&mut self, v: f32) -> Result<()> {
        self.write_fixed(v.to_le_bytes());
        Ok(())
    }

    fn emit_f64(&mut self, v: f64) -> Result<()> {
        self.write_fixed(v.to_le_bytes());
        Ok(())
    }
}
