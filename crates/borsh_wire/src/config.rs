//! Tunable parameters for buffers, cursors and the dispatcher.
//!
//! The [`Config`] trait groups the knobs that affect allocation behavior
//! without affecting the bytes produced. Every knob has a default, so a
//! custom configuration only overrides what it needs:
//!
//! ```ignore
//! #[derive(Debug, Clone, Copy, Default)]
//! struct SmallConfig;
//!
//! impl Config for SmallConfig {
//!     fn initial_buffer_capacity() -> usize { 16 }
//!
//!     fn max_preallocation_bytes() -> usize { 512 }
//! }
//!
//! let mut buffer = Buffer::<SmallConfig>::with_config();
//! ```

/// Allocation and caching parameters.
///
/// None of these settings change the wire format; two configurations always
/// encode the same value to the same bytes.
pub trait Config: 'static + Send + Sync {
    /// Capacity in bytes a freshly created [`Buffer`](crate::Buffer) starts
    /// with.
    #[must_use]
    fn initial_buffer_capacity() -> usize { 256 }

    /// Growth factor applied to a buffer's capacity when a write does not
    /// fit, in percent. `150` means the capacity grows to at least 1.5x.
    #[must_use]
    fn growth_factor_percent() -> usize { 150 }

    /// Upper bound, in bytes, of the memory pre-allocated for a sequence,
    /// map or set before its elements are actually decoded.
    ///
    /// A length prefix is untrusted input; capping the up-front
    /// reservation keeps a forged prefix from forcing a huge allocation.
    #[must_use]
    fn max_preallocation_bytes() -> usize { 4096 }

    /// Whether the [`Dispatcher`](crate::Dispatcher) memoizes resolved
    /// routines per shape.
    #[must_use]
    fn memoize_routines() -> bool { true }
}

/// The default configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DefaultConfig;

impl Config for DefaultConfig {}

/// Returns how many `T` slots to reserve for `count` announced elements
/// without reserving more than `max_bytes`.
#[must_use]
pub fn cautious_capacity<T>(count: usize, max_bytes: usize) -> usize {
    let element_size = std::mem::size_of::<T>().max(1);
    count.min((max_bytes / element_size).max(1))
}
