//! Error type shared by every encoding and decoding operation.

/// An error produced while resolving, encoding or decoding a value.
///
/// Every failure is returned to the immediate caller. A decode that fails
/// never yields a partially filled value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Fewer bytes remain than a fixed-width or length-prefixed field
    /// requires.
    #[error(
        "unexpected end of input: needed {needed} bytes but only {remaining} \
         remain"
    )]
    UnexpectedEof {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// The shape contains a construct outside the supported catalog, such
    /// as a 128-bit integer, a tagged union or a collection whose elements
    /// encode to zero bytes.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// A value (or a decode target) does not structurally match the shape
    /// it is used with.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// What the shape called for.
        expected: String,
        /// What was supplied instead.
        found: String,
    },

    /// The bytes are well-sized but not a valid encoding, e.g. a string
    /// that is not UTF-8.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A length does not fit in the 32-bit length prefix.
    #[error("length {0} does not fit in a 32-bit length prefix")]
    LengthOverflow(usize),

    /// Input was left over after a decode that must consume everything.
    #[error("{remaining} trailing bytes left after decoding")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        remaining: usize,
    },
}

impl Error {
    /// Returns `true` if the error was caused by truncated input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof { .. })
    }

    pub(crate) fn mismatch(
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// A specialized [`std::result::Result`] for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
