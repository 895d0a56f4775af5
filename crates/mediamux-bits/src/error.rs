//! Error types for mediamux-bits.

use thiserror::Error;

/// Result type for bit cursor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure conditions of the bit cursors.
///
/// The reader only ever fails with [`Error::OutOfData`]; telling truncated
/// input apart from malformed input is up to the header parser on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A read, peek, write or reader seek needed more bits than the buffer has left.
    #[error("out of data: requested {requested} bits, {remaining} remaining")]
    OutOfData { requested: usize, remaining: usize },

    /// The writer was positioned outside of its buffer.
    #[error("seek out of range: bit {position} in a buffer of {len_bits} bits")]
    Seek { position: usize, len_bits: usize },
}

impl Error {
    /// Whether this is the end-of-data condition.
    pub fn is_out_of_data(&self) -> bool {
        matches!(self, Self::OutOfData { .. })
    }
}
