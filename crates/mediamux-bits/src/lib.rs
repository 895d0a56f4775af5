//! # mediamux-bits
//!
//! Sequential bit cursors over borrowed byte buffers.
//!
//! [`BitReader`] extracts MSB-first bit fields, unary codes and
//! Exponential-Golomb codes from codec payloads. [`BitWriter`] writes bit
//! fields into a mutable buffer and can copy fields straight out of a reader,
//! which lets a header be re-emitted bit for bit while single fields are
//! replaced.
//!
//! Neither cursor allocates or owns its buffer. A failed call never hands out
//! a partially read value and leaves the cursor where it was; a failed write
//! or copy leaves the written buffer untouched as well.
//!
//! ## Example
//!
//! ```
//! use mediamux_bits::BitReader;
//!
//! let data = [0xB5];
//! let mut reader = BitReader::new(&data);
//!
//! assert_eq!(reader.read_bits(3).unwrap(), 5);
//! assert_eq!(reader.read_bits(5).unwrap(), 21);
//! assert!(reader.read_bit().is_err());
//! ```

pub mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::BitReader;
pub use writer::BitWriter;

/// Maximum width of a single fixed-length field.
pub const MAX_FIELD_BITS: u32 = 64;

/// Longest Exp-Golomb prefix that can still encode a 64-bit value.
///
/// With 64 leading zeros only the all-zero suffix, `u64::MAX`, fits.
pub(crate) const MAX_GOLOMB_LEADING_ZEROS: u32 = 64;

/// Value of an Exp-Golomb code with `leading_zeros` prefix bits and the
/// given suffix, or `None` if it does not fit into 64 bits.
#[inline]
pub(crate) fn golomb_value(leading_zeros: u32, suffix: u64) -> Option<u64> {
    let value = (1u128 << leading_zeros) - 1 + u128::from(suffix);
    u64::try_from(value).ok()
}

/// Zig-zag mapping from an unsigned Exp-Golomb value to a signed one.
///
/// Odd values map to positive numbers, even values to zero and negatives.
/// `u64::MAX` would map to 2^63, which has no `i64`; it stands for `i64::MIN`
/// instead, the one negative value the even codes cannot reach.
#[inline]
pub fn golomb_to_signed(value: u64) -> i64 {
    if value == u64::MAX {
        i64::MIN
    } else if value & 1 == 1 {
        (value / 2 + 1) as i64
    } else {
        -((value / 2) as i64)
    }
}

/// Inverse of [`golomb_to_signed`].
#[inline]
pub fn signed_to_golomb(value: i64) -> u64 {
    if value == i64::MIN {
        u64::MAX
    } else if value > 0 {
        (value as u64) * 2 - 1
    } else {
        value.unsigned_abs() * 2
    }
}
