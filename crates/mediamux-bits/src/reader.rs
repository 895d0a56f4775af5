//! Sequential MSB-first bit reader.

use crate::error::{Error, Result};
use crate::{golomb_to_signed, golomb_value, MAX_FIELD_BITS, MAX_GOLOMB_LEADING_ZEROS};

/// Saved cursor state, used to roll back composite reads that fail halfway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Position {
    byte_pos: usize,
    bits_valid: usize,
}

/// Bit reader over a borrowed byte slice.
///
/// `bits_valid` counts the unread bits of the byte at `byte_pos` and runs from
/// 8 down to 1. Once the last bit of a byte has been consumed the cursor moves
/// to the next byte and `bits_valid` is back at 8.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bits_valid: usize,
    out_of_data: bool,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bits_valid: if data.is_empty() { 0 } else { 8 },
            out_of_data: data.is_empty(),
        }
    }

    /// Rebind the reader to another buffer and rewind it.
    pub fn init(&mut self, data: &'a [u8]) {
        *self = Self::new(data);
    }

    /// Whether the reader has run out of data.
    ///
    /// Set by any read or reposition that needed bits past the end of the
    /// buffer, and by binding an empty buffer.
    pub fn eof(&self) -> bool {
        self.out_of_data
    }

    /// Total length of the underlying buffer in bits.
    pub fn len_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// Absolute bit offset from the start of the buffer.
    pub fn bit_position(&self) -> usize {
        if self.bits_valid == 0 {
            return self.byte_pos * 8;
        }
        self.byte_pos * 8 + 8 - self.bits_valid
    }

    /// Bits left between the cursor and the end of the buffer.
    pub fn remaining_bits(&self) -> usize {
        self.len_bits() - self.bit_position()
    }

    /// Whether the cursor sits on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_position() % 8 == 0
    }

    /// Read `n` bits (at most 64), most significant bit first.
    ///
    /// Fails with [`Error::OutOfData`] if fewer than `n` bits remain, in which
    /// case nothing is consumed.
    pub fn read_bits(&mut self, n: u32) -> Result<u64> {
        debug_assert!(n <= MAX_FIELD_BITS, "cannot read {n} bits into a u64");

        self.ensure(n as usize)?;

        let mut position = self.position();
        let value = self.extract(&mut position, n);
        self.restore(position);

        Ok(value)
    }

    /// Read `n` bits without moving the cursor.
    pub fn peek_bits(&self, n: u32) -> Result<u64> {
        debug_assert!(n <= MAX_FIELD_BITS, "cannot peek {n} bits into a u64");

        let remaining = self.remaining_bits();
        if n as usize > remaining {
            return Err(Error::OutOfData {
                requested: n as usize,
                remaining,
            });
        }

        let mut scratch = self.position();
        Ok(self.extract(&mut scratch, n))
    }

    /// Read a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Count bits that differ from `stop_bit`.
    ///
    /// Stops after consuming the first bit equal to `stop_bit` (which is not
    /// counted) or after `max_len` bits, whichever comes first. Reaching
    /// `max_len` without seeing the stop bit is not an error.
    pub fn read_unary(&mut self, stop_bit: bool, max_len: usize) -> Result<usize> {
        self.atomically(|reader| {
            let mut count = 0;
            while count < max_len && reader.read_bit()? != stop_bit {
                count += 1;
            }
            Ok(count)
        })
    }

    /// Read the `0` / `10` / `11` code mapping to 0, 1 and 2.
    pub fn read_ternary_012(&mut self) -> Result<u8> {
        self.atomically(|reader| {
            if !reader.read_bit()? {
                return Ok(0);
            }
            Ok(1 + reader.read_bits(1)? as u8)
        })
    }

    /// Read an unsigned Exp-Golomb code, `ue(v)`.
    pub fn read_exp_golomb_unsigned(&mut self) -> Result<u64> {
        self.atomically(|reader| {
            let mut leading_zeros = 0u32;
            while !reader.read_bit()? {
                leading_zeros += 1;
                if leading_zeros > MAX_GOLOMB_LEADING_ZEROS {
                    reader.out_of_data = true;
                    return Err(Error::OutOfData {
                        requested: 2 * leading_zeros as usize + 1,
                        remaining: reader.remaining_bits(),
                    });
                }
            }

            let suffix = reader.read_bits(leading_zeros)?;
            golomb_value(leading_zeros, suffix).ok_or_else(|| {
                reader.out_of_data = true;
                Error::OutOfData {
                    requested: 2 * leading_zeros as usize + 1,
                    remaining: reader.remaining_bits(),
                }
            })
        })
    }

    /// Read a signed Exp-Golomb code, `se(v)`.
    pub fn read_exp_golomb_signed(&mut self) -> Result<i64> {
        self.read_exp_golomb_unsigned().map(golomb_to_signed)
    }

    /// Fill `buf` with the next `buf.len()` bytes.
    ///
    /// Byte-aligned readers copy straight out of the buffer, everything else
    /// falls back to one 8-bit read per byte.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = buf.len();

        if self.bits_valid == 8 {
            let available = self.data.len() - self.byte_pos;
            if available < n {
                self.out_of_data = true;
                return Err(Error::OutOfData {
                    requested: n * 8,
                    remaining: available * 8,
                });
            }

            buf.copy_from_slice(&self.data[self.byte_pos..self.byte_pos + n]);
            self.byte_pos += n;
            return Ok(());
        }

        self.ensure(n * 8)?;
        for byte in buf.iter_mut() {
            *byte = self.read_bits(8)? as u8;
        }

        Ok(())
    }

    /// Skip the rest of the current byte unless already aligned.
    pub fn align_to_byte(&mut self) {
        if self.bits_valid != 8 && self.bits_valid != 0 {
            self.byte_pos += 1;
            self.bits_valid = 8;
        }
    }

    /// Move the cursor to absolute bit offset `pos`.
    ///
    /// `pos` may equal the buffer length (end of data) but not exceed it.
    pub fn set_bit_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.len_bits() {
            let remaining = self.remaining_bits();
            self.out_of_data = true;
            return Err(Error::OutOfData {
                requested: pos.saturating_sub(self.bit_position()),
                remaining,
            });
        }

        self.byte_pos = pos / 8;
        self.bits_valid = 8 - pos % 8;

        Ok(())
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.set_bit_position(self.bit_position() + n)
    }

    pub fn skip_bit(&mut self) -> Result<()> {
        self.skip_bits(1)
    }

    /// Skip `to_skip` bits, then read `to_read` bits.
    pub fn skip_and_read_bits(&mut self, to_skip: usize, to_read: u32) -> Result<u64> {
        self.atomically(|reader| {
            reader.skip_bits(to_skip)?;
            reader.read_bits(to_read)
        })
    }

    pub(crate) fn position(&self) -> Position {
        Position {
            byte_pos: self.byte_pos,
            bits_valid: self.bits_valid,
        }
    }

    pub(crate) fn restore(&mut self, position: Position) {
        self.byte_pos = position.byte_pos;
        self.bits_valid = position.bits_valid;
    }

    /// Run `f`, rewinding the cursor if it fails.
    pub(crate) fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let start = self.position();
        let result = f(self);
        if result.is_err() {
            self.restore(start);
        }
        result
    }

    fn ensure(&mut self, requested: usize) -> Result<()> {
        let remaining = self.remaining_bits();
        if requested > remaining {
            self.out_of_data = true;
            return Err(Error::OutOfData {
                requested,
                remaining,
            });
        }
        Ok(())
    }

    /// Pull `n` bits starting at `position`, advancing it. Callers check bounds.
    fn extract(&self, position: &mut Position, mut n: u32) -> u64 {
        let mut value = 0u64;

        while n > 0 {
            let byte = self.data[position.byte_pos];
            let take = (n as usize).min(position.bits_valid);
            let shift = position.bits_valid - take;

            value <<= take;
            value |= ((byte >> shift) as u64) & (0xFF >> (8 - take));

            position.bits_valid -= take;
            if position.bits_valid == 0 {
                position.bits_valid = 8;
                position.byte_pos += 1;
            }

            n -= take as u32;
        }

        value
    }
}
