//! Sequential MSB-first bit writer.

use crate::error::{Error, Result};
use crate::reader::BitReader;
use crate::{golomb_to_signed, signed_to_golomb, MAX_FIELD_BITS};

/// Bit writer over a borrowed mutable byte slice.
///
/// Bits are set or cleared in place, so bits that are never written keep
/// whatever the buffer held before. The cursor is an absolute bit offset; the
/// mask for the current byte is derived from it.
#[derive(Debug)]
pub struct BitWriter<'a> {
    data: &'a mut [u8],
    position: usize,
    out_of_data: bool,
}

impl<'a> BitWriter<'a> {
    /// Create a writer positioned at the first bit of `data`.
    pub fn new(data: &'a mut [u8]) -> Self {
        let out_of_data = data.is_empty();
        Self {
            data,
            position: 0,
            out_of_data,
        }
    }

    /// Whether the writer has reached or tried to pass the end of its buffer.
    pub fn eof(&self) -> bool {
        self.out_of_data
    }

    pub fn len_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// Absolute bit offset from the start of the buffer.
    pub fn bit_position(&self) -> usize {
        self.position
    }

    pub fn remaining_bits(&self) -> usize {
        self.len_bits() - self.position
    }

    /// Write the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, n: u32, value: u64) -> Result<()> {
        debug_assert!(n <= MAX_FIELD_BITS, "cannot write {n} bits from a u64");

        self.ensure(n as usize)?;
        for shift in (0..n).rev() {
            self.write_bit((value >> shift) & 1 == 1)?;
        }

        Ok(())
    }

    /// Set or clear the bit under the cursor and advance.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        let byte_pos = self.position / 8;
        if byte_pos >= self.data.len() {
            self.out_of_data = true;
            return Err(Error::OutOfData {
                requested: 1,
                remaining: 0,
            });
        }

        let mask = 0x80u8 >> (self.position % 8);
        if bit {
            self.data[byte_pos] |= mask;
        } else {
            self.data[byte_pos] &= !mask;
        }

        self.position += 1;
        if self.position == self.len_bits() {
            self.out_of_data = true;
        }

        Ok(())
    }

    /// Read `n` bits from `reader`, write them unchanged and return them.
    pub fn copy_bits(&mut self, n: u32, reader: &mut BitReader<'_>) -> Result<u64> {
        self.ensure(n as usize)?;

        let value = reader.read_bits(n)?;
        self.write_bits(n, value)?;

        Ok(value)
    }

    /// Copy an unsigned Exp-Golomb code from `reader` bit for bit.
    ///
    /// Exp-Golomb codes are canonical, so writing the decoded value again
    /// reproduces the input encoding exactly. Returns the decoded value. On
    /// failure both cursors are rewound and the buffer is left untouched.
    pub fn copy_exp_golomb_unsigned(&mut self, reader: &mut BitReader<'_>) -> Result<u64> {
        let reader_start = reader.position();
        let start_bit = reader.bit_position();

        let value = reader.read_exp_golomb_unsigned()?;
        if let Err(err) = self.ensure(reader.bit_position() - start_bit) {
            reader.restore(reader_start);
            return Err(err);
        }

        self.write_exp_golomb_unsigned(value)?;
        Ok(value)
    }

    /// Signed counterpart of [`BitWriter::copy_exp_golomb_unsigned`].
    pub fn copy_exp_golomb_signed(&mut self, reader: &mut BitReader<'_>) -> Result<i64> {
        self.copy_exp_golomb_unsigned(reader).map(golomb_to_signed)
    }

    /// Copy everything `reader` has left.
    pub fn copy_remaining(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        let mut left = reader.remaining_bits();
        self.ensure(left)?;

        while left > 0 {
            let chunk = left.min(MAX_FIELD_BITS as usize) as u32;
            self.copy_bits(chunk, reader)?;
            left -= chunk as usize;
        }

        Ok(())
    }

    /// Encode `value` as an unsigned Exp-Golomb code.
    pub fn write_exp_golomb_unsigned(&mut self, value: u64) -> Result<()> {
        let coded = value as u128 + 1;
        let leading_zeros = 127 - coded.leading_zeros();

        self.ensure(2 * leading_zeros as usize + 1)?;
        self.write_bits(leading_zeros, 0)?;
        self.write_bit(true)?;
        self.write_bits(leading_zeros, (coded - (1u128 << leading_zeros)) as u64)
    }

    /// Encode `value` as a signed Exp-Golomb code.
    pub fn write_exp_golomb_signed(&mut self, value: i64) -> Result<()> {
        self.write_exp_golomb_unsigned(signed_to_golomb(value))
    }

    /// Pad the current byte with zero bits.
    pub fn align_to_byte(&mut self) {
        let used = self.position % 8;
        if used == 0 {
            return;
        }

        self.data[self.position / 8] &= 0xFFu8 << (8 - used);
        self.position += 8 - used;
        if self.position == self.len_bits() {
            self.out_of_data = true;
        }
    }

    /// Move the cursor to absolute bit offset `pos`.
    ///
    /// Positioning at or past the end of the buffer is a usage error and
    /// fails with [`Error::Seek`].
    pub fn set_bit_position(&mut self, pos: usize) -> Result<()> {
        let len_bits = self.len_bits();
        if pos >= len_bits {
            self.out_of_data = true;
            return Err(Error::Seek {
                position: pos,
                len_bits,
            });
        }

        self.position = pos;
        Ok(())
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.set_bit_position(self.position + n)
    }

    pub fn skip_bit(&mut self) -> Result<()> {
        self.skip_bits(1)
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
}
