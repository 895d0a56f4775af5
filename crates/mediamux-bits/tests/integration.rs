//! Integration tests for mediamux-bits
//!
//! `bitstream-io` serves as an independent reference implementation for the
//! MSB-first bit layout and the Exp-Golomb code.

use bitstream_io::{BigEndian, BitRead, BitWrite};
use mediamux_bits::{BitReader, BitWriter, Error};

/// Deterministic xorshift so the test data is stable across runs
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

fn mask(n: u32) -> u64 {
    if n == 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Encode `value` as ue(v) with bitstream-io
fn reference_golomb(values: &[u64]) -> Vec<u8> {
    let mut writer = bitstream_io::BitWriter::endian(Vec::new(), BigEndian);
    for &value in values {
        let coded = u128::from(value) + 1;
        let leading_zeros = 127 - coded.leading_zeros();
        for _ in 0..leading_zeros {
            writer.write_bit(false).unwrap();
        }
        writer.write_bit(true).unwrap();
        if leading_zeros > 0 {
            let suffix = (coded - (1u128 << leading_zeros)) as u64;
            writer.write(leading_zeros, suffix).unwrap();
        }
    }
    writer.byte_align().unwrap();
    writer.into_writer()
}

#[test]
fn test_write_then_read_every_width() {
    let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);

    for offset in [0usize, 1, 3, 7] {
        for n in 1..=64u32 {
            let value = rng.next();
            let mut buf = vec![0u8; 10];

            let mut writer = BitWriter::new(&mut buf);
            writer.skip_bits(offset).unwrap();
            writer.write_bits(n, value).unwrap();
            assert_eq!(writer.bit_position(), offset + n as usize);

            let mut reader = BitReader::new(&buf);
            reader.skip_bits(offset).unwrap();
            assert_eq!(
                reader.read_bits(n).unwrap(),
                value & mask(n),
                "width {n} at offset {offset}"
            );
        }
    }
}

#[test]
fn test_writer_matches_reference_layout() {
    let mut rng = XorShift(42);
    let fields: Vec<(u32, u64)> = (1..=64u32)
        .map(|n| (n, rng.next() & mask(n)))
        .collect();
    let total_bits: usize = fields.iter().map(|(n, _)| *n as usize).sum();

    let mut buf = vec![0u8; total_bits.div_ceil(8)];
    let mut writer = BitWriter::new(&mut buf);
    for &(n, value) in &fields {
        writer.write_bits(n, value).unwrap();
    }
    writer.align_to_byte();

    let mut reference = bitstream_io::BitReader::endian(std::io::Cursor::new(&buf), BigEndian);
    for &(n, value) in &fields {
        assert_eq!(reference.read::<u64>(n).unwrap(), value, "width {n}");
    }
}

#[test]
fn test_reader_decodes_reference_golomb() {
    let mut rng = XorShift(7);
    let mut values: Vec<u64> = (0..300).collect();
    values.extend((0..200).map(|_| rng.next() >> (rng.next() % 63 + 1)));

    let encoded = reference_golomb(&values);
    let mut reader = BitReader::new(&encoded);
    for &value in &values {
        assert_eq!(reader.read_exp_golomb_unsigned().unwrap(), value);
    }
    assert!(reader.remaining_bits() < 8);
}

#[test]
fn test_golomb_writer_matches_reference() {
    let values = [
        0u64,
        1,
        2,
        3,
        4,
        5,
        254,
        255,
        256,
        65_535,
        1 << 40,
        u64::MAX >> 2,
        u64::MAX - 1,
        u64::MAX,
    ];

    let expected = reference_golomb(&values);
    let mut buf = vec![0u8; expected.len()];
    let mut writer = BitWriter::new(&mut buf);
    for &value in &values {
        writer.write_exp_golomb_unsigned(value).unwrap();
    }
    writer.align_to_byte();

    assert_eq!(buf, expected);
}

#[test]
fn test_signed_golomb_round_trip() {
    let values = [
        0i64,
        1,
        -1,
        2,
        -2,
        17,
        -17,
        1 << 30,
        -(1 << 30),
        i64::MAX / 4,
        i64::MAX,
        i64::MIN + 1,
        i64::MIN,
    ];

    let mut buf = vec![0u8; 160];
    let mut writer = BitWriter::new(&mut buf);
    for &value in &values {
        writer.write_exp_golomb_signed(value).unwrap();
    }
    let written = writer.bit_position();

    let mut reader = BitReader::new(&buf);
    for &value in &values {
        assert_eq!(reader.read_exp_golomb_signed().unwrap(), value);
    }
    assert_eq!(reader.bit_position(), written);
}

#[test]
fn test_golomb_four_bit_pattern() {
    let data = [0b0010_1000];
    let mut reader = BitReader::new(&data);

    assert_eq!(reader.peek_bits(5).unwrap(), 0b00101);
    assert_eq!(reader.read_exp_golomb_unsigned().unwrap(), 4);
    assert_eq!(reader.bit_position(), 5);
}

#[test]
fn test_peek_then_read_agree() {
    let mut rng = XorShift(1234);
    let data: Vec<u8> = (0..32).map(|_| rng.next() as u8).collect();
    let mut reader = BitReader::new(&data);

    while reader.remaining_bits() > 0 {
        let n = ((rng.next() % 64) as u32 + 1).min(reader.remaining_bits() as u32);
        let before = reader.bit_position();
        let peeked = reader.peek_bits(n).unwrap();
        assert_eq!(reader.read_bits(n).unwrap(), peeked);
        assert_eq!(reader.bit_position(), before + n as usize);
    }
}

#[test]
fn test_reading_past_end_never_returns_partial_value() {
    let data = [0xFF, 0xFF, 0xFF];

    for start in 0..24usize {
        for n in (24 - start + 1) as u32..=64 {
            let mut reader = BitReader::new(&data);
            reader.set_bit_position(start).unwrap();

            match reader.read_bits(n) {
                Err(Error::OutOfData { requested, remaining }) => {
                    assert_eq!(requested, n as usize);
                    assert_eq!(remaining, 24 - start);
                }
                other => panic!("expected out of data, got {other:?}"),
            }
            assert_eq!(reader.bit_position(), start);
            assert!(reader.eof());
        }
    }
}

#[test]
fn test_rewrite_single_field_in_place() {
    // flag(1) ue(v) u(8) se(v) u(3)
    let mut src = [0u8; 4];
    let mut writer = BitWriter::new(&mut src);
    writer.write_bit(true).unwrap();
    writer.write_exp_golomb_unsigned(9).unwrap();
    writer.write_bits(8, 0x42).unwrap();
    writer.write_exp_golomb_signed(-3).unwrap();
    writer.write_bits(3, 0b101).unwrap();
    let used = writer.bit_position();

    let mut reader = BitReader::new(&src);
    let mut out = [0u8; 4];
    let mut rewriter = BitWriter::new(&mut out);
    assert!(rewriter.copy_bits(1, &mut reader).unwrap() == 1);
    assert_eq!(rewriter.copy_exp_golomb_unsigned(&mut reader).unwrap(), 9);
    reader.skip_bits(8).unwrap();
    rewriter.write_bits(8, 0x17).unwrap();
    assert_eq!(rewriter.copy_exp_golomb_signed(&mut reader).unwrap(), -3);
    rewriter.copy_remaining(&mut reader).unwrap();

    let mut check = BitReader::new(&out);
    assert!(check.read_bit().unwrap());
    assert_eq!(check.read_exp_golomb_unsigned().unwrap(), 9);
    assert_eq!(check.read_bits(8).unwrap(), 0x17);
    assert_eq!(check.read_exp_golomb_signed().unwrap(), -3);
    assert_eq!(check.read_bits(3).unwrap(), 0b101);
    assert_eq!(check.bit_position(), used);
}
