//! HEVC NAL unit framing

use crate::error::{Error, Result};

/// Size of the HEVC NAL unit header in bytes
pub const NAL_HEADER_LEN: usize = 2;

/// HEVC NAL unit types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Coded slice of a non-IRAP picture (types 0-9)
    Slice(u8),
    /// Coded slice of a BLA picture (types 16-18)
    Bla(u8),
    /// Coded slice of an IDR picture (types 19-20)
    Idr(u8),
    /// Coded slice of a CRA picture
    Cra,
    /// Video Parameter Set
    Vps,
    /// Sequence Parameter Set
    Sps,
    /// Picture Parameter Set
    Pps,
    /// Access Unit Delimiter
    Aud,
    /// End of Sequence
    EndOfSequence,
    /// End of Bitstream
    EndOfBitstream,
    /// Filler Data
    Filler,
    /// SEI Prefix
    PrefixSei,
    /// SEI Suffix
    SuffixSei,
    /// Reserved or unspecified
    Other(u8),
}

impl From<u8> for NalUnitType {
    fn from(value: u8) -> Self {
        match value {
            0..=9 => Self::Slice(value),
            16..=18 => Self::Bla(value),
            19 | 20 => Self::Idr(value),
            21 => Self::Cra,
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            35 => Self::Aud,
            36 => Self::EndOfSequence,
            37 => Self::EndOfBitstream,
            38 => Self::Filler,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            other => Self::Other(other),
        }
    }
}

impl NalUnitType {
    /// Whether pictures of this type are random access points.
    pub fn is_irap(self) -> bool {
        matches!(self, Self::Bla(_) | Self::Idr(_) | Self::Cra)
    }

    /// Whether this is a parameter set (VPS, SPS or PPS).
    pub fn is_parameter_set(self) -> bool {
        matches!(self, Self::Vps | Self::Sps | Self::Pps)
    }
}

/// A NAL unit borrowed from a larger buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnit<'a> {
    pub nal_type: NalUnitType,
    pub layer_id: u8,
    pub temporal_id_plus1: u8,
    /// Header and payload, emulation prevention still in place
    pub data: &'a [u8],
}

impl<'a> NalUnit<'a> {
    /// Parse the two-byte header of `data`.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let [first, second, ..] = *data else {
            return Err(Error::TooShort(data.len()));
        };

        if first & 0x80 != 0 {
            return Err(Error::Invalid("forbidden_zero_bit is set".into()));
        }

        Ok(Self {
            nal_type: NalUnitType::from((first >> 1) & 0x3F),
            layer_id: ((first & 0x01) << 5) | (second >> 3),
            temporal_id_plus1: second & 0x07,
            data,
        })
    }

    /// Bytes after the NAL unit header
    pub fn payload(&self) -> &'a [u8] {
        &self.data[NAL_HEADER_LEN..]
    }
}

/// How NAL units are delimited in a byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Start codes (`00 00 01`, written as `00 00 00 01`)
    AnnexB,
    /// Big-endian 4-byte length in front of every unit
    LengthPrefixed,
}

impl Framing {
    /// Append `unit` to `out` in this framing.
    pub fn write_unit(self, out: &mut Vec<u8>, unit: &[u8]) -> Result<()> {
        match self {
            Framing::AnnexB => out.extend_from_slice(&[0, 0, 0, 1]),
            Framing::LengthPrefixed => {
                let length = u32::try_from(unit.len()).map_err(|_| {
                    Error::Invalid(format!(
                        "NAL unit of {} bytes does not fit a 4-byte length",
                        unit.len()
                    ))
                })?;
                out.extend_from_slice(&length.to_be_bytes());
            }
        }
        out.extend_from_slice(unit);
        Ok(())
    }
}

/// Split a byte stream into NAL units.
///
/// Annex B start codes are tried first; without any, the data is read as
/// 4-byte length-prefixed units. Units with a broken header are skipped.
pub fn extract_nal_units(data: &[u8]) -> Vec<NalUnit<'_>> {
    extract_nal_units_with_framing(data).1
}

/// Like [`extract_nal_units`], also reporting which framing was found.
pub fn extract_nal_units_with_framing(data: &[u8]) -> (Framing, Vec<NalUnit<'_>>) {
    let units = split_annex_b(data);
    if !units.is_empty() {
        return (Framing::AnnexB, units);
    }

    (Framing::LengthPrefixed, extract_length_prefixed(data, 4))
}

/// Split length-prefixed units (`hvcC` / Matroska block layout).
///
/// Stops at the first length that runs past the end of `data`.
pub fn extract_length_prefixed(data: &[u8], length_size: usize) -> Vec<NalUnit<'_>> {
    let mut units = Vec::new();
    if !(1..=4).contains(&length_size) {
        return units;
    }

    let mut rest = data;
    while rest.len() >= length_size {
        let (prefix, tail) = rest.split_at(length_size);
        let length = prefix
            .iter()
            .fold(0usize, |length, &byte| (length << 8) | byte as usize);
        if length == 0 || length > tail.len() {
            break;
        }

        let (unit, tail) = tail.split_at(length);
        if let Ok(unit) = NalUnit::parse(unit) {
            units.push(unit);
        }
        rest = tail;
    }

    units
}

fn split_annex_b(data: &[u8]) -> Vec<NalUnit<'_>> {
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i..i + 3] == [0, 0, 1] {
            starts.push(i);
            i += 3;
        } else {
            i += 1;
        }
    }

    starts
        .iter()
        .enumerate()
        .filter_map(|(index, &start)| {
            let end = starts.get(index + 1).copied().unwrap_or(data.len());
            let mut unit = &data[start + 3..end];
            // trailing_zero_8bits and the leading zero of a 4-byte start code
            while let [rest @ .., 0] = unit {
                unit = rest;
            }
            NalUnit::parse(unit).ok()
        })
        .collect()
}

/// Strip emulation prevention bytes, turning a NAL unit into its RBSP.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut zeros = 0;

    for &byte in data {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }

        zeros = if byte == 0 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }

    rbsp
}

/// Insert emulation prevention bytes so no start code can appear in `rbsp`.
pub fn add_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 1);
    let mut zeros = 0;

    for &byte in rbsp {
        if zeros >= 2 && byte <= 0x03 {
            data.push(0x03);
            zeros = 0;
        }

        zeros = if byte == 0 { zeros + 1 } else { 0 };
        data.push(byte);
    }

    if zeros > 0 {
        data.push(0x03);
    }

    data
}
