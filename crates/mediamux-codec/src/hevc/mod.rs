//! HEVC (H.265) header handling
//!
//! This module splits HEVC byte streams into NAL units and works on the
//! Sequence Parameter Set:
//! - parsing picture size, bit depth and VUI colour/timing information
//! - rewriting the VUI colour description in place
//!
//! The primary use is fixing up colour signalling in codec private data
//! before it is written to the output.

mod nal;
mod sps;

pub use nal::{
    add_emulation_prevention, extract_length_prefixed, extract_nal_units,
    extract_nal_units_with_framing, remove_emulation_prevention, Framing, NalUnit, NalUnitType,
    NAL_HEADER_LEN,
};
pub use sps::{
    parse_sps, rewrite_colour_description, ColourDescription, ConformanceWindow, Sps, TimingInfo,
    Vui,
};

use crate::error::Result;

/// Find and parse the first SPS in a byte stream.
///
/// Returns `None` when the stream holds no SPS at all.
pub fn find_sps(data: &[u8]) -> Option<Result<Sps>> {
    extract_nal_units(data)
        .into_iter()
        .find(|unit| unit.nal_type == NalUnitType::Sps)
        .map(|unit| parse_sps(unit.data))
}

/// Rewrite the colour description of every SPS in a stream.
///
/// The output keeps the framing of the input. Returns the new stream and the
/// number of SPS NAL units rewritten.
pub fn rewrite_stream_colour(
    data: &[u8],
    colour: ColourDescription,
) -> Result<(Vec<u8>, usize)> {
    let (framing, units) = extract_nal_units_with_framing(data);

    let mut stream = Vec::with_capacity(data.len() + 64);
    let mut rewritten = 0;
    for unit in &units {
        if unit.nal_type == NalUnitType::Sps {
            let sps = rewrite_colour_description(unit.data, colour)?;
            framing.write_unit(&mut stream, &sps)?;
            rewritten += 1;
        } else {
            framing.write_unit(&mut stream, unit.data)?;
        }
    }

    Ok((stream, rewritten))
}
