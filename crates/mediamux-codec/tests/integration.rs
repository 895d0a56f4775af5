//! Integration tests for mediamux-codec

use mediamux_codec::hevc::{
    extract_length_prefixed, extract_nal_units, extract_nal_units_with_framing, find_sps,
    parse_sps, rewrite_colour_description, rewrite_stream_colour, ColourDescription, Framing,
    NalUnitType,
};
use mediamux_codec::Error;

/// 1920x1088 Main level 4 SPS, cropped to 1080 lines, BT.709
const SPS: &[u8] = &[
    0x42, 0x01, 0x01, 0x01, 0x60, 0x00, 0x00, 0x03, 0x00, 0x90, 0x00, 0x00,
    0x03, 0x00, 0x00, 0x03, 0x00, 0x78, 0xa0, 0x03, 0xc0, 0x80, 0x11, 0x07,
    0xcb, 0x96, 0x57, 0x92, 0x4f, 0xa6, 0x9a, 0x69, 0xa6, 0x9a, 0x69, 0xaa,
    0xaa, 0xab, 0x08, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xaa,
    0xab, 0x88, 0xfa, 0xda, 0x6b, 0x68, 0x17, 0xff, 0xe0, 0x00, 0x20, 0x00,
    0x2d, 0x40, 0x40, 0x40, 0x41, 0x00, 0x00, 0x03, 0x03, 0xe9, 0x00, 0x00,
    0x5d, 0xc0, 0x08,
];

const VPS: &[u8] = &[0x40, 0x01, 0x0c, 0x01, 0xff, 0xff];
const PPS: &[u8] = &[0x44, 0x01, 0xc1, 0x72, 0xb4, 0x62, 0x40];

const HLG: ColourDescription = ColourDescription {
    colour_primaries: 9,
    transfer_characteristics: 18,
    matrix_coefficients: 9,
};

fn annex_b(units: &[&[u8]]) -> Vec<u8> {
    let mut stream = Vec::new();
    for unit in units {
        stream.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        stream.extend_from_slice(unit);
    }
    stream
}

fn length_prefixed(units: &[&[u8]]) -> Vec<u8> {
    let mut block = Vec::new();
    for unit in units {
        block.extend_from_slice(&(unit.len() as u32).to_be_bytes());
        block.extend_from_slice(unit);
    }
    block
}

/// Test finding the SPS in an Annex B parameter set stream
#[test]
fn test_find_sps_in_annex_b() {
    let stream = annex_b(&[VPS, SPS, PPS]);

    let units = extract_nal_units(&stream);
    assert_eq!(units.len(), 3);
    assert_eq!(units[1].nal_type, NalUnitType::Sps);
    assert_eq!(units[1].data, SPS);

    let sps = find_sps(&stream).unwrap().unwrap();
    assert_eq!(sps.display_size(), (1920, 1080));
    assert_eq!(sps.level_idc, 120);
}

/// Test the same units in length-prefixed layout
#[test]
fn test_find_sps_length_prefixed() {
    let block = length_prefixed(&[VPS, SPS, PPS]);

    let units = extract_length_prefixed(&block, 4);
    let types: Vec<_> = units.iter().map(|unit| unit.nal_type).collect();
    assert_eq!(
        types,
        vec![NalUnitType::Vps, NalUnitType::Sps, NalUnitType::Pps]
    );

    let sps = find_sps(&block).unwrap().unwrap();
    assert_eq!(sps.width, 1920);
}

/// Test that a stream without an SPS yields nothing
#[test]
fn test_find_sps_missing() {
    let stream = annex_b(&[VPS, PPS]);
    assert!(find_sps(&stream).is_none());
}

/// Test rewriting colour signalling inside a parameter set stream
#[test]
fn test_rewrite_sps_in_stream() {
    let stream = annex_b(&[VPS, SPS, PPS]);
    let units = extract_nal_units(&stream);

    let rebuilt: Vec<Vec<u8>> = units
        .iter()
        .map(|unit| match unit.nal_type {
            NalUnitType::Sps => rewrite_colour_description(unit.data, HLG).unwrap(),
            _ => unit.data.to_vec(),
        })
        .collect();
    let refs: Vec<&[u8]> = rebuilt.iter().map(Vec::as_slice).collect();
    let stream = annex_b(&refs);

    let original = parse_sps(SPS).unwrap();
    let sps = find_sps(&stream).unwrap().unwrap();
    assert_eq!(sps.colour_description(), Some(HLG));
    assert_eq!(sps.display_size(), original.display_size());
    assert_eq!(sps.vui.unwrap().timing, original.vui.unwrap().timing);

    assert_eq!(rebuilt[0], VPS);
    assert_eq!(rebuilt[2], PPS);
    assert_eq!(rebuilt[1].len(), SPS.len());
}

/// Test that a whole-stream rewrite keeps Annex B framing
#[test]
fn test_rewrite_stream_keeps_annex_b() {
    let stream = annex_b(&[VPS, SPS, PPS]);

    let (rewritten, count) = rewrite_stream_colour(&stream, HLG).unwrap();
    assert_eq!(count, 1);

    let (framing, units) = extract_nal_units_with_framing(&rewritten);
    assert_eq!(framing, Framing::AnnexB);
    assert_eq!(units.len(), 3);
    assert_eq!(find_sps(&rewritten).unwrap().unwrap().colour_description(), Some(HLG));
}

/// Test that a whole-stream rewrite keeps length-prefixed framing
#[test]
fn test_rewrite_stream_keeps_length_prefixes() {
    let block = length_prefixed(&[VPS, SPS, PPS]);

    let (rewritten, count) = rewrite_stream_colour(&block, HLG).unwrap();
    assert_eq!(count, 1);

    let (framing, units) = extract_nal_units_with_framing(&rewritten);
    assert_eq!(framing, Framing::LengthPrefixed);
    assert_eq!(units[0].data, VPS);
    assert_eq!(units[1].nal_type, NalUnitType::Sps);
    assert_eq!(units[2].data, PPS);
    assert_eq!(parse_sps(units[1].data).unwrap().colour_description(), Some(HLG));

    // nothing to rewrite
    let (_, count) = rewrite_stream_colour(&length_prefixed(&[VPS, PPS]), HLG).unwrap();
    assert_eq!(count, 0);
}

/// Test that every truncation of the SPS fails cleanly
#[test]
fn test_every_truncation_fails() {
    for len in 0..SPS.len() - 1 {
        let result = parse_sps(&SPS[..len]);
        let error = result.expect_err("truncated SPS must not parse");
        assert!(
            error.is_truncated() || matches!(error, Error::Invalid(_)),
            "length {len}: {error}"
        );
    }
}
