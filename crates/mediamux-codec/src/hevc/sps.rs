//! HEVC Sequence Parameter Set (SPS) parsing and colour rewriting
//!
//! Parsing and rewriting share one walk over the SPS syntax. The walk is
//! driven either by a plain reader or by a reader/writer pair that copies
//! every element it visits, so a rewrite reproduces the original encoding
//! bit for bit apart from the fields it replaces.

use mediamux_bits::{BitReader, BitWriter};
use tracing::debug;

use super::nal::{
    add_emulation_prevention, remove_emulation_prevention, NalUnit, NalUnitType, NAL_HEADER_LEN,
};
use crate::error::{Error, Result};

const EXTENDED_SAR: u8 = 255;
const MAX_SHORT_TERM_REF_PIC_SETS: u64 = 64;
const MAX_LONG_TERM_REF_PICS: u64 = 32;
const MAX_DPB_SIZE: u64 = 16;

/// Sequence Parameter Set
///
/// Covers everything up to and including the VUI timing information.
#[derive(Debug, Clone, PartialEq)]
pub struct Sps {
    pub profile_idc: u8,
    pub tier_flag: bool,
    pub level_idc: u8,
    /// 0 monochrome, 1 4:2:0, 2 4:2:2, 3 4:4:4
    pub chroma_format_idc: u8,
    /// Coded picture width in luma samples
    pub width: u32,
    /// Coded picture height in luma samples
    pub height: u32,
    pub conformance_window: Option<ConformanceWindow>,
    pub bit_depth_luma: u8,
    pub bit_depth_chroma: u8,
    pub log2_max_pic_order_cnt_lsb: u8,
    pub num_short_term_ref_pic_sets: u8,
    pub num_long_term_ref_pics: u8,
    /// Video Usability Information
    pub vui: Option<Vui>,
}

impl Sps {
    /// Picture size after applying the conformance window.
    ///
    /// A window larger than the coded picture crops it down to zero.
    pub fn display_size(&self) -> (u32, u32) {
        let Some(window) = self.conformance_window else {
            return (self.width, self.height);
        };

        let (sub_width, sub_height) = match self.chroma_format_idc {
            1 => (2u64, 2u64),
            2 => (2, 1),
            _ => (1, 1),
        };
        let crop_x = sub_width * (u64::from(window.left) + u64::from(window.right));
        let crop_y = sub_height * (u64::from(window.top) + u64::from(window.bottom));

        (
            cropped(self.width, crop_x),
            cropped(self.height, crop_y),
        )
    }

    /// Colour description from the VUI, if present
    pub fn colour_description(&self) -> Option<ColourDescription> {
        self.vui.as_ref().and_then(|vui| vui.colour)
    }
}

fn cropped(size: u32, crop: u64) -> u32 {
    // the result is at most `size`, so it fits back into a u32
    u64::from(size).saturating_sub(crop) as u32
}

/// Cropping offsets in chroma sample units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConformanceWindow {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Video Usability Information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vui {
    pub aspect_ratio_idc: Option<u8>,
    /// Explicit sample aspect ratio for `aspect_ratio_idc == 255`
    pub sample_aspect_ratio: Option<(u16, u16)>,
    pub video_format: Option<u8>,
    /// Video is full range (0-255) vs limited range (16-235)
    pub video_full_range: bool,
    pub colour: Option<ColourDescription>,
    pub timing: Option<TimingInfo>,
}

/// Colour signalling (ITU-T H.273 code points)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColourDescription {
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
}

impl TimingInfo {
    /// Pictures per second, `None` when the tick is zero.
    pub fn frame_rate(&self) -> Option<f64> {
        (self.num_units_in_tick > 0)
            .then(|| f64::from(self.time_scale) / f64::from(self.num_units_in_tick))
    }
}

/// Parse an SPS NAL unit (header included, emulation prevention in place).
pub fn parse_sps(nal: &[u8]) -> Result<Sps> {
    let rbsp = sps_rbsp(nal)?;
    let mut walk = Parse {
        reader: BitReader::new(&rbsp[NAL_HEADER_LEN..]),
    };
    walk_sps(&mut walk)
}

/// Replace the VUI colour description of an SPS NAL unit.
///
/// All other bits are copied unchanged. Returns the new NAL unit with
/// emulation prevention re-applied.
pub fn rewrite_colour_description(nal: &[u8], colour: ColourDescription) -> Result<Vec<u8>> {
    let rbsp = sps_rbsp(nal)?;
    let mut output = rbsp.clone();

    let mut walk = Rewrite {
        reader: BitReader::new(&rbsp[NAL_HEADER_LEN..]),
        writer: BitWriter::new(&mut output[NAL_HEADER_LEN..]),
        colour,
    };
    let sps = walk_sps(&mut walk)?;
    let original = sps.colour_description().ok_or(Error::NoColourDescription)?;
    walk.writer.copy_remaining(&mut walk.reader)?;

    debug!(?original, replacement = ?colour, "rewrote SPS colour description");

    Ok(add_emulation_prevention(&output))
}

fn sps_rbsp(nal: &[u8]) -> Result<Vec<u8>> {
    let unit = NalUnit::parse(nal)?;
    if unit.nal_type != NalUnitType::Sps {
        return Err(Error::Unsupported(format!(
            "expected an SPS NAL unit, got {:?}",
            unit.nal_type
        )));
    }
    if unit.layer_id != 0 {
        return Err(Error::Unsupported(format!(
            "SPS for layer {}",
            unit.layer_id
        )));
    }

    let rbsp = remove_emulation_prevention(nal);
    if rbsp.len() <= NAL_HEADER_LEN {
        return Err(Error::TooShort(nal.len()));
    }

    Ok(rbsp)
}

/// Source of SPS syntax elements.
trait SyntaxWalk {
    fn bits(&mut self, n: u32) -> Result<u64>;
    fn ue(&mut self) -> Result<u64>;
    fn se(&mut self) -> Result<i64>;
    fn colour_description(&mut self) -> Result<ColourDescription>;

    fn flag(&mut self) -> Result<bool> {
        Ok(self.bits(1)? == 1)
    }

    fn ue_max(&mut self, max: u64, name: &str) -> Result<u64> {
        let value = self.ue()?;
        if value > max {
            return Err(Error::Invalid(format!("{name} = {value}, at most {max}")));
        }
        Ok(value)
    }
}

struct Parse<'a> {
    reader: BitReader<'a>,
}

impl SyntaxWalk for Parse<'_> {
    fn bits(&mut self, n: u32) -> Result<u64> {
        Ok(self.reader.read_bits(n)?)
    }

    fn ue(&mut self) -> Result<u64> {
        Ok(self.reader.read_exp_golomb_unsigned()?)
    }

    fn se(&mut self) -> Result<i64> {
        Ok(self.reader.read_exp_golomb_signed()?)
    }

    fn colour_description(&mut self) -> Result<ColourDescription> {
        Ok(ColourDescription {
            colour_primaries: self.bits(8)? as u8,
            transfer_characteristics: self.bits(8)? as u8,
            matrix_coefficients: self.bits(8)? as u8,
        })
    }
}

struct Rewrite<'r, 'w> {
    reader: BitReader<'r>,
    writer: BitWriter<'w>,
    colour: ColourDescription,
}

impl SyntaxWalk for Rewrite<'_, '_> {
    fn bits(&mut self, n: u32) -> Result<u64> {
        Ok(self.writer.copy_bits(n, &mut self.reader)?)
    }

    fn ue(&mut self) -> Result<u64> {
        Ok(self.writer.copy_exp_golomb_unsigned(&mut self.reader)?)
    }

    fn se(&mut self) -> Result<i64> {
        Ok(self.writer.copy_exp_golomb_signed(&mut self.reader)?)
    }

    fn colour_description(&mut self) -> Result<ColourDescription> {
        let original = ColourDescription {
            colour_primaries: self.reader.read_bits(8)? as u8,
            transfer_characteristics: self.reader.read_bits(8)? as u8,
            matrix_coefficients: self.reader.read_bits(8)? as u8,
        };

        let colour = self.colour;
        for value in [
            colour.colour_primaries,
            colour.transfer_characteristics,
            colour.matrix_coefficients,
        ] {
            self.writer.write_bits(8, u64::from(value))?;
        }

        Ok(original)
    }
}

fn walk_sps<W: SyntaxWalk>(w: &mut W) -> Result<Sps> {
    // sps_video_parameter_set_id
    w.bits(4)?;
    let max_sub_layers_minus1 = w.bits(3)? as usize;
    // sps_temporal_id_nesting_flag
    w.flag()?;

    let (profile_idc, tier_flag, level_idc) = profile_tier_level(w, max_sub_layers_minus1)?;

    w.ue_max(15, "sps_seq_parameter_set_id")?;
    let chroma_format_idc = w.ue_max(3, "chroma_format_idc")? as u8;
    if chroma_format_idc == 3 {
        // separate_colour_plane_flag
        w.flag()?;
    }

    let width = w.ue_max(u64::from(u32::MAX), "pic_width_in_luma_samples")? as u32;
    let height = w.ue_max(u64::from(u32::MAX), "pic_height_in_luma_samples")? as u32;

    let conformance_window = if w.flag()? {
        Some(ConformanceWindow {
            left: w.ue_max(u64::from(u32::MAX), "conf_win_left_offset")? as u32,
            right: w.ue_max(u64::from(u32::MAX), "conf_win_right_offset")? as u32,
            top: w.ue_max(u64::from(u32::MAX), "conf_win_top_offset")? as u32,
            bottom: w.ue_max(u64::from(u32::MAX), "conf_win_bottom_offset")? as u32,
        })
    } else {
        None
    };

    let bit_depth_luma = w.ue_max(8, "bit_depth_luma_minus8")? as u8 + 8;
    let bit_depth_chroma = w.ue_max(8, "bit_depth_chroma_minus8")? as u8 + 8;
    let log2_max_pic_order_cnt_lsb = w.ue_max(12, "log2_max_pic_order_cnt_lsb_minus4")? as u8 + 4;

    let sub_layer_ordering_info_present = w.flag()?;
    let first = if sub_layer_ordering_info_present {
        0
    } else {
        max_sub_layers_minus1
    };
    for _ in first..=max_sub_layers_minus1 {
        w.ue_max(MAX_DPB_SIZE, "sps_max_dec_pic_buffering_minus1")?;
        w.ue_max(MAX_DPB_SIZE, "sps_max_num_reorder_pics")?;
        // sps_max_latency_increase_plus1
        w.ue()?;
    }

    // log2_min_luma_coding_block_size_minus3 through
    // max_transform_hierarchy_depth_intra
    for _ in 0..6 {
        w.ue()?;
    }

    // scaling_list_enabled_flag, sps_scaling_list_data_present_flag
    if w.flag()? && w.flag()? {
        scaling_list_data(w)?;
    }

    // amp_enabled_flag
    w.flag()?;
    // sample_adaptive_offset_enabled_flag
    w.flag()?;

    // pcm_enabled_flag
    if w.flag()? {
        // pcm_sample_bit_depth_luma_minus1, pcm_sample_bit_depth_chroma_minus1
        w.bits(8)?;
        // log2_min_pcm_luma_coding_block_size_minus3
        w.ue()?;
        // log2_diff_max_min_pcm_luma_coding_block_size
        w.ue()?;
        // pcm_loop_filter_disabled_flag
        w.flag()?;
    }

    let num_short_term_ref_pic_sets =
        w.ue_max(MAX_SHORT_TERM_REF_PIC_SETS, "num_short_term_ref_pic_sets")? as usize;
    short_term_ref_pic_sets(w, num_short_term_ref_pic_sets)?;

    let mut num_long_term_ref_pics = 0;
    // long_term_ref_pics_present_flag
    if w.flag()? {
        num_long_term_ref_pics = w.ue_max(MAX_LONG_TERM_REF_PICS, "num_long_term_ref_pics_sps")?;
        for _ in 0..num_long_term_ref_pics {
            // lt_ref_pic_poc_lsb_sps
            w.bits(u32::from(log2_max_pic_order_cnt_lsb))?;
            // used_by_curr_pic_lt_sps_flag
            w.flag()?;
        }
    }

    // sps_temporal_mvp_enabled_flag
    w.flag()?;
    // strong_intra_smoothing_enabled_flag
    w.flag()?;

    let vui = if w.flag()? { Some(vui(w)?) } else { None };

    Ok(Sps {
        profile_idc,
        tier_flag,
        level_idc,
        chroma_format_idc,
        width,
        height,
        conformance_window,
        bit_depth_luma,
        bit_depth_chroma,
        log2_max_pic_order_cnt_lsb,
        num_short_term_ref_pic_sets: num_short_term_ref_pic_sets as u8,
        num_long_term_ref_pics: num_long_term_ref_pics as u8,
        vui,
    })
}

/// Returns general profile_idc, tier_flag and level_idc.
fn profile_tier_level<W: SyntaxWalk>(
    w: &mut W,
    max_sub_layers_minus1: usize,
) -> Result<(u8, bool, u8)> {
    // general_profile_space
    w.bits(2)?;
    let tier_flag = w.flag()?;
    let profile_idc = w.bits(5)? as u8;
    // general_profile_compatibility_flag[32]
    w.bits(32)?;
    // progressive, interlaced, non_packed and frame_only flags, then the
    // 43 reserved/constraint bits and general_inbld_flag
    w.bits(48)?;
    let level_idc = w.bits(8)? as u8;

    let mut sub_layers = Vec::with_capacity(max_sub_layers_minus1);
    for _ in 0..max_sub_layers_minus1 {
        let profile_present = w.flag()?;
        let level_present = w.flag()?;
        sub_layers.push((profile_present, level_present));
    }

    if max_sub_layers_minus1 > 0 {
        for _ in max_sub_layers_minus1..8 {
            // reserved_zero_2bits
            w.bits(2)?;
        }
    }

    for (profile_present, level_present) in sub_layers {
        if profile_present {
            // profile space, tier, idc and compatibility flags
            w.bits(40)?;
            // source flags and constraint bits
            w.bits(48)?;
        }
        if level_present {
            // sub_layer_level_idc
            w.bits(8)?;
        }
    }

    Ok((profile_idc, tier_flag, level_idc))
}

fn scaling_list_data<W: SyntaxWalk>(w: &mut W) -> Result<()> {
    for size_id in 0..4u32 {
        let step = if size_id == 3 { 3 } else { 1 };
        for _matrix_id in (0..6).step_by(step) {
            // scaling_list_pred_mode_flag
            if !w.flag()? {
                // scaling_list_pred_matrix_id_delta
                w.ue_max(5, "scaling_list_pred_matrix_id_delta")?;
                continue;
            }

            let coefficients = 64.min(1 << (4 + (size_id << 1)));
            if size_id > 1 {
                // scaling_list_dc_coef_minus8
                w.se()?;
            }
            for _ in 0..coefficients {
                // scaling_list_delta_coef
                w.se()?;
            }
        }
    }

    Ok(())
}

fn short_term_ref_pic_sets<W: SyntaxWalk>(w: &mut W, count: usize) -> Result<()> {
    // NumDeltaPocs of every set parsed so far
    let mut num_delta_pocs: Vec<usize> = Vec::with_capacity(count);

    for index in 0..count {
        // inter_ref_pic_set_prediction_flag
        let predicted = index > 0 && w.flag()?;

        let delta_pocs = if predicted {
            // delta_idx_minus1 only appears in slice headers, so the
            // reference is always the previous set here
            let reference = num_delta_pocs[index - 1];
            // delta_rps_sign
            w.flag()?;
            w.ue_max(1 << 15, "abs_delta_rps_minus1")?;

            let mut delta_pocs = 0;
            for _ in 0..=reference {
                // used_by_curr_pic_flag, use_delta_flag
                let used = w.flag()?;
                if used || w.flag()? {
                    delta_pocs += 1;
                }
            }
            delta_pocs
        } else {
            let negative = w.ue_max(MAX_DPB_SIZE, "num_negative_pics")?;
            let positive = w.ue_max(MAX_DPB_SIZE, "num_positive_pics")?;
            for _ in 0..negative + positive {
                // delta_poc_minus1
                w.ue()?;
                // used_by_curr_pic_flag
                w.flag()?;
            }
            (negative + positive) as usize
        };

        num_delta_pocs.push(delta_pocs);
    }

    Ok(())
}

fn vui<W: SyntaxWalk>(w: &mut W) -> Result<Vui> {
    let mut vui = Vui::default();

    // aspect_ratio_info_present_flag
    if w.flag()? {
        let idc = w.bits(8)? as u8;
        vui.aspect_ratio_idc = Some(idc);
        if idc == EXTENDED_SAR {
            let sar_width = w.bits(16)? as u16;
            let sar_height = w.bits(16)? as u16;
            vui.sample_aspect_ratio = Some((sar_width, sar_height));
        }
    }

    // overscan_info_present_flag
    if w.flag()? {
        // overscan_appropriate_flag
        w.flag()?;
    }

    // video_signal_type_present_flag
    if w.flag()? {
        vui.video_format = Some(w.bits(3)? as u8);
        vui.video_full_range = w.flag()?;
        // colour_description_present_flag
        if w.flag()? {
            vui.colour = Some(w.colour_description()?);
        }
    }

    // chroma_loc_info_present_flag
    if w.flag()? {
        w.ue()?;
        w.ue()?;
    }

    // neutral_chroma_indication_flag, field_seq_flag,
    // frame_field_info_present_flag
    w.bits(3)?;

    // default_display_window_flag
    if w.flag()? {
        for _ in 0..4 {
            w.ue()?;
        }
    }

    // vui_timing_info_present_flag
    if w.flag()? {
        let num_units_in_tick = w.bits(32)? as u32;
        let time_scale = w.bits(32)? as u32;
        // vui_poc_proportional_to_timing_flag
        if w.flag()? {
            w.ue()?;
        }
        vui.timing = Some(TimingInfo {
            num_units_in_tick,
            time_scale,
        });
    }

    Ok(vui)
}
