//! # mediamux-codec
//!
//! Codec header parsing and bit-exact rewriting on top of `mediamux-bits`.
//!
//! ## Features
//!
//! - HEVC/H.265 NAL unit framing: Annex B and length-prefixed layouts,
//!   emulation prevention in both directions
//! - SPS parsing: profile/tier/level, picture size, conformance window,
//!   bit depths, scaling lists, reference picture sets and VUI
//! - Colour description rewriting that copies every other bit unchanged
//!
//! ## Example
//!
//! ```no_run
//! use mediamux_codec::hevc::{parse_sps, rewrite_colour_description, ColourDescription};
//!
//! # fn sps_nal() -> Vec<u8> { Vec::new() }
//! let nal = sps_nal();
//! let sps = parse_sps(&nal).unwrap();
//! println!("{}x{}", sps.width, sps.height);
//!
//! let hdr = ColourDescription {
//!     colour_primaries: 9,
//!     transfer_characteristics: 16,
//!     matrix_coefficients: 9,
//! };
//! let rewritten = rewrite_colour_description(&nal, hdr).unwrap();
//! assert_eq!(parse_sps(&rewritten).unwrap().colour_description(), Some(hdr));
//! ```

pub mod error;
pub mod hevc;

pub use error::{Error, Result};
