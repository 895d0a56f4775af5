//! Mediamux - Matroska mux core
//!
//! This library crate ties the workspace crates together:
//!
//! - [`bits`]: bit-exact reading and rewriting of codec headers
//! - [`codec`]: HEVC NAL framing, SPS parsing and colour rewriting
//! - [`packet`]: packets, timestamp factories, cluster ordering and statistics
//! - [`config`]: TOML configuration of the mux pipeline
//! - [`Muxer`]: packets in, ordered and timed packets plus statistics out

pub mod config;
pub mod logging;
pub mod muxer;

pub use mediamux_bits as bits;
pub use mediamux_codec as codec;
pub use mediamux_common as common;
pub use mediamux_packet as packet;

pub use muxer::{build_cluster_stage, build_timestamp_factories, Muxer};
