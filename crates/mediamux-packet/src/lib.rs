//! # mediamux-packet
//!
//! The packet model of the mux pipeline and the stages that time and count
//! packets on their way into clusters.
//!
//! ## Features
//!
//! - [`Packet`]: payload, block additions and nanosecond timing with
//!   reference-frame links and one-shot timestamp normalization
//! - Extensions: multiple-timestamp lacing info, subtitle numbers and
//!   before-adding-to-cluster callbacks
//! - Timestamp factories: constant offsets and external "timestamp format
//!   v2" files
//! - [`ClusterStage`]: releases packets of all tracks in timestamp order and
//!   keeps per-track [`TrackStatistics`]
//!
//! ## Example
//!
//! ```
//! use mediamux_common::{Timestamp, TimestampScale, TrackId};
//! use mediamux_packet::{ClusterStage, ConstantOffset, Packet, TimestampFactory};
//!
//! let mut factory = ConstantOffset::new(Timestamp::from_ms(100));
//! let mut stage = ClusterStage::new(Vec::new());
//!
//! for frame in 0..3 {
//!     let mut packet = Packet::new(vec![0u8; 1_000])
//!         .with_track(TrackId(1))
//!         .with_timestamp(frame * 40_000_000)
//!         .with_duration(40_000_000);
//!     factory.assign(&mut packet);
//!     packet.normalize_timestamps(TimestampScale::default());
//!     stage.push(packet.into_shared());
//! }
//! stage.flush_all();
//!
//! assert_eq!(stage.sink()[0].timestamp, 100_000_000);
//! assert_eq!(stage.statistics(TrackId(1)).unwrap().num_frames(), 3);
//! ```

pub mod cluster;
pub mod error;
pub mod extension;
pub mod factory;
pub mod packet;
pub mod statistics;

pub use cluster::{ClusterLimits, ClusterSink, ClusterStage};
pub use error::{Error, Result};
pub use extension::{
    BeforeAddingToCluster, MultipleTimestamps, PacketExtension, PacketExtensionType,
};
pub use factory::{ConstantOffset, ExternalTimestamps, TimestampFactory};
pub use packet::{FrameType, Packet, PacketPtr, TimestampAdjustment, UNSET};
pub use statistics::{StatisticsSink, StatisticsSummary, TrackStatistics};
