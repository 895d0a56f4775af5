use mediamux_common::{Timestamp, TimestampScale, TrackId, DEFAULT_TIMESTAMP_SCALE_NS};
use mediamux_packet::ClusterLimits;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MuxConfig {
    /// Nanoseconds per Matroska timestamp tick
    #[serde(default = "default_timestamp_scale")]
    pub timestamp_scale_ns: u64,

    #[serde(default)]
    pub cluster: ClusterConfig,

    /// External timestamp files, one per track
    #[serde(default)]
    pub timestamps: Vec<TimestampFileConfig>,

    /// Constant timestamp offsets, one per track
    #[serde(default)]
    pub sync: Vec<SyncConfig>,
}

fn default_timestamp_scale() -> u64 {
    DEFAULT_TIMESTAMP_SCALE_NS
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            timestamp_scale_ns: default_timestamp_scale(),
            cluster: ClusterConfig::default(),
            timestamps: Vec::new(),
            sync: Vec::new(),
        }
    }
}

impl MuxConfig {
    /// The configured scale; a zero value falls back to the default.
    pub fn timestamp_scale(&self) -> TimestampScale {
        TimestampScale::new(self.timestamp_scale_ns).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// How far ahead of the oldest queued packet the newest may run before
    /// packets are released
    #[serde(default = "default_lookahead_ms")]
    pub lookahead_ms: u64,

    /// Upper bound on queued packets
    #[serde(default = "default_max_pending_packets")]
    pub max_pending_packets: usize,
}

fn default_lookahead_ms() -> u64 {
    1_000
}

fn default_max_pending_packets() -> usize {
    4_096
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: default_lookahead_ms(),
            max_pending_packets: default_max_pending_packets(),
        }
    }
}

impl ClusterConfig {
    pub fn limits(&self) -> ClusterLimits {
        let lookahead = i64::try_from(self.lookahead_ms).unwrap_or(i64::MAX);
        ClusterLimits {
            lookahead_ns: Timestamp::from_ms(lookahead.min(i64::MAX / 1_000_000)).to_ns(),
            max_pending: self.max_pending_packets,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimestampFileConfig {
    pub track: TrackId,

    /// Path to a "timestamp format v2" file; relative paths are resolved
    /// against the directory of the config file
    pub file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    pub track: TrackId,

    /// Offset added to every timestamp of the track, may be negative
    pub offset_ms: i64,
}
