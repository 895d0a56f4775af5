//! Per-track statistics accumulated while packets are written.
//!
//! The totals end up in the Matroska statistics tags (`BPS`, `DURATION`,
//! `NUMBER_OF_FRAMES`, `NUMBER_OF_BYTES`).

use mediamux_common::{Timestamp, TrackId, NS_PER_SEC};
use serde::Serialize;

/// Receiver of per-packet accounting.
pub trait StatisticsSink {
    /// Fold in one packet. `timestamp` is already shifted by the output's
    /// timestamp offset and `duration` is never negative.
    fn account(&mut self, timestamp: i64, duration: i64, size: u64);
}

/// Running totals for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackStatistics {
    track: TrackId,
    num_frames: u64,
    num_bytes: u64,
    min_timestamp: Option<i64>,
    max_timestamp_end: Option<i64>,
}

impl TrackStatistics {
    pub fn new(track: TrackId) -> Self {
        Self {
            track,
            num_frames: 0,
            num_bytes: 0,
            min_timestamp: None,
            max_timestamp_end: None,
        }
    }

    pub fn track(&self) -> TrackId {
        self.track
    }

    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }

    pub fn num_bytes(&self) -> u64 {
        self.num_bytes
    }

    pub fn min_timestamp(&self) -> Option<i64> {
        self.min_timestamp
    }

    /// Largest `timestamp + duration` seen so far.
    pub fn max_timestamp_end(&self) -> Option<i64> {
        self.max_timestamp_end
    }

    /// Span between the first timestamp and the end of the last frame.
    pub fn duration_ns(&self) -> Option<i64> {
        match (self.min_timestamp, self.max_timestamp_end) {
            (Some(min), Some(max)) => Some(max - min),
            _ => None,
        }
    }

    /// Average bitrate; `None` without frames or for a zero-length track.
    pub fn bits_per_second(&self) -> Option<u64> {
        let duration = self.duration_ns().filter(|duration| *duration > 0)?;
        let bits = self.num_bytes as u128 * 8 * NS_PER_SEC as u128;
        Some(((bits + duration as u128 / 2) / duration as u128) as u64)
    }

    pub fn summary(&self) -> StatisticsSummary {
        StatisticsSummary {
            track: self.track,
            bits_per_second: self.bits_per_second(),
            duration_ns: self.duration_ns(),
            number_of_frames: self.num_frames,
            number_of_bytes: self.num_bytes,
        }
    }
}

impl StatisticsSink for TrackStatistics {
    fn account(&mut self, timestamp: i64, duration: i64, size: u64) {
        self.num_frames += 1;
        self.num_bytes += size;

        let end = timestamp.saturating_add(duration);
        self.min_timestamp = Some(self.min_timestamp.map_or(timestamp, |min| min.min(timestamp)));
        self.max_timestamp_end = Some(self.max_timestamp_end.map_or(end, |max| max.max(end)));
    }
}

/// Final numbers for one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsSummary {
    pub track: TrackId,
    pub bits_per_second: Option<u64>,
    pub duration_ns: Option<i64>,
    pub number_of_frames: u64,
    pub number_of_bytes: u64,
}

impl StatisticsSummary {
    /// Tag name/value pairs in the order they are written.
    pub fn tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = Vec::with_capacity(4);
        if let Some(bps) = self.bits_per_second {
            tags.push(("BPS", bps.to_string()));
        }
        if let Some(duration) = self.duration_ns {
            tags.push(("DURATION", Timestamp::from_ns(duration).to_string()));
        }
        tags.push(("NUMBER_OF_FRAMES", self.number_of_frames.to_string()));
        tags.push(("NUMBER_OF_BYTES", self.number_of_bytes.to_string()));
        tags
    }
}
