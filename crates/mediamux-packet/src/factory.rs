//! Timestamp factories.
//!
//! A factory is the one stage allowed to change a packet's timing. It only
//! schedules a [`TimestampAdjustment`]; the adjustment takes effect when the
//! packet's timing is finalized with [`Packet::normalize_timestamps`].

use std::path::Path;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::packet::{Packet, TimestampAdjustment};
use mediamux_common::Timestamp;

/// Source of replacement timing for the packets of one track.
pub trait TimestampFactory: Send {
    /// Schedule new timing for the next packet. Returns whether an adjustment
    /// was scheduled.
    fn assign(&mut self, packet: &mut Packet) -> bool;
}

/// Shifts every timed packet by a fixed offset.
///
/// Timestamps that would end up negative are clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantOffset {
    offset_ns: i64,
}

impl ConstantOffset {
    pub fn new(offset: Timestamp) -> Self {
        Self {
            offset_ns: offset.to_ns(),
        }
    }
}

impl TimestampFactory for ConstantOffset {
    fn assign(&mut self, packet: &mut Packet) -> bool {
        if !packet.has_timestamp() {
            return false;
        }

        packet.schedule_adjustment(TimestampAdjustment {
            timestamp: packet.timestamp.saturating_add(self.offset_ns).max(0),
            duration: None,
        })
    }
}

/// Timestamps read from an external "timestamp format v2" file.
///
/// The file lists one timestamp in milliseconds per frame, in frame order:
///
/// ```text
/// # timestamp format v2
/// 0
/// 41.708
/// 83.417
/// ```
///
/// Each frame lasts until the next larger timestamp in the file; the frame
/// with the largest timestamp keeps its own duration. Frames beyond the end of
/// the list continue at the average frame rate of the file.
#[derive(Debug, Clone)]
pub struct ExternalTimestamps {
    timestamps: Vec<i64>,
    durations: Vec<Option<i64>>,
    last: i64,
    default_duration: Option<i64>,
    frame: usize,
    warned: bool,
}

impl ExternalTimestamps {
    /// Parse the contents of a v2 timestamp file.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().enumerate();

        loop {
            match lines.next() {
                Some((_, line)) if line.trim().is_empty() => continue,
                Some((_, line)) => {
                    parse_header(line)?;
                    break;
                }
                None => return Err(Error::MissingHeader),
            }
        }

        let mut timestamps = Vec::new();
        let mut line_count = 0;
        for (index, line) in lines {
            line_count = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let ms: f64 = line.parse().map_err(|_| {
                Error::timestamp_file(index + 1, format!("invalid timestamp '{line}'"))
            })?;
            if !ms.is_finite() || ms < 0.0 {
                return Err(Error::timestamp_file(
                    index + 1,
                    format!("timestamp out of range '{line}'"),
                ));
            }

            timestamps.push(Timestamp::from_ms_f64(ms).to_ns());
        }

        if timestamps.is_empty() {
            return Err(Error::timestamp_file(line_count, "file contains no timestamps"));
        }

        let mut sorted = timestamps.clone();
        sorted.sort_unstable();

        let durations = timestamps
            .iter()
            .map(|&timestamp| {
                let next = sorted.partition_point(|&other| other <= timestamp);
                sorted.get(next).map(|&next| next - timestamp)
            })
            .collect();

        let first = sorted[0];
        let last = sorted[sorted.len() - 1];
        let default_duration =
            (sorted.len() > 1).then(|| (last - first) / (sorted.len() as i64 - 1));

        debug!(
            count = timestamps.len(),
            last = %Timestamp::from_ns(last),
            "parsed external timestamps"
        );

        Ok(Self {
            timestamps,
            durations,
            last,
            default_duration,
            frame: 0,
            warned: false,
        })
    }

    /// Read and parse a v2 timestamp file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamps in frame order, in nanoseconds.
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    fn adjustment_for(&mut self, frame: usize, packet: &Packet) -> TimestampAdjustment {
        if let Some(&timestamp) = self.timestamps.get(frame) {
            return TimestampAdjustment {
                timestamp,
                duration: self.durations[frame],
            };
        }

        if !self.warned {
            warn!(
                timestamps = self.timestamps.len(),
                "fewer external timestamps than frames, extrapolating the rest"
            );
            self.warned = true;
        }

        let step = self
            .default_duration
            .unwrap_or_else(|| packet.effective_duration());
        let beyond = (frame - self.timestamps.len() + 1) as i64;

        TimestampAdjustment {
            timestamp: self.last.saturating_add(beyond.saturating_mul(step)),
            duration: Some(step),
        }
    }
}

impl TimestampFactory for ExternalTimestamps {
    fn assign(&mut self, packet: &mut Packet) -> bool {
        let frame = self.frame;
        self.frame += 1;

        let adjustment = self.adjustment_for(frame, packet);
        let scheduled = packet.schedule_adjustment(adjustment);
        if scheduled {
            trace!(
                frame,
                timestamp = %Timestamp::from_ns(adjustment.timestamp),
                "assigned external timestamp"
            );
        }

        scheduled
    }
}

/// Accepts `# timestamp format v2` and the older `# timecode format v2`.
fn parse_header(line: &str) -> Result<()> {
    let header = line.trim().to_ascii_lowercase();
    let Some(rest) = header.strip_prefix('#') else {
        return Err(Error::MissingHeader);
    };

    let rest = rest.trim_start();
    let version = rest
        .strip_prefix("timestamp format v")
        .or_else(|| rest.strip_prefix("timecode format v"))
        .ok_or(Error::MissingHeader)?;

    match version.trim().parse::<u32>() {
        Ok(2) => Ok(()),
        Ok(other) => Err(Error::UnsupportedFormat(other)),
        Err(_) => Err(Error::MissingHeader),
    }
}
