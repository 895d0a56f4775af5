//! The access unit travelling through the mux pipeline.

use bytes::Bytes;
use mediamux_common::{PacketizerId, Timestamp, TimestampScale, TrackId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::extension::{MultipleTimestamps, PacketExtension, PacketExtensionType};
use crate::statistics::StatisticsSink;

/// Sentinel for timing fields that are not set.
pub const UNSET: i64 = -1;

/// A packet shared between pipeline stages.
pub type PacketPtr = Arc<Packet>;

/// Frame classification derived from the reference fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Depends on no other frame.
    Key,
    /// Depends on exactly one other frame.
    Predicted,
    /// Depends on a backward and a forward frame.
    BiPredicted,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "I"),
            Self::Predicted => write!(f, "P"),
            Self::BiPredicted => write!(f, "B"),
        }
    }
}

/// New timing for a packet, decided by a timestamp factory and applied by
/// [`Packet::normalize_timestamps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampAdjustment {
    pub timestamp: i64,
    /// Replacement duration, `None` keeps the packet's own.
    pub duration: Option<i64>,
}

/// One media access unit.
///
/// Timing fields are nanoseconds. `timestamp`, `duration`, `bref` and `fref`
/// use negative values (see [`UNSET`]) for "not set"; check the `has_*`
/// predicates before relying on them.
///
/// A packet is built and timed through `&mut self` by a single stage, then
/// wrapped into a [`PacketPtr`] and treated as read-only by every stage after
/// that.
#[derive(Debug)]
pub struct Packet {
    /// The compressed frame.
    pub payload: Bytes,
    /// Matroska `BlockAdditions`, in order.
    pub block_additions: Vec<Bytes>,
    /// In-band replacement for the track's codec private data.
    pub codec_state: Option<Bytes>,

    pub track: TrackId,
    /// Packetizer that produced this packet, for identification only.
    pub source: Option<PacketizerId>,

    pub ref_priority: u8,
    pub time_factor: i64,

    pub timestamp: i64,
    pub bref: i64,
    pub fref: i64,
    pub duration: i64,
    pub assigned_timestamp: i64,
    pub timestamp_before_factory: i64,
    pub unmodified_assigned_timestamp: i64,
    pub unmodified_duration: i64,
    pub discard_padding: Option<Timestamp>,
    pub output_order_timestamp: Option<Timestamp>,

    pub duration_mandatory: bool,
    pub superseded: bool,
    pub gap_following: bool,
    factory_applied: bool,
    pending_adjustment: Option<TimestampAdjustment>,

    pub extensions: Vec<PacketExtension>,

    uncompressed_size: OnceLock<u64>,
}

impl Packet {
    /// Create an untimed packet owning `payload`.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            block_additions: Vec::new(),
            codec_state: None,
            track: TrackId::default(),
            source: None,
            ref_priority: 0,
            time_factor: 1,
            timestamp: UNSET,
            bref: UNSET,
            fref: UNSET,
            duration: UNSET,
            assigned_timestamp: 0,
            timestamp_before_factory: 0,
            unmodified_assigned_timestamp: 0,
            unmodified_duration: 0,
            discard_padding: None,
            output_order_timestamp: None,
            duration_mandatory: false,
            superseded: false,
            gap_following: false,
            factory_applied: false,
            pending_adjustment: None,
            extensions: Vec::new(),
            uncompressed_size: OnceLock::new(),
        }
    }

    /// Set the timestamp; the assigned timestamp follows it.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self.assigned_timestamp = timestamp.max(0);
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_bref(mut self, bref: i64) -> Self {
        self.bref = bref;
        self
    }

    pub fn with_fref(mut self, fref: i64) -> Self {
        self.fref = fref;
        self
    }

    pub fn with_track(mut self, track: TrackId) -> Self {
        self.track = track;
        self
    }

    pub fn with_source(mut self, source: PacketizerId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_block_addition(mut self, addition: impl Into<Bytes>) -> Self {
        self.block_additions.push(addition.into());
        self
    }

    pub fn with_codec_state(mut self, codec_state: impl Into<Bytes>) -> Self {
        self.codec_state = Some(codec_state.into());
        self
    }

    pub fn with_discard_padding(mut self, padding: Timestamp) -> Self {
        self.discard_padding = Some(padding);
        self
    }

    pub fn with_extension(mut self, extension: PacketExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Hand the packet over to the shared part of the pipeline.
    pub fn into_shared(self) -> PacketPtr {
        Arc::new(self)
    }

    pub fn has_timestamp(&self) -> bool {
        self.timestamp >= 0
    }

    pub fn has_bref(&self) -> bool {
        self.bref >= 0
    }

    pub fn has_fref(&self) -> bool {
        self.fref >= 0
    }

    pub fn has_duration(&self) -> bool {
        self.duration >= 0
    }

    pub fn has_discard_padding(&self) -> bool {
        self.discard_padding.is_some()
    }

    /// Duration, or 0 if none is set.
    pub fn effective_duration(&self) -> i64 {
        if self.has_duration() {
            self.duration
        } else {
            0
        }
    }

    /// Duration before normalization, or 0 if no duration is set.
    pub fn effective_unmodified_duration(&self) -> i64 {
        if self.has_duration() {
            self.unmodified_duration
        } else {
            0
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match (self.has_bref(), self.has_fref()) {
            (false, false) => FrameType::Key,
            (true, true) => FrameType::BiPredicted,
            _ => FrameType::Predicted,
        }
    }

    pub fn is_key_frame(&self) -> bool {
        self.frame_type() == FrameType::Key
    }

    pub fn is_p_frame(&self) -> bool {
        self.frame_type() == FrameType::Predicted
    }

    pub fn is_b_frame(&self) -> bool {
        self.frame_type() == FrameType::BiPredicted
    }

    /// First extension of the given type, if any.
    pub fn find_extension(&self, kind: PacketExtensionType) -> Option<&PacketExtension> {
        self.extensions.iter().find(|extension| extension.kind() == kind)
    }

    /// Append extensions in order. Duplicates are kept.
    pub fn add_extensions(&mut self, extensions: impl IntoIterator<Item = PacketExtension>) {
        self.extensions.extend(extensions);
    }

    pub fn multiple_timestamps(&self) -> Option<&MultipleTimestamps> {
        match self.find_extension(PacketExtensionType::MultipleTimestamps) {
            Some(PacketExtension::MultipleTimestamps(multi)) => Some(multi),
            _ => None,
        }
    }

    pub fn subtitle_number(&self) -> Option<u64> {
        match self.find_extension(PacketExtensionType::SubtitleNumber) {
            Some(PacketExtension::SubtitleNumber(number)) => Some(*number),
            _ => None,
        }
    }

    /// Run the pending before-adding-to-cluster callback, if there is one.
    pub fn run_before_adding_to_cluster(&self, timestamp_offset: i64) -> bool {
        match self.find_extension(PacketExtensionType::BeforeAddingToCluster) {
            Some(PacketExtension::BeforeAddingToCluster(hook)) => {
                hook.invoke(self, timestamp_offset)
            }
            _ => false,
        }
    }

    /// Whether timing has been finalized by [`Packet::normalize_timestamps`].
    pub fn factory_applied(&self) -> bool {
        self.factory_applied
    }

    pub fn pending_adjustment(&self) -> Option<TimestampAdjustment> {
        self.pending_adjustment
    }

    /// Record the timing a timestamp factory decided on.
    ///
    /// Returns `false` and leaves the packet alone once timing has been
    /// finalized. A later call replaces an earlier pending adjustment.
    pub fn schedule_adjustment(&mut self, adjustment: TimestampAdjustment) -> bool {
        if self.factory_applied {
            return false;
        }

        self.timestamp_before_factory = self.timestamp;
        self.pending_adjustment = Some(adjustment);
        true
    }

    /// Finalize the packet's timing.
    ///
    /// The first call snapshots the assigned timestamp and duration into the
    /// `unmodified_*` fields, applies the pending factory adjustment (shifting
    /// present references by the same amount as the timestamp) and rounds all
    /// present timing fields to `scale`. Every further call is a no-op.
    pub fn normalize_timestamps(&mut self, scale: TimestampScale) {
        if self.factory_applied {
            return;
        }

        self.unmodified_assigned_timestamp = self.assigned_timestamp;
        self.unmodified_duration = self.duration;

        if let Some(adjustment) = self.pending_adjustment.take() {
            let shift = adjustment.timestamp - self.timestamp;
            if self.has_bref() {
                self.bref = self.bref.saturating_add(shift).max(0);
            }
            if self.has_fref() {
                self.fref = self.fref.saturating_add(shift).max(0);
            }

            self.timestamp = adjustment.timestamp;
            self.assigned_timestamp = adjustment.timestamp;
            if let Some(duration) = adjustment.duration {
                self.duration = duration;
            }
        }

        if self.has_timestamp() {
            self.timestamp = scale.round(self.timestamp);
        }
        if self.has_duration() {
            self.duration = scale.round(self.duration);
        }
        if self.has_bref() {
            self.bref = scale.round(self.bref);
        }
        if self.has_fref() {
            self.fref = scale.round(self.fref);
        }
        self.assigned_timestamp = scale.round(self.assigned_timestamp);

        self.factory_applied = true;
    }

    /// Report this packet to a statistics collector.
    pub fn account<S>(&self, statistics: &mut S, timestamp_offset: i64)
    where
        S: StatisticsSink + ?Sized,
    {
        statistics.account(
            self.assigned_timestamp - timestamp_offset,
            self.effective_duration(),
            self.uncompressed_size(),
        );
    }

    /// Payload plus block addition bytes, computed once.
    pub fn uncompressed_size(&self) -> u64 {
        *self.uncompressed_size.get_or_init(|| {
            self.payload.len() as u64
                + self
                    .block_additions
                    .iter()
                    .map(|addition| addition.len() as u64)
                    .sum::<u64>()
        })
    }

    /// Provide the uncompressed size from a packetizer that knows better,
    /// e.g. when header bytes were stripped by content compression.
    ///
    /// Returns `false` if the size was already fixed.
    pub fn set_uncompressed_size(&self, size: u64) -> bool {
        self.uncompressed_size.set(size).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::TrackStatistics;

    #[test]
    fn test_fresh_packet_is_untimed_key_frame() {
        let packet = Packet::new(vec![0u8; 4]);

        assert!(!packet.has_timestamp());
        assert!(!packet.has_duration());
        assert!(!packet.has_bref());
        assert!(!packet.has_fref());
        assert!(!packet.has_discard_padding());
        assert_eq!(packet.effective_duration(), 0);
        assert_eq!(packet.time_factor, 1);
        assert!(packet.is_key_frame());
        assert!(!packet.factory_applied());
    }

    #[test]
    fn test_discard_padding() {
        let packet = Packet::new(Bytes::new())
            .with_timestamp(0)
            .with_discard_padding(Timestamp::from_ms(12));

        assert!(packet.has_discard_padding());
        assert_eq!(packet.discard_padding, Some(Timestamp::from_ns(12_000_000)));
        // padding is not part of the duration
        assert_eq!(packet.effective_duration(), 0);
    }

    #[test]
    fn test_effective_duration() {
        let packet = Packet::new(Bytes::new()).with_duration(40_000_000);
        assert_eq!(packet.effective_duration(), 40_000_000);

        let zero = Packet::new(Bytes::new()).with_duration(0);
        assert!(zero.has_duration());
        assert_eq!(zero.effective_duration(), 0);
    }

    #[test]
    fn test_frame_classification() {
        let key = Packet::new(Bytes::new());
        let backward = Packet::new(Bytes::new()).with_bref(0);
        let forward = Packet::new(Bytes::new()).with_fref(80);
        let both = Packet::new(Bytes::new()).with_bref(0).with_fref(80);

        assert_eq!(key.frame_type(), FrameType::Key);
        assert_eq!(backward.frame_type(), FrameType::Predicted);
        assert_eq!(forward.frame_type(), FrameType::Predicted);
        assert_eq!(both.frame_type(), FrameType::BiPredicted);

        for packet in [&key, &backward, &forward, &both] {
            let flags = [packet.is_key_frame(), packet.is_p_frame(), packet.is_b_frame()];
            assert_eq!(flags.iter().filter(|flag| **flag).count(), 1);
        }
    }

    #[test]
    fn test_find_extension_returns_first_match() {
        let mut packet = Packet::new(Bytes::new());
        assert!(packet
            .find_extension(PacketExtensionType::SubtitleNumber)
            .is_none());

        packet.add_extensions([
            PacketExtension::SubtitleNumber(1),
            PacketExtension::SubtitleNumber(2),
        ]);

        assert_eq!(packet.extensions.len(), 2);
        assert_eq!(packet.subtitle_number(), Some(1));
        assert!(packet.multiple_timestamps().is_none());
    }

    #[test]
    fn test_normalize_snapshots_and_rounds() {
        let mut packet = Packet::new(Bytes::new())
            .with_timestamp(41_708_333)
            .with_duration(41_708_333)
            .with_bref(400_000);

        packet.normalize_timestamps(TimestampScale::default());

        assert_eq!(packet.unmodified_assigned_timestamp, 41_708_333);
        assert_eq!(packet.unmodified_duration, 41_708_333);
        assert_eq!(packet.timestamp, 42_000_000);
        assert_eq!(packet.assigned_timestamp, 42_000_000);
        assert_eq!(packet.duration, 42_000_000);
        assert_eq!(packet.bref, 0);
        assert!(!packet.has_fref());
        assert!(packet.factory_applied());
    }

    #[test]
    fn test_normalize_applies_adjustment_once() {
        let mut packet = Packet::new(Bytes::new())
            .with_timestamp(10_000_000)
            .with_duration(20_000_000)
            .with_fref(30_000_000);

        assert!(packet.schedule_adjustment(TimestampAdjustment {
            timestamp: 15_000_000,
            duration: Some(25_000_000),
        }));
        assert_eq!(packet.timestamp_before_factory, 10_000_000);

        packet.normalize_timestamps(TimestampScale::default());
        let once = (packet.timestamp, packet.duration, packet.fref);
        assert_eq!(once, (15_000_000, 25_000_000, 35_000_000));
        assert_eq!(packet.unmodified_duration, 20_000_000);

        packet.normalize_timestamps(TimestampScale::default());
        assert_eq!((packet.timestamp, packet.duration, packet.fref), once);

        assert!(!packet.schedule_adjustment(TimestampAdjustment {
            timestamp: 0,
            duration: None,
        }));
        packet.normalize_timestamps(TimestampScale::default());
        assert_eq!((packet.timestamp, packet.duration, packet.fref), once);
    }

    #[test]
    fn test_uncompressed_size_is_memoized() {
        let packet = Packet::new(vec![0u8; 100])
            .with_block_addition(vec![0u8; 20])
            .with_block_addition(vec![0u8; 3]);

        assert_eq!(packet.uncompressed_size(), 123);
        assert!(!packet.set_uncompressed_size(1));
        assert_eq!(packet.uncompressed_size(), 123);

        let stripped = Packet::new(vec![0u8; 10]);
        assert!(stripped.set_uncompressed_size(14));
        assert_eq!(stripped.uncompressed_size(), 14);
    }

    #[test]
    fn test_account_uses_effective_values() {
        let mut stats = TrackStatistics::new(TrackId(1));

        let timed = Packet::new(vec![0u8; 10])
            .with_timestamp(1_000_000_000)
            .with_duration(500_000_000);
        timed.account(&mut stats, 200_000_000);

        let untimed = Packet::new(vec![0u8; 6]).with_timestamp(1_500_000_000);
        untimed.account(&mut stats, 200_000_000);

        assert_eq!(stats.num_frames(), 2);
        assert_eq!(stats.num_bytes(), 16);
        assert_eq!(stats.min_timestamp(), Some(800_000_000));
        assert_eq!(stats.max_timestamp_end(), Some(1_300_000_000));
    }

    #[test]
    fn test_packets_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Packet>();

        let shared = Packet::new(vec![1u8]).into_shared();
        let other = Arc::clone(&shared);
        assert_eq!(other.uncompressed_size(), 1);
        assert_eq!(Arc::strong_count(&shared), 2);
    }
}
