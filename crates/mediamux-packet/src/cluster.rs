//! Timestamp-ordered hand-off of packets to the cluster writer.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{debug, trace};

use crate::packet::PacketPtr;
use crate::statistics::{StatisticsSummary, TrackStatistics};
use mediamux_common::{Timestamp, TrackId};

/// Consumer of packets that are ready to go into a cluster.
pub trait ClusterSink {
    fn add_packet(&mut self, packet: PacketPtr);
}

impl ClusterSink for Vec<PacketPtr> {
    fn add_packet(&mut self, packet: PacketPtr) {
        self.push(packet);
    }
}

/// Bounds on how many packets the stage holds back for reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterLimits {
    /// Packets older than the newest queued timestamp minus this are released.
    pub lookahead_ns: i64,
    /// Hard cap on queued packets; the oldest are released beyond it.
    pub max_pending: usize,
}

impl Default for ClusterLimits {
    fn default() -> Self {
        Self {
            lookahead_ns: 1_000_000_000,
            max_pending: 4096,
        }
    }
}

struct Queued {
    timestamp: i64,
    sequence: u64,
    packet: PacketPtr,
}

// BinaryHeap is a max-heap; invert so the earliest packet sits on top and
// equal timestamps keep their arrival order.
impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp && self.sequence == other.sequence
    }
}

impl Eq for Queued {}

/// Collects normalized packets from all tracks and releases them in
/// timestamp order.
///
/// Releasing a packet runs its before-adding-to-cluster callback, accounts it
/// into the statistics of its track and passes it on to the sink.
pub struct ClusterStage<S> {
    sink: S,
    limits: ClusterLimits,
    timestamp_offset: i64,
    queue: BinaryHeap<Queued>,
    sequence: u64,
    newest: Option<i64>,
    statistics: BTreeMap<TrackId, TrackStatistics>,
}

impl<S: ClusterSink> ClusterStage<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            limits: ClusterLimits::default(),
            timestamp_offset: 0,
            queue: BinaryHeap::new(),
            sequence: 0,
            newest: None,
            statistics: BTreeMap::new(),
        }
    }

    pub fn with_limits(mut self, limits: ClusterLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Offset subtracted from every timestamp on output.
    pub fn with_timestamp_offset(mut self, offset: i64) -> Self {
        self.timestamp_offset = offset;
        self
    }

    /// Queue a packet, releasing whatever falls out of the lookahead window.
    ///
    /// Returns the number of packets released.
    pub fn push(&mut self, packet: PacketPtr) -> usize {
        let timestamp = packet.assigned_timestamp;
        trace!(
            track = %packet.track,
            timestamp = %Timestamp::from_ns(timestamp),
            frame = %packet.frame_type(),
            "queued packet"
        );

        self.queue.push(Queued {
            timestamp,
            sequence: self.sequence,
            packet,
        });
        self.sequence += 1;

        let newest = self.newest.map_or(timestamp, |newest| newest.max(timestamp));
        self.newest = Some(newest);

        let mut released = self.flush_until(newest - self.limits.lookahead_ns);
        while self.queue.len() > self.limits.max_pending && self.release_oldest() {
            released += 1;
        }

        released
    }

    /// Release every queued packet with a timestamp up to and including
    /// `timestamp`.
    pub fn flush_until(&mut self, timestamp: i64) -> usize {
        let mut released = 0;
        while self
            .queue
            .peek()
            .is_some_and(|queued| queued.timestamp <= timestamp)
        {
            self.release_oldest();
            released += 1;
        }

        if released > 0 {
            debug!(
                released,
                until = %Timestamp::from_ns(timestamp),
                pending = self.queue.len(),
                "flushed packets to cluster"
            );
        }

        released
    }

    /// Release everything that is queued.
    pub fn flush_all(&mut self) -> usize {
        let mut released = 0;
        while self.release_oldest() {
            released += 1;
        }

        if released > 0 {
            debug!(released, "flushed all packets to cluster");
        }

        released
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn statistics(&self, track: TrackId) -> Option<&TrackStatistics> {
        self.statistics.get(&track)
    }

    /// Statistics of every track seen so far, by track number.
    pub fn summaries(&self) -> Vec<StatisticsSummary> {
        self.statistics.values().map(TrackStatistics::summary).collect()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn release_oldest(&mut self) -> bool {
        let Some(queued) = self.queue.pop() else {
            return false;
        };

        let packet = queued.packet;
        packet.run_before_adding_to_cluster(self.timestamp_offset);

        let statistics = self
            .statistics
            .entry(packet.track)
            .or_insert_with(|| TrackStatistics::new(packet.track));
        packet.account(statistics, self.timestamp_offset);

        self.sink.add_packet(packet);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;
    use bytes::Bytes;

    fn packet(track: u64, timestamp_ms: i64) -> PacketPtr {
        Packet::new(Bytes::from_static(b"frame"))
            .with_track(TrackId(track))
            .with_timestamp(timestamp_ms * 1_000_000)
            .with_duration(40_000_000)
            .into_shared()
    }

    fn order(sink: &[PacketPtr]) -> Vec<(u64, i64)> {
        sink.iter()
            .map(|p| (p.track.0, p.assigned_timestamp / 1_000_000))
            .collect()
    }

    #[test]
    fn test_releases_in_timestamp_order() {
        let mut stage = ClusterStage::new(Vec::new());
        stage.push(packet(1, 80));
        stage.push(packet(2, 0));
        stage.push(packet(1, 40));
        stage.push(packet(2, 40));
        assert_eq!(stage.pending(), 4);

        assert_eq!(stage.flush_until(40_000_000), 3);
        assert_eq!(stage.flush_all(), 1);
        assert_eq!(stage.flush_all(), 0);

        assert_eq!(
            order(stage.sink()),
            vec![(2, 0), (1, 40), (2, 40), (1, 80)]
        );
    }

    #[test]
    fn test_lookahead_window() {
        let limits = ClusterLimits {
            lookahead_ns: 100_000_000,
            max_pending: 100,
        };
        let mut stage = ClusterStage::new(Vec::new()).with_limits(limits);

        assert_eq!(stage.push(packet(1, 0)), 0);
        assert_eq!(stage.push(packet(1, 50)), 0);
        assert_eq!(stage.push(packet(1, 120)), 1);
        assert_eq!(stage.push(packet(1, 250)), 2);
        assert_eq!(stage.pending(), 1);
    }

    #[test]
    fn test_max_pending() {
        let limits = ClusterLimits {
            lookahead_ns: i64::MAX / 2,
            max_pending: 2,
        };
        let mut stage = ClusterStage::new(Vec::new()).with_limits(limits);

        stage.push(packet(1, 30));
        stage.push(packet(1, 10));
        assert_eq!(stage.push(packet(1, 20)), 1);
        assert_eq!(order(stage.sink()), vec![(1, 10)]);
    }

    #[test]
    fn test_statistics_per_track() {
        let mut stage = ClusterStage::new(Vec::new()).with_timestamp_offset(10_000_000);
        stage.push(packet(1, 10));
        stage.push(packet(1, 50));
        stage.push(packet(2, 10));
        stage.flush_all();

        let video = stage.statistics(TrackId(1)).unwrap();
        assert_eq!(video.num_frames(), 2);
        assert_eq!(video.num_bytes(), 10);
        assert_eq!(video.min_timestamp(), Some(0));
        assert_eq!(video.duration_ns(), Some(80_000_000));

        let summaries = stage.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].track, TrackId(2));
        assert!(stage.statistics(TrackId(3)).is_none());
    }
}
