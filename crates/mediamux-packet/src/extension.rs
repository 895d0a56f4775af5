//! Side-channel annotations attached to packets.
//!
//! The set of annotations is closed, so they are a plain enum. Consumers look
//! them up by [`PacketExtensionType`]; by convention a packet carries at most
//! one extension of each type.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

use crate::packet::Packet;

/// Discriminant of a [`PacketExtension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketExtensionType {
    MultipleTimestamps,
    SubtitleNumber,
    BeforeAddingToCluster,
}

impl fmt::Display for PacketExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleTimestamps => write!(f, "multiple timestamps"),
            Self::SubtitleNumber => write!(f, "subtitle number"),
            Self::BeforeAddingToCluster => write!(f, "before adding to cluster"),
        }
    }
}

/// Annotation carried by a packet.
#[derive(Debug)]
pub enum PacketExtension {
    /// Timestamps of the individual frames laced into one block.
    MultipleTimestamps(MultipleTimestamps),
    /// Sequence number of a subtitle within a multiplexed subtitle block.
    SubtitleNumber(u64),
    /// Action to run right before the packet is put into a cluster.
    BeforeAddingToCluster(BeforeAddingToCluster),
}

impl PacketExtension {
    pub fn kind(&self) -> PacketExtensionType {
        match self {
            Self::MultipleTimestamps(_) => PacketExtensionType::MultipleTimestamps,
            Self::SubtitleNumber(_) => PacketExtensionType::SubtitleNumber,
            Self::BeforeAddingToCluster(_) => PacketExtensionType::BeforeAddingToCluster,
        }
    }

    /// Wrap a callback into a [`PacketExtension::BeforeAddingToCluster`].
    pub fn before_adding_to_cluster(callback: impl FnOnce(&Packet, i64) + Send + 'static) -> Self {
        Self::BeforeAddingToCluster(BeforeAddingToCluster::new(callback))
    }
}

/// Frame timestamps and byte positions of a block that holds several frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipleTimestamps {
    frames: VecDeque<(i64, i64)>,
}

impl MultipleTimestamps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame starting at byte `position` with the given timestamp.
    pub fn add(&mut self, timestamp: i64, position: i64) {
        self.frames.push_back((timestamp, position));
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Remove and return the oldest `(timestamp, position)` pair.
    pub fn pop_front(&mut self) -> Option<(i64, i64)> {
        self.frames.pop_front()
    }

    /// `(timestamp, position)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.frames.iter().copied()
    }
}

type ClusterCallback = Box<dyn FnOnce(&Packet, i64) + Send>;

/// A callback that runs at most once, right before its packet is attached to
/// a cluster. It receives the packet and the timestamp offset of the output.
pub struct BeforeAddingToCluster {
    callback: Mutex<Option<ClusterCallback>>,
}

impl BeforeAddingToCluster {
    pub fn new(callback: impl FnOnce(&Packet, i64) + Send + 'static) -> Self {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    /// Run the callback if it has not run yet. Returns whether it ran.
    pub fn invoke(&self, packet: &Packet, timestamp_offset: i64) -> bool {
        let callback = self.callback.lock().take();
        match callback {
            Some(callback) => {
                callback(packet, timestamp_offset);
                true
            }
            None => false,
        }
    }

    /// Whether the callback is still waiting to run.
    pub fn is_pending(&self) -> bool {
        self.callback.lock().is_some()
    }
}

impl fmt::Debug for BeforeAddingToCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeforeAddingToCluster")
            .field("pending", &self.is_pending())
            .finish()
    }
}
