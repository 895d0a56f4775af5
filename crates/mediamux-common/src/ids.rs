//! Typed ID wrappers.
//!
//! Packets refer back to the packetizer that produced them by id only, so a
//! packet never keeps its producer alive and never dangles once the producer
//! is gone.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a packetizer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketizerId(Uuid);

impl PacketizerId {
    /// Generate a new random packetizer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PacketizerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PacketizerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<PacketizerId> for Uuid {
    fn from(id: PacketizerId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PacketizerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output track number (Matroska `TrackNumber`, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl From<u64> for TrackId {
    fn from(number: u64) -> Self {
        Self(number)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packetizer_ids_are_unique() {
        assert_ne!(PacketizerId::new(), PacketizerId::new());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let uuid = Uuid::nil();
        let id = PacketizerId::from(uuid);
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"00000000-0000-0000-0000-000000000000\""
        );
        assert_eq!(serde_json::to_string(&TrackId(3)).unwrap(), "3");
    }
}
