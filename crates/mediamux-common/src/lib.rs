//! Mediamux-Common: Shared ids and timestamp types.
//!
//! - **Typed IDs**: [`PacketizerId`] names the stage that produced a packet
//!   without holding on to it, [`TrackId`] routes packets to per-track state.
//! - **Timestamps**: nanosecond [`Timestamp`] values and the Matroska
//!   [`TimestampScale`] they get rounded to before being written.
//!
//! # Examples
//!
//! ```
//! use mediamux_common::{Timestamp, TimestampScale};
//!
//! let scale = TimestampScale::default();
//! assert_eq!(scale.round(41_708_333), 42_000_000);
//! assert_eq!(Timestamp::from_ms(1_500).to_string(), "00:00:01.500000000");
//! ```

pub mod ids;
pub mod time;

pub use ids::*;
pub use time::*;
