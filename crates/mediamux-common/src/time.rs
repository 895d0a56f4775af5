//! Nanosecond timestamps and the Matroska timestamp scale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Nanoseconds per second.
pub const NS_PER_SEC: i64 = 1_000_000_000;

/// Default Matroska `TimestampScale`: one tick per millisecond.
pub const DEFAULT_TIMESTAMP_SCALE_NS: u64 = 1_000_000;

/// A signed point in time or duration, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_ns(ns: i64) -> Self {
        Self(ns)
    }

    /// Microseconds; saturates at the ends of the nanosecond range.
    pub const fn from_us(us: i64) -> Self {
        Self(us.saturating_mul(1_000))
    }

    /// Milliseconds; saturates at the ends of the nanosecond range.
    pub const fn from_ms(ms: i64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    /// Milliseconds, or `None` if they do not fit into nanoseconds.
    pub const fn checked_from_ms(ms: i64) -> Option<Self> {
        match ms.checked_mul(1_000_000) {
            Some(ns) => Some(Self(ns)),
            None => None,
        }
    }

    /// Fractional milliseconds, rounded to the nearest nanosecond.
    pub fn from_ms_f64(ms: f64) -> Self {
        Self((ms * 1_000_000.0).round() as i64)
    }

    pub const fn to_ns(self) -> i64 {
        self.0
    }

    pub const fn to_ms(self) -> i64 {
        self.0 / 1_000_000
    }

    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Timestamp {
    type Output = Timestamp;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

/// Formats as `HH:MM:SS.nnnnnnnnn`, with a leading `-` for negative values.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let ns = self.0.unsigned_abs();
        let secs = ns / NS_PER_SEC as u64;

        write!(
            f,
            "{sign}{:02}:{:02}:{:02}.{:09}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            ns % NS_PER_SEC as u64
        )
    }
}

/// Nanoseconds per Matroska timestamp tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimestampScale(u64);

impl TimestampScale {
    /// Create a scale; zero is not a valid scale.
    pub fn new(ns_per_tick: u64) -> Option<Self> {
        (ns_per_tick > 0).then_some(Self(ns_per_tick))
    }

    pub fn ns_per_tick(self) -> u64 {
        self.0
    }

    /// Round `ns` to the nearest multiple of the scale, halves away from zero.
    pub fn round(self, ns: i64) -> i64 {
        let scale = self.0 as i128;
        let value = ns as i128;
        let rounded = if value < 0 {
            -((-value + scale / 2) / scale)
        } else {
            (value + scale / 2) / scale
        };
        (rounded * scale).clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl Default for TimestampScale {
    fn default() -> Self {
        Self(DEFAULT_TIMESTAMP_SCALE_NS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_display() {
        assert_eq!(Timestamp::ZERO.to_string(), "00:00:00.000000000");
        assert_eq!(
            Timestamp::from_ns(3_723_000_000_042).to_string(),
            "01:02:03.000000042"
        );
        assert_eq!(Timestamp::from_ms(-1_500).to_string(), "-00:00:01.500000000");
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let a = Timestamp::from_ms(40);
        let b = Timestamp::from_us(1_000);
        assert_eq!((a + b).to_ns(), 41_000_000);
        assert_eq!((b - a).to_ms(), -39);
        assert_eq!((-a).abs(), a);
        assert_eq!(Timestamp::from_ms_f64(41.708).to_ns(), 41_708_000);
    }

    #[test]
    fn test_scale_rounding() {
        let scale = TimestampScale::default();
        assert_eq!(scale.round(0), 0);
        assert_eq!(scale.round(1_499_999), 1_000_000);
        assert_eq!(scale.round(1_500_000), 2_000_000);
        assert_eq!(scale.round(-1_500_000), -2_000_000);
        assert_eq!(scale.round(-1_400_000), -1_000_000);

        let unit = TimestampScale::new(1).unwrap();
        assert_eq!(unit.round(123_456_789), 123_456_789);
    }

    #[test]
    fn test_out_of_range_values_saturate() {
        assert_eq!(Timestamp::from_ms(i64::MAX / 1_000).to_ns(), i64::MAX);
        assert_eq!(Timestamp::from_us(i64::MIN).to_ns(), i64::MIN);
        assert_eq!(
            (Timestamp::from_ns(i64::MAX) + Timestamp::from_ms(1)).to_ns(),
            i64::MAX
        );
        assert_eq!((-Timestamp::from_ns(i64::MIN)).to_ns(), i64::MAX);

        assert_eq!(Timestamp::checked_from_ms(-40), Some(Timestamp::from_ns(-40_000_000)));
        assert_eq!(Timestamp::checked_from_ms(9_223_372_036_854_775), None);

        let scale = TimestampScale::new(1_000_000_000).unwrap();
        assert_eq!(scale.round(i64::MAX), i64::MAX);
    }

    #[test]
    fn test_zero_scale_rejected() {
        assert!(TimestampScale::new(0).is_none());
    }
}
