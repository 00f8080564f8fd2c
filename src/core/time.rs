//! Mission time with picosecond resolution
//!
//! An [`Instant`] is a count of milliseconds since the Unix epoch plus the
//! picoseconds elapsed inside that millisecond, so link timestamps decoded
//! from seconds/picoseconds fields survive without rounding.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::{ParamError, Result};

const PICOS_PER_MILLI: u64 = 1_000_000_000;
const PICOS_PER_SECOND: u64 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instant {
    millis: i64,
    /// Always below one millisecond worth of picoseconds
    picos: u32,
}

impl Instant {
    pub const MIN: Instant = Instant {
        millis: i64::MIN,
        picos: 0,
    };
    pub const MAX: Instant = Instant {
        millis: i64::MAX,
        picos: (PICOS_PER_MILLI - 1) as u32,
    };

    /// Excess picoseconds carry into the millisecond count, saturating at the range ends
    pub fn new(millis: i64, picos: u32) -> Self {
        let carry = (picos as u64 / PICOS_PER_MILLI) as i64;
        Self {
            millis: millis.saturating_add(carry),
            picos: (picos as u64 % PICOS_PER_MILLI) as u32,
        }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self { millis, picos: 0 }
    }

    /// Build from Unix seconds and a picosecond count, as carried on the TM link.
    ///
    /// Returns `None` when the result does not fit in the millisecond range.
    pub fn checked_from_unix_picos(secs: i64, picos: u64) -> Option<Self> {
        let extra_secs = (picos / PICOS_PER_SECOND) as i64;
        let rem = picos % PICOS_PER_SECOND;
        let millis = secs
            .checked_add(extra_secs)?
            .checked_mul(1000)?
            .checked_add((rem / PICOS_PER_MILLI) as i64)?;
        Some(Self {
            millis,
            picos: (rem % PICOS_PER_MILLI) as u32,
        })
    }

    /// Like [`Instant::checked_from_unix_picos`], clamped to the representable range
    pub fn from_unix_picos(secs: i64, picos: u64) -> Self {
        Self::checked_from_unix_picos(secs, picos).unwrap_or(if secs < 0 {
            Self::MIN
        } else {
            Self::MAX
        })
    }

    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        let secs = dt.timestamp();
        let nanos = dt.timestamp_subsec_nanos() as u64;
        Self::from_unix_picos(secs, nanos * 1000)
    }

    pub fn parse_rfc3339(s: &str) -> Result<Self> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ParamError::serialization("rfc3339", e))?;
        Ok(Self::from_datetime(&dt.with_timezone(&Utc)))
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Picoseconds inside the millisecond
    pub fn picos(&self) -> u32 {
        self.picos
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = self.millis.div_euclid(1000);
        let milli_rem = self.millis.rem_euclid(1000) as u32;
        // Sub-nanosecond picos are dropped only for display
        let nanos = milli_rem * 1_000_000 + self.picos / 1000;
        Utc.timestamp_opt(secs, nanos).single()
    }

    pub fn plus_picos(&self, picos: u64) -> Self {
        let total = (self.picos as u64).saturating_add(picos);
        let millis = i64::try_from(total / PICOS_PER_MILLI)
            .ok()
            .and_then(|carry| self.millis.checked_add(carry));
        match millis {
            Some(millis) => Self {
                millis,
                picos: (total % PICOS_PER_MILLI) as u32,
            },
            None => Self::MAX,
        }
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            None => write!(f, "{}ms+{}ps", self.millis, self.picos),
        }
    }
}

/// Source of current mission time
pub trait MissionClock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Mission time tracks the host wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl MissionClock for WallClock {
    fn now(&self) -> Instant {
        Instant::from_datetime(&Utc::now())
    }
}

/// Mission time set explicitly, for simulations and replays
#[derive(Debug)]
pub struct SimulationClock {
    current: RwLock<Instant>,
}

impl SimulationClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    pub fn set(&self, instant: Instant) {
        *self.current.write() = instant;
    }

    pub fn advance_millis(&self, millis: i64) {
        let mut current = self.current.write();
        *current = Instant::new(current.millis.saturating_add(millis), current.picos);
    }
}

impl MissionClock for SimulationClock {
    fn now(&self) -> Instant {
        *self.current.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_unix_picos_keeps_sub_nanosecond_part() {
        let t = Instant::from_unix_picos(10, 1_500_000_123);
        assert_eq!(t.millis(), 10_001);
        assert_eq!(t.picos(), 500_000_123);
    }

    #[test]
    fn test_from_unix_picos_normalises_whole_seconds() {
        let t = Instant::from_unix_picos(1, 2 * PICOS_PER_SECOND + 7);
        assert_eq!(t.millis(), 3_000);
        assert_eq!(t.picos(), 7);
    }

    #[test]
    fn test_ordering_uses_picos() {
        let a = Instant::new(5, 10);
        let b = Instant::new(5, 11);
        assert!(a < b);
        assert!(Instant::new(4, 999_999_999) < a);
    }

    #[test]
    fn test_rfc3339_round_trip_to_nanos() {
        let t = Instant::parse_rfc3339("2024-03-01T12:00:00.123456789Z").unwrap();
        assert_eq!(t.picos(), 456_789_000);
        assert_eq!(t.to_string(), "2024-03-01T12:00:00.123456789Z");
    }

    #[test]
    fn test_simulation_clock() {
        let clock = SimulationClock::new(Instant::from_millis(1_000));
        assert_eq!(clock.now(), Instant::from_millis(1_000));
        clock.advance_millis(250);
        assert_eq!(clock.now(), Instant::from_millis(1_250));
        clock.set(Instant::new(7, 3));
        assert_eq!(clock.now(), Instant::new(7, 3));
    }

    #[test]
    fn test_simulation_clock_saturates() {
        let clock = SimulationClock::new(Instant::from_millis(i64::MAX - 10));
        clock.advance_millis(100);
        assert_eq!(clock.now().millis(), i64::MAX);
        clock.set(Instant::from_millis(i64::MIN + 10));
        clock.advance_millis(-100);
        assert_eq!(clock.now().millis(), i64::MIN);
    }

    #[test]
    fn test_out_of_range_seconds() {
        assert_eq!(Instant::checked_from_unix_picos(i64::MAX, 0), None);
        assert_eq!(Instant::checked_from_unix_picos(i64::MIN, 0), None);
        assert_eq!(
            Instant::checked_from_unix_picos(i64::MAX / 1000, 0).map(|t| t.millis()),
            Some(i64::MAX / 1000 * 1000)
        );
        assert_eq!(Instant::from_unix_picos(i64::MAX, 0), Instant::MAX);
        assert_eq!(Instant::from_unix_picos(i64::MIN, 0), Instant::MIN);
    }

    #[test]
    fn test_carry_saturates() {
        assert_eq!(Instant::new(i64::MAX, 999_999_999).millis(), i64::MAX);
        assert_eq!(Instant::new(i64::MAX, u32::MAX).millis(), i64::MAX);
        assert_eq!(Instant::from_millis(i64::MAX).plus_picos(u64::MAX), Instant::MAX);
        assert_eq!(Instant::new(5, 10).plus_picos(PICOS_PER_MILLI), Instant::new(6, 10));
    }
}
