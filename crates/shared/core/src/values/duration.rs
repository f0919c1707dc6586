use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use super::SimInstant;

/// Signed span of simulated time with nanosecond resolution
///
/// Zero is the time of a freshly created clock. Arithmetic saturates instead
/// of wrapping so that far-future recurrence instants never alias back into
/// the past.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimDuration(i64);

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);
    pub const MAX: SimDuration = SimDuration(i64::MAX);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    pub const fn as_millis(&self) -> i64 {
        self.0 / 1_000_000
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Elapsed simulated time from `epoch` to `instant` (negative if before)
    pub fn between(epoch: SimInstant, instant: SimInstant) -> Self {
        Self::from((instant - epoch).num_nanoseconds().unwrap_or_else(|| {
            if instant >= epoch { i64::MAX } else { i64::MIN }
        }))
    }

    /// The instant reached after this much time has elapsed since `epoch`
    pub fn after(self, epoch: SimInstant) -> SimInstant {
        epoch
            .checked_add_signed(chrono::Duration::nanoseconds(self.0))
            .unwrap_or(if self.0 >= 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            })
    }

    /// Scale by a dimensionless factor, saturating on overflow
    pub fn mul_f64(self, factor: f64) -> Self {
        let scaled = self.0 as f64 * factor;
        if scaled.is_nan() {
            Self::ZERO
        } else if scaled >= i64::MAX as f64 {
            Self::MAX
        } else if scaled <= i64::MIN as f64 {
            Self(i64::MIN)
        } else {
            Self(scaled as i64)
        }
    }

    /// Convert to a wall-clock span; negative spans clamp to zero
    pub fn to_std(self) -> std::time::Duration {
        std::time::Duration::from_nanos(self.0.max(0) as u64)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<i64> for SimDuration {
    fn from(nanos: i64) -> Self {
        Self(nanos)
    }
}

impl From<std::time::Duration> for SimDuration {
    fn from(d: std::time::Duration) -> Self {
        Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl From<chrono::Duration> for SimDuration {
    fn from(d: chrono::Duration) -> Self {
        Self(d.num_nanoseconds().unwrap_or(if d < chrono::Duration::zero() {
            i64::MIN
        } else {
            i64::MAX
        }))
    }
}

impl Add for SimDuration {
    type Output = SimDuration;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for SimDuration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for SimDuration {
    type Output = SimDuration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0;
        if nanos % 1_000_000_000 == 0 {
            write!(f, "{}s", nanos / 1_000_000_000)
        } else if nanos % 1_000_000 == 0 {
            write!(f, "{}ms", nanos / 1_000_000)
        } else {
            write!(f, "{}ns", nanos)
        }
    }
}
