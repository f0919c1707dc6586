use tempora_core::{Rate, SimDuration};
use tokio::time::Instant;

/// Paired (wall-clock, sim-clock) snapshot taken when a clock starts running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragOffset {
    /// When the clock started in real (wall) time
    pub wall: Instant,
    /// The clock time at that moment
    pub sim: SimDuration,
}

/// Maps simulated time onto wall-clock deadlines for one running clock
///
/// All other timing decisions of an engine derive from this offset and the
/// current rate:
///
/// ```text
/// deadline(t) = wall + (t - sim) * rate
/// delay(t)    = max(0, deadline(t) - now)
/// ```
///
/// An unconstrained rate makes every deadline immediate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacer {
    offset: DragOffset,
    rate: Option<f64>,
}

/// Far-future cap for deadlines that overflow the monotonic clock
const MAX_DEADLINE: std::time::Duration = std::time::Duration::from_secs(100 * 365 * 86_400);

impl Pacer {
    /// Snapshot the drag offset at `wall`/`sim` for the given pace
    pub fn start(wall: Instant, sim: SimDuration, pace: Option<Rate>) -> Self {
        Self {
            offset: DragOffset { wall, sim },
            rate: Rate::effective(pace),
        }
    }

    pub fn offset(&self) -> DragOffset {
        self.offset
    }

    /// Effective pacing factor, `None` when unconstrained
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    pub fn is_unconstrained(&self) -> bool {
        self.rate.is_none()
    }

    /// Wall-clock instant at which simulated time `target` is due
    ///
    /// Returns `None` when unconstrained, meaning "due immediately".
    pub fn deadline(&self, target: SimDuration) -> Option<Instant> {
        let rate = self.rate?;
        let ahead = target.saturating_sub(self.offset.sim).mul_f64(rate).to_std();
        Some(
            self.offset
                .wall
                .checked_add(ahead)
                .unwrap_or_else(|| self.offset.wall + MAX_DEADLINE),
        )
    }

    /// Real delay before `target` is due, clamped at zero
    pub fn delay(&self, target: SimDuration, now: Instant) -> std::time::Duration {
        match self.deadline(target) {
            Some(deadline) => deadline.saturating_duration_since(now),
            None => std::time::Duration::ZERO,
        }
    }

    /// Simulated time reached at wall-clock `now`
    ///
    /// Unconstrained clocks only move on events, so the estimate stays at the
    /// offset.
    pub fn estimate(&self, now: Instant) -> SimDuration {
        match self.rate {
            Some(rate) => {
                let elapsed = SimDuration::from(now.saturating_duration_since(self.offset.wall));
                self.offset.sim + elapsed.mul_f64(1.0 / rate)
            }
            None => self.offset.sim,
        }
    }

    /// Take a fresh offset, e.g. after a pace change or a jump in time
    pub fn rebase(&mut self, wall: Instant, sim: SimDuration, pace: Option<Rate>) {
        *self = Self::start(wall, sim, pace);
    }
}
