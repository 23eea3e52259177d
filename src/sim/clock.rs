//! Cycle timing: deterministic simulated clock and blocking wall clock.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

/// One scheduled cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Tick number, starting at 0.
    pub index: u64,
    /// Time the cycle is evaluated at.
    pub at: DateTime<Utc>,
}

/// Source of cycle ticks.
pub trait Ticker {
    /// Returns the next tick, or `None` when the schedule is exhausted.
    fn next_tick(&mut self) -> Option<Tick>;
}

/// A simulated clock that advances a fixed interval per tick.
///
/// Used for offline replays and tests: no sleeping, fully deterministic.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use solar_farm_sim::sim::clock::SimulatedClock;
///
/// let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
/// let mut clock = SimulatedClock::new(start, 3600, 3);
/// let mut hours = Vec::new();
///
/// clock.run(|tick| hours.push(tick.at.format("%H").to_string()));
/// assert_eq!(hours, vec!["00", "01", "02"]);
/// ```
pub struct SimulatedClock {
    /// Time of tick 0
    start: DateTime<Utc>,
    /// Seconds between ticks
    interval_secs: u64,
    /// Next tick index
    current: u64,
    /// Total ticks to emit
    total: u64,
}

impl SimulatedClock {
    /// Creates a clock emitting `total` ticks from `start`.
    ///
    /// # Arguments
    ///
    /// * `start` - Timestamp of the first tick
    /// * `interval_secs` - Spacing between ticks
    /// * `total` - Number of ticks before the clock completes
    pub fn new(start: DateTime<Utc>, interval_secs: u64, total: u64) -> Self {
        Self {
            start,
            interval_secs,
            current: 0,
            total,
        }
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The tick before advancing
    /// * `None` - If the clock has emitted all its ticks, or the next
    ///   timestamp is out of chrono's range
    pub fn tick(&mut self) -> Option<Tick> {
        if self.current >= self.total {
            return None;
        }
        let index = self.current;
        let at = self
            .interval_secs
            .checked_mul(index)
            .and_then(|offset| i64::try_from(offset).ok())
            .and_then(Duration::try_seconds)
            .and_then(|offset| self.start.checked_add_signed(offset))?;
        self.current += 1;
        Some(Tick { index, at })
    }

    /// Runs `f` for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(Tick)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }
}

impl Ticker for SimulatedClock {
    fn next_tick(&mut self) -> Option<Tick> {
        self.tick()
    }
}

/// Real-time clock: the first tick fires immediately, later ones after
/// sleeping one interval. Never completes.
pub struct WallClock {
    interval: StdDuration,
    current: u64,
}

impl WallClock {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval: StdDuration::from_secs(interval_secs),
            current: 0,
        }
    }
}

impl Ticker for WallClock {
    fn next_tick(&mut self) -> Option<Tick> {
        if self.current > 0 {
            std::thread::sleep(self.interval);
        }
        let index = self.current;
        self.current += 1;
        Some(Tick {
            index,
            at: Utc::now(),
        })
    }
}
