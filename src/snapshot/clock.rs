//! Time sources for snapshot timing and file names.
//!
//! Intervals are measured on a monotonic clock; local wall time is only
//! used to name the files, so a wall clock stepping back (end of daylight
//! saving, NTP correction) never stalls the snapshot timer.

use chrono::{Local, NaiveDateTime, TimeDelta};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of local wall-clock time and monotonic elapsed time.
pub trait Clock: Send {
    /// Local wall-clock time, used for snapshot file names.
    fn now(&self) -> NaiveDateTime;

    /// Monotonic time since the clock was created.
    fn elapsed(&self) -> Duration;
}

/// The system's local time and `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose elapsed time starts now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug)]
struct ManualTime {
    wall: NaiveDateTime,
    elapsed: Duration,
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: Arc<Mutex<ManualTime>>,
}

impl ManualClock {
    /// Creates a clock showing `start` with no elapsed time.
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(ManualTime {
                wall: start,
                elapsed: Duration::ZERO,
            })),
        }
    }

    /// Moves both the wall clock and elapsed time forward. Negative
    /// deltas are ignored.
    pub fn advance(&self, by: TimeDelta) {
        let Ok(step) = by.to_std() else {
            return;
        };
        let mut time = self.time.lock();
        time.wall += by;
        time.elapsed += step;
    }

    /// Jumps the wall clock to `at` without any time elapsing.
    pub fn set(&self, at: NaiveDateTime) {
        self.time.lock().wall = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.time.lock().wall
    }

    fn elapsed(&self) -> Duration {
        self.time.lock().elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(noon());
        let observer = clock.clone();

        clock.advance(TimeDelta::milliseconds(1500));
        assert_eq!(observer.now() - noon(), TimeDelta::milliseconds(1500));
        assert_eq!(observer.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn test_setting_wall_time_does_not_move_elapsed() {
        let clock = ManualClock::new(noon());
        clock.advance(TimeDelta::seconds(2));

        clock.set(noon() - TimeDelta::hours(1));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));

        clock.advance(TimeDelta::seconds(-10));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }
}
