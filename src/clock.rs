//! Compilation clock
//!
//! Every timestamp in a trace is a nanosecond offset from one reference
//! instant captured when the compilation starts. The reference is also
//! recorded as wall-clock time so the output document can carry an absolute
//! `beginningOfTime`.
//!
//! Two implementations exist:
//! - [`MonotonicClock`] reads `std::time::Instant` and is what a live host uses.
//! - [`ManualClock`] is advanced explicitly, for replaying recorded
//!   notification streams and for deterministic tests.
//!
//! # Example
//!
//! ```
//! use compile_trace::clock::{Clock, ManualClock};
//!
//! let clock = ManualClock::with_epoch_us(1_700_000_000_000_000);
//! clock.advance(2_500);
//! assert_eq!(clock.now(), 2_500);
//!
//! // Never moves backwards
//! clock.set(1_000);
//! assert_eq!(clock.now(), 2_500);
//! ```

use crate::event::Timestamp;
use std::cell::Cell;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of compilation-relative timestamps
///
/// Implementations must be monotonic non-decreasing within a process.
pub trait Clock {
    /// Nanoseconds elapsed since the reference instant
    fn now(&self) -> Timestamp;

    /// Reference instant as microseconds since the Unix epoch
    fn beginning_of_time_us(&self) -> i64;
}

fn wall_clock_us(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Real clock anchored at construction time
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
    wall_start: SystemTime,
}

impl MonotonicClock {
    /// Capture the reference instant now
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            wall_start: SystemTime::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        i64::try_from(self.start.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }

    fn beginning_of_time_us(&self) -> i64 {
        wall_clock_us(self.wall_start)
    }
}

/// Explicitly driven clock
///
/// Interior mutability via `Cell`: the engine is single-threaded and the
/// clock is read through shared references.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Timestamp>,
    epoch_us: i64,
}

impl ManualClock {
    /// Start at offset 0, anchored at the current wall-clock time
    pub fn new() -> Self {
        Self::with_epoch_us(wall_clock_us(SystemTime::now()))
    }

    /// Start at offset 0 with a fixed wall-clock anchor
    pub fn with_epoch_us(epoch_us: i64) -> Self {
        Self {
            now: Cell::new(0),
            epoch_us,
        }
    }

    /// Move to `ns`; earlier values are ignored
    pub fn set(&self, ns: Timestamp) {
        if ns > self.now.get() {
            self.now.set(ns);
        }
    }

    /// Move forward by `delta_ns`
    pub fn advance(&self, delta_ns: i64) {
        self.set(self.now.get().saturating_add(delta_ns));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }

    fn beginning_of_time_us(&self) -> i64 {
        self.epoch_us
    }
}
