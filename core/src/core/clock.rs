use std::time::{Duration, Instant};

/// Nanoseconds per T-state at the reference 4 MHz clock.
pub const NS_PER_T_STATE: u64 = 250;

/// Time source for the pacer.
///
/// Split out so tests can drive the pacer with a scripted clock instead of
/// sleeping on the host.
pub trait Clock {
    /// Monotonic nanoseconds since an arbitrary origin.
    fn now_ns(&mut self) -> u64;

    /// Block for the given duration.
    fn sleep_ns(&mut self, ns: u64);
}

/// Monotonic wall-clock backed by `std::time::Instant`.
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_ns(&mut self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn sleep_ns(&mut self, ns: u64) {
        std::thread::sleep(Duration::from_nanos(ns));
    }
}

/// Throttles execution toward the 4 MHz reference clock.
///
/// Each credited T-state pushes a deadline forward by 250 ns; when the host
/// runs ahead of the deadline the pacer sleeps the difference. When the host
/// is behind schedule the sleep is skipped and the deadline resynchronizes
/// to now, so a slow stretch never accumulates debt.
///
/// Pacing is off by default: test suites and batch hosts drive the CPU as
/// fast as it will go.
pub struct Pacer {
    clock: Box<dyn Clock>,
    enabled: bool,
    deadline_ns: u64,
}

impl Pacer {
    pub fn new() -> Self {
        Self::with_clock(Box::new(WallClock::new()))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            enabled: false,
            deadline_ns: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Turn real-time pacing on or off. Enabling resynchronizes the
    /// deadline so past execution is not billed retroactively.
    pub fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
        if on {
            self.deadline_ns = self.clock.now_ns();
        }
    }

    /// Credit `t` T-states of execution and sleep up to the deadline.
    pub fn credit(&mut self, t: u32) {
        if !self.enabled {
            return;
        }
        self.deadline_ns += t as u64 * NS_PER_T_STATE;
        let now = self.clock.now_ns();
        if now < self.deadline_ns {
            self.clock.sleep_ns(self.deadline_ns - now);
        } else {
            self.deadline_ns = now;
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}
