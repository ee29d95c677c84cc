use crate::utils::epoch_seconds;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of wall-clock time in epoch seconds.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time as fractional seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        epoch_seconds()
    }
}

/// A clock that only moves when told to.
///
/// Lets schedules be exercised without sleeping:
///
/// ```
/// use foldwatch::monitor::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000.0);
/// clock.advance(61.0);
/// assert_eq!(clock.now(), 1_061.0);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    /// Bit pattern of the current `f64` time
    bits: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        // The closure always returns Some, so the update cannot fail
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + seconds).to_bits())
            });
    }

    /// Sets the clock to `now`.
    pub fn set(&self, now: f64) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
