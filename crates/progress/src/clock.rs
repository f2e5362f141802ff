use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use time::{Date, OffsetDateTime, UtcOffset};

/// Source of the current time.
///
/// Injected wherever freshness or "the current year" matters, so that cache
/// behaviour can be tested without waiting on real timers.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Wall-clock time at a fixed UTC offset.
///
/// The offset is fixed when the clock is made: `time` refuses to read the
/// local offset once a process has more than one thread, so
/// [`SystemClock::local`] must run before the async runtime starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    offset: UtcOffset,
}
impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// The machine's local offset, or `None` if it cannot be determined.
    pub fn local() -> Option<Self> {
        UtcOffset::current_local_offset().ok().map(Self::new)
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}
impl Default for SystemClock {
    fn default() -> Self {
        Self::new(UtcOffset::UTC)
    }
}
impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}
impl ManualClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}
impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
