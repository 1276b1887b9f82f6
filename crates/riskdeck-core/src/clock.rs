//! Time sources for cache expiry and the exchange calendar.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use time::{Date, OffsetDateTime, UtcOffset};

/// Monotonic and wall-clock time, injectable so TTL and date logic can be tested.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for cache ages.
    fn now(&self) -> Instant;

    /// Current wall-clock time in UTC.
    fn utc_now(&self) -> OffsetDateTime;

    /// Calendar date at the given UTC offset.
    fn today_at(&self, offset: UtcOffset) -> Date {
        self.utc_now().to_offset(offset).date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug)]
struct ManualState {
    elapsed: Duration,
    wall: OffsetDateTime,
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

impl ManualClock {
    pub fn starting_at(wall: OffsetDateTime) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                wall,
            }),
        }
    }

    /// Advance both the monotonic and the wall clock.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.elapsed += by;
            state.wall += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = self
            .state
            .lock()
            .map(|state| state.elapsed)
            .unwrap_or_default();
        self.origin + elapsed
    }

    fn utc_now(&self) -> OffsetDateTime {
        self.state
            .lock()
            .map(|state| state.wall)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}
