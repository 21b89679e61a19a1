//! Time abstraction for testability.
//!
//! Record ages and draft ages are measured against wall-clock time, since
//! the remote store reports draft timestamps as wall-clock values. The
//! [`Clock`] trait lets tests move that clock forward deterministically.
//!
//! # Example
//!
//! ```
//! use sendguard::time::{Clock, MockClock};
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//!
//! clock.advance(Duration::from_secs(90));
//!
//! assert_eq!(clock.age_of(start), Duration::from_secs(90));
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Abstraction over wall-clock time.
///
/// In production, use [`SystemClock`]. In tests, use [`MockClock`].
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns how long ago `timestamp` was.
    ///
    /// Timestamps in the future have an age of zero.
    fn age_of(&self, timestamp: DateTime<Utc>) -> Duration {
        (self.now() - timestamp).to_std().unwrap_or(Duration::ZERO)
    }
}

/// System clock that uses real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests.
///
/// Starts at the moment of creation (or a chosen instant) and only moves
/// when [`advance`](Self::advance) or [`set`](Self::set) is called.
#[derive(Debug)]
pub struct MockClock {
    current: Mutex<DateTime<Utc>>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a mock clock frozen at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates a mock clock frozen at `start`.
    #[must_use]
    pub const fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Creates a mock clock that can be shared with a recorder.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances the clock by the given duration.
    ///
    /// Durations that do not fit in a `chrono::TimeDelta` saturate.
    pub fn advance(&self, duration: Duration) {
        let delta = chrono::TimeDelta::from_std(duration).unwrap_or(chrono::TimeDelta::MAX);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = current.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}

/// A boxed clock for dynamic dispatch.
pub type BoxClock = Box<dyn Clock>;

impl Clock for BoxClock {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}
