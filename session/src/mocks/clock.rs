//! Mock clock for testing.

use crate::providers::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Manually advanced clock.
///
/// Clones share the same time, so a test can keep one handle and hand the
/// other to a store.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a clock frozen at the current wall time.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a clock frozen at `time`.
    #[must_use]
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(time)),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
