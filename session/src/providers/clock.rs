//! Clock abstraction for expiry bookkeeping.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// The in-memory store reads time through this trait so expiry can be
/// tested without sleeping.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
