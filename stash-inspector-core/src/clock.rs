//! Time source abstraction used when classifying a whole report.

use chrono::{DateTime, Utc};

/// Supplies the instant reports are evaluated against.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
