//! Clock Port (Driven Port)
//!
//! Source of exchange-local time for session checks and date defaults.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::domain::market_calendar;

/// Exchange-local wall clock.
pub trait Clock: Send + Sync {
    /// Current instant with the exchange offset applied.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current exchange-local date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Whether the regular session is open right now.
    fn is_market_open(&self) -> bool {
        market_calendar::is_market_open(self.now())
    }
}

/// Clock pinned to US Eastern time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        market_calendar::us_eastern_now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
