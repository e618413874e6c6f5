//! Source of "today" for series advancement.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SchedulerError};

pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, read in the school's timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    /// # Errors
    /// Returns `SchedulerError::InvalidConfig` if `timezone` is not a valid IANA
    /// identifier.
    pub fn new(timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| SchedulerError::InvalidConfig(format!("unknown timezone: {timezone}")))?;
        Ok(Self { tz })
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }
}

/// A clock stuck on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
