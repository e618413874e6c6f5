//! Vacation date matching.

use chrono::{Datelike, NaiveDate};

use crate::model::Vacation;

impl Vacation {
    /// Whether `date` falls inside this vacation, both ends inclusive.
    pub fn covers(&self, date: NaiveDate) -> bool {
        if !self.is_recurring {
            return self.start_date <= date && date <= self.end_date;
        }

        let day = (date.month(), date.day());
        let start = (self.start_date.month(), self.start_date.day());
        let end = (self.end_date.month(), self.end_date.day());
        if start <= end {
            start <= day && day <= end
        } else {
            // Wraps across New Year, e.g. Dec 25 - Jan 3.
            day >= start || day <= end
        }
    }
}

pub fn is_vacation_date(vacations: &[Vacation], date: NaiveDate) -> bool {
    vacations.iter().any(|v| v.covers(date))
}
