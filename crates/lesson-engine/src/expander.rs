//! Weekly recurrence expansion: a series' weekday set over a date window
//! becomes a list of concrete candidate dates.
//!
//! The weekday set is turned into an RFC 5545 rule
//! (`FREQ=WEEKLY;BYDAY=...;UNTIL=...`) and expanded with the `rrule` crate.
//! Expansion happens at midnight UTC so no DST transition can shift a date.

use chrono::{Datelike, NaiveDate, Utc};
use rrule::RRuleSet;

use crate::error::{Result, SchedulerError};

const BYDAY: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// Every date in `[from, to]` whose weekday (0 = Sunday) is in `weekdays`,
/// ascending.
///
/// # Errors
/// Returns `SchedulerError::InvalidSeries` if a weekday is outside 0-6 or the
/// rule cannot be expanded.
pub fn candidate_dates(weekdays: &[u8], from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>> {
    if let Some(bad) = weekdays.iter().find(|&&d| d > 6) {
        return Err(SchedulerError::InvalidSeries(format!(
            "weekday {bad} is outside 0-6"
        )));
    }
    if weekdays.is_empty() || from > to {
        return Ok(Vec::new());
    }

    let mut days: Vec<u8> = weekdays.to_vec();
    days.sort_unstable();
    days.dedup();
    let byday: Vec<&str> = days.iter().map(|&d| BYDAY[d as usize]).collect();

    let rrule_text = format!(
        "DTSTART;TZID=UTC:{}T000000\nRRULE:FREQ=WEEKLY;BYDAY={};UNTIL={}T000000Z",
        from.format("%Y%m%d"),
        byday.join(","),
        to.format("%Y%m%d"),
    );
    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| SchedulerError::InvalidSeries(format!("{}", e)))?;

    // One instance per day is the most the window can hold.
    let span = (to - from).num_days() + 1;
    let limit = u16::try_from(span).unwrap_or(u16::MAX);

    let mut dates: Vec<NaiveDate> = rrule_set
        .all(limit)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        // DTSTART is not always an occurrence; keep only real weekday matches.
        .filter(|d| *d >= from && *d <= to)
        .filter(|d| days.contains(&(d.weekday().num_days_from_sunday() as u8)))
        .collect();
    dates.dedup();
    Ok(dates)
}
