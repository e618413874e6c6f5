//! Availability of teachers and students for a candidate window.
//!
//! The engine only consumes [`AvailabilityOracle`]. [`WeeklyAvailability`] is a
//! concrete oracle built from each person's regular weekly windows, one-off
//! dated windows and blocked dates.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conflict::TimeWindow;

/// Why one side cannot take the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityConflict {
    /// No availability recorded for that day at all.
    Unavailable,
    /// Availability exists that day but does not cover the window.
    WrongTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideAvailability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<AvailabilityConflict>,
}

impl SideAvailability {
    pub fn available() -> Self {
        Self {
            available: true,
            conflict: None,
        }
    }

    pub fn unavailable(conflict: AvailabilityConflict) -> Self {
        Self {
            available: false,
            conflict: Some(conflict),
        }
    }
}

/// Oracle answer for a teacher/student pair.
///
/// `available` is the overall verdict. An oracle may report it `false` while
/// both sides are individually available (no shared window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub available: bool,
    pub teacher: SideAvailability,
    pub student: SideAvailability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityQuery<'a> {
    pub teacher_person_id: &'a str,
    pub student_person_id: &'a str,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Ask the oracle not to apply its own vacation rules. Vacations are a
    /// separate pre-filter in this engine, so the classifier always sets it.
    pub bypass_vacation: bool,
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Availability lookup failed: {0}")]
    Lookup(String),
}

pub trait AvailabilityOracle {
    fn check(&self, query: &AvailabilityQuery<'_>) -> Result<AvailabilityReport, OracleError>;
}

/// A regular weekly window. `weekday` is 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyWindow {
    pub weekday: u8,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A window valid on one date only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedWindow {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonAvailability {
    pub weekly: Vec<WeeklyWindow>,
    pub dated: Vec<DatedWindow>,
    /// Dates with no availability regardless of the windows above.
    pub blocked: Vec<NaiveDate>,
}

impl PersonAvailability {
    fn windows_on(&self, date: NaiveDate) -> Vec<TimeWindow> {
        if self.blocked.contains(&date) {
            return Vec::new();
        }
        let weekday = date.weekday().num_days_from_sunday() as u8;
        self.weekly
            .iter()
            .filter(|w| w.weekday == weekday)
            .map(|w| TimeWindow::new(w.start, w.end))
            .chain(
                self.dated
                    .iter()
                    .filter(|w| w.date == date)
                    .map(|w| TimeWindow::new(w.start, w.end)),
            )
            .collect()
    }

    /// Availability of this person for `window` on `date`.
    pub fn check(&self, date: NaiveDate, window: &TimeWindow) -> SideAvailability {
        let windows = self.windows_on(date);
        if windows.is_empty() {
            return SideAvailability::unavailable(AvailabilityConflict::Unavailable);
        }
        if merge_windows(windows).iter().any(|w| w.covers(window)) {
            SideAvailability::available()
        } else {
            SideAvailability::unavailable(AvailabilityConflict::WrongTime)
        }
    }
}

/// Merge overlapping or touching windows into a sorted, disjoint list.
pub fn merge_windows(mut windows: Vec<TimeWindow>) -> Vec<TimeWindow> {
    windows.retain(|w| w.start < w.end);
    windows.sort_by_key(|w| (w.start, w.end));

    let mut merged: Vec<TimeWindow> = Vec::new();
    for window in windows {
        if let Some(last) = merged.last_mut() {
            if window.start <= last.end {
                // Overlapping or adjacent: extend the current window.
                last.end = last.end.max(window.end);
                continue;
            }
        }
        merged.push(window);
    }
    merged
}

/// Oracle over per-person weekly availability, keyed by person id.
///
/// A person with no record at all is `UNAVAILABLE` on every date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyAvailability {
    people: BTreeMap<String, PersonAvailability>,
}

impl WeeklyAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, person_id: impl Into<String>, availability: PersonAvailability) {
        self.people.insert(person_id.into(), availability);
    }

    pub fn with_person(mut self, person_id: impl Into<String>, availability: PersonAvailability) -> Self {
        self.insert(person_id, availability);
        self
    }

    fn side(&self, person_id: &str, date: NaiveDate, window: &TimeWindow) -> SideAvailability {
        match self.people.get(person_id) {
            Some(person) => person.check(date, window),
            None => SideAvailability::unavailable(AvailabilityConflict::Unavailable),
        }
    }
}

impl AvailabilityOracle for WeeklyAvailability {
    fn check(&self, query: &AvailabilityQuery<'_>) -> Result<AvailabilityReport, OracleError> {
        let window = TimeWindow::new(query.start_time, query.end_time);
        let teacher = self.side(query.teacher_person_id, query.date, &window);
        let student = self.side(query.student_person_id, query.date, &window);
        Ok(AvailabilityReport {
            available: teacher.available && student.available,
            teacher,
            student,
        })
    }
}
