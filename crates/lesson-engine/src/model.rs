//! Domain records: concrete class sessions, recurring series blueprints,
//! placements, class types and vacations.
//!
//! Times of day are `NaiveTime` and never carry a date, so two sessions on the
//! same calendar date compare their windows independent of that date.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::TimeWindow;
use crate::policy::PolicyOverride;

/// Scheduling status of a concrete session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Confirmed,
    Conflicted,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Confirmed => f.write_str("CONFIRMED"),
            SessionStatus::Conflicted => f.write_str("CONFLICTED"),
        }
    }
}

/// A scheduled occurrence of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSession {
    pub id: String,
    #[serde(default)]
    pub series_id: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub class_type_id: Option<String>,
    #[serde(default)]
    pub booth_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_by: Option<String>,
}

impl ClassSession {
    /// The placement this session currently occupies.
    pub fn placement(&self) -> SessionPlacement {
        SessionPlacement {
            session_id: Some(self.id.clone()),
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            teacher_id: self.teacher_id.clone(),
            student_id: self.student_id.clone(),
            booth_id: self.booth_id.clone(),
            branch_id: self.branch_id.clone(),
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }
}

/// Field set for a session that does not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub series_id: Option<String>,
    pub teacher_id: Option<String>,
    pub student_id: Option<String>,
    pub subject_id: Option<String>,
    pub class_type_id: Option<String>,
    pub booth_id: Option<String>,
    pub branch_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: u32,
    pub notes: Option<String>,
    pub status: SessionStatus,
}

/// Where a session is, or would be: date, window and assigned resources.
///
/// `session_id` names the session occupying the placement, if it exists, so
/// neighbor searches can leave it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPlacement {
    #[serde(default)]
    pub session_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub booth_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

impl SessionPlacement {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            session_id: None,
            date,
            start_time,
            end_time,
            teacher_id: None,
            student_id: None,
            booth_id: None,
            branch_id: None,
        }
    }

    pub fn with_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_teacher(mut self, id: impl Into<String>) -> Self {
        self.teacher_id = Some(id.into());
        self
    }

    pub fn with_student(mut self, id: impl Into<String>) -> Self {
        self.student_id = Some(id.into());
        self
    }

    pub fn with_booth(mut self, id: impl Into<String>) -> Self {
        self.booth_id = Some(id.into());
        self
    }

    pub fn with_branch(mut self, id: impl Into<String>) -> Self {
        self.branch_id = Some(id.into());
        self
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Whether any of teacher, student or booth is assigned.
    pub fn has_resources(&self) -> bool {
        self.teacher_id.is_some() || self.student_id.is_some() || self.booth_id.is_some()
    }
}

/// Recurring-generation template for concrete sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSeries {
    pub id: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Weekdays on which sessions occur, 0 = Sunday through 6 = Saturday.
    pub weekdays: Vec<u8>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub class_type_id: Option<String>,
    #[serde(default)]
    pub booth_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Latest date through which concrete sessions have been materialized.
    #[serde(default)]
    pub last_generated_through: Option<NaiveDate>,
    #[serde(default)]
    pub policy_override: Option<PolicyOverride>,
}

impl ClassSeries {
    /// The placement a session generated on `date` would occupy.
    pub fn placement_on(&self, date: NaiveDate) -> SessionPlacement {
        SessionPlacement {
            session_id: None,
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            teacher_id: self.teacher_id.clone(),
            student_id: self.student_id.clone(),
            booth_id: self.booth_id.clone(),
            branch_id: self.branch_id.clone(),
        }
    }

    /// The session a generation run would create on `date`.
    pub fn session_on(&self, date: NaiveDate, status: SessionStatus) -> NewSession {
        NewSession {
            series_id: Some(self.id.clone()),
            teacher_id: self.teacher_id.clone(),
            student_id: self.student_id.clone(),
            subject_id: self.subject_id.clone(),
            class_type_id: self.class_type_id.clone(),
            booth_id: self.booth_id.clone(),
            branch_id: self.branch_id.clone(),
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            notes: self.notes.clone(),
            status,
        }
    }
}

/// A node in the class-type hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// A branch-scoped closure during which nothing may be scheduled.
///
/// `branch_id = None` applies school-wide. When `is_recurring` is set only the
/// month/day of `start_date` and `end_date` matter and the range repeats every
/// year, wrapping across New Year when the end precedes the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacation {
    pub id: String,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_recurring: bool,
}
