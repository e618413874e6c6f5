//! Persistence seams consumed by the engine.
//!
//! The engine owns no storage technology. Each trait below is one collaborator
//! from the surrounding application; [`SchedulingStore`] bundles them so the
//! engine can be generic over a single store type. [`crate::memory::MemoryStore`]
//! implements all of them in memory.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::conflict::ResourceFilter;
use crate::model::{ClassSeries, ClassSession, ClassType, NewSession, SessionStatus, Vacation};
use crate::policy::{PolicyOverride, SchedulingPolicy};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint rejected a write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Identity of a generated session for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKey<'a> {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub teacher_id: Option<&'a str>,
    pub student_id: Option<&'a str>,
}

impl<'a> SessionKey<'a> {
    pub fn of_new(session: &'a NewSession) -> Self {
        Self {
            date: session.date,
            start_time: session.start_time,
            end_time: session.end_time,
            teacher_id: session.teacher_id.as_deref(),
            student_id: session.student_id.as_deref(),
        }
    }

    pub fn matches(&self, session: &ClassSession) -> bool {
        self.date == session.date
            && self.start_time == session.start_time
            && self.end_time == session.end_time
            && self.teacher_id == session.teacher_id.as_deref()
            && self.student_id == session.student_id.as_deref()
    }
}

pub trait SessionStore {
    fn session(&self, id: &str) -> StoreResult<Option<ClassSession>>;

    /// Non-cancelled sessions on `date` that share at least one resource with
    /// `filter`, leaving out `exclude_id`. An empty filter matches nothing.
    fn sessions_sharing_resources(
        &self,
        date: NaiveDate,
        filter: &ResourceFilter,
        exclude_id: Option<&str>,
    ) -> StoreResult<Vec<ClassSession>>;

    /// A non-cancelled session with the same date, window, teacher and student.
    fn find_identical(&self, key: SessionKey<'_>) -> StoreResult<Option<ClassSession>>;

    /// Insert a session. Fails with [`StoreError::UniqueViolation`] when a
    /// non-cancelled session with the same [`SessionKey`] exists.
    fn create_session(&self, session: NewSession) -> StoreResult<ClassSession>;

    /// Replace every mutable field of an existing session.
    fn update_session(&self, session: &ClassSession) -> StoreResult<()>;

    fn set_session_status(&self, id: &str, status: SessionStatus) -> StoreResult<()>;
}

pub trait SeriesStore {
    fn series(&self, id: &str) -> StoreResult<Option<ClassSeries>>;

    fn series_ids(&self) -> StoreResult<Vec<String>>;

    fn set_last_generated_through(&self, id: &str, date: NaiveDate) -> StoreResult<()>;

    fn delete_series(&self, id: &str) -> StoreResult<()>;
}

pub trait VacationStore {
    /// Vacations for `branch_id` plus school-wide ones.
    fn vacations_for_branch(&self, branch_id: Option<&str>) -> StoreResult<Vec<Vacation>>;
}

/// Resolves teacher/student business ids to the person identity the
/// availability oracle knows.
pub trait PersonDirectory {
    fn teacher_person(&self, teacher_id: &str) -> StoreResult<Option<String>>;

    fn student_person(&self, student_id: &str) -> StoreResult<Option<String>>;
}

pub trait PolicyStore {
    fn global_policy(&self) -> StoreResult<Option<SchedulingPolicy>>;

    fn branch_policy(&self, branch_id: &str) -> StoreResult<Option<PolicyOverride>>;

    fn put_branch_policy(&self, branch_id: &str, policy: &PolicyOverride) -> StoreResult<()>;
}

pub trait ClassTypeStore {
    fn class_type(&self, id: &str) -> StoreResult<Option<ClassType>>;
}

/// Everything the engine reads and writes.
pub trait SchedulingStore:
    SessionStore + SeriesStore + VacationStore + PersonDirectory + PolicyStore + ClassTypeStore
{
}

impl<T> SchedulingStore for T where
    T: SessionStore + SeriesStore + VacationStore + PersonDirectory + PolicyStore + ClassTypeStore
{
}
