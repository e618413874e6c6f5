//! In-memory implementation of every store trait.
//!
//! Backs the CLI and the test suite. State lives in a serde-friendly
//! [`Snapshot`] behind an `RwLock`, so a whole school can be loaded from and
//! written back to JSON.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::conflict::ResourceFilter;
use crate::model::{ClassSeries, ClassSession, ClassType, NewSession, SessionStatus, Vacation};
use crate::policy::{PolicyOverride, SchedulingPolicy};
use crate::store::{
    ClassTypeStore, PersonDirectory, PolicyStore, SeriesStore, SessionKey, SessionStore,
    StoreError, StoreResult, VacationStore,
};

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub sessions: Vec<ClassSession>,
    pub series: Vec<ClassSeries>,
    pub vacations: Vec<Vacation>,
    pub class_types: Vec<ClassType>,
    pub global_policy: Option<SchedulingPolicy>,
    pub branch_policies: BTreeMap<String, PolicyOverride>,
    /// Teacher id to person id.
    pub teachers: BTreeMap<String, String>,
    /// Student id to person id.
    pub students: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        Ok(self.read()?.clone())
    }

    pub fn insert_session(&self, session: ClassSession) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.sessions.iter().any(|s| s.id == session.id) {
            return Err(StoreError::UniqueViolation(format!(
                "session id {} already exists",
                session.id
            )));
        }
        state.sessions.push(session);
        Ok(())
    }

    pub fn insert_series(&self, series: ClassSeries) -> StoreResult<()> {
        let mut state = self.write()?;
        state.series.retain(|s| s.id != series.id);
        state.series.push(series);
        Ok(())
    }

    pub fn insert_vacation(&self, vacation: Vacation) -> StoreResult<()> {
        self.write()?.vacations.push(vacation);
        Ok(())
    }

    pub fn insert_class_type(&self, class_type: ClassType) -> StoreResult<()> {
        self.write()?.class_types.push(class_type);
        Ok(())
    }

    pub fn set_global_policy(&self, policy: Option<SchedulingPolicy>) -> StoreResult<()> {
        self.write()?.global_policy = policy;
        Ok(())
    }

    pub fn register_teacher(&self, teacher_id: &str, person_id: &str) -> StoreResult<()> {
        self.write()?
            .teachers
            .insert(teacher_id.to_string(), person_id.to_string());
        Ok(())
    }

    pub fn register_student(&self, student_id: &str, person_id: &str) -> StoreResult<()> {
        self.write()?
            .students
            .insert(student_id.to_string(), person_id.to_string());
        Ok(())
    }

    /// All sessions, cancelled included, ordered by date then start time.
    pub fn sessions(&self) -> StoreResult<Vec<ClassSession>> {
        let mut sessions = self.read()?.sessions.clone();
        sessions.sort_by_key(|s| (s.date, s.start_time, s.end_time));
        Ok(sessions)
    }

    /// Sessions generated from `series_id`, ordered by date.
    pub fn sessions_of_series(&self, series_id: &str) -> StoreResult<Vec<ClassSession>> {
        Ok(self
            .sessions()?
            .into_iter()
            .filter(|s| s.series_id.as_deref() == Some(series_id))
            .collect())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Snapshot>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Snapshot>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn next_session_id(state: &Snapshot) -> String {
        let mut n = state.sessions.len() + 1;
        loop {
            let id = format!("session-{n}");
            if !state.sessions.iter().any(|s| s.id == id) {
                return id;
            }
            n += 1;
        }
    }
}

fn session_not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        entity: "session",
        id: id.to_string(),
    }
}

impl SessionStore for MemoryStore {
    fn session(&self, id: &str) -> StoreResult<Option<ClassSession>> {
        Ok(self.read()?.sessions.iter().find(|s| s.id == id).cloned())
    }

    fn sessions_sharing_resources(
        &self,
        date: NaiveDate,
        filter: &ResourceFilter,
        exclude_id: Option<&str>,
    ) -> StoreResult<Vec<ClassSession>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .read()?
            .sessions
            .iter()
            .filter(|s| !s.is_cancelled && s.date == date)
            .filter(|s| exclude_id != Some(s.id.as_str()))
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn find_identical(&self, key: SessionKey<'_>) -> StoreResult<Option<ClassSession>> {
        Ok(self
            .read()?
            .sessions
            .iter()
            .find(|s| !s.is_cancelled && key.matches(s))
            .cloned())
    }

    fn create_session(&self, session: NewSession) -> StoreResult<ClassSession> {
        let mut state = self.write()?;
        let key = SessionKey::of_new(&session);
        if state.sessions.iter().any(|s| !s.is_cancelled && key.matches(s)) {
            return Err(StoreError::UniqueViolation(format!(
                "session on {} {}-{} already exists for this teacher and student",
                session.date, session.start_time, session.end_time
            )));
        }

        let created = ClassSession {
            id: Self::next_session_id(&state),
            series_id: session.series_id,
            teacher_id: session.teacher_id,
            student_id: session.student_id,
            subject_id: session.subject_id,
            class_type_id: session.class_type_id,
            booth_id: session.booth_id,
            branch_id: session.branch_id,
            date: session.date,
            start_time: session.start_time,
            end_time: session.end_time,
            duration_minutes: session.duration_minutes,
            notes: session.notes,
            status: session.status,
            is_cancelled: false,
            cancelled_at: None,
            cancelled_by: None,
        };
        state.sessions.push(created.clone());
        Ok(created)
    }

    fn update_session(&self, session: &ClassSession) -> StoreResult<()> {
        let mut state = self.write()?;
        let slot = state
            .sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or_else(|| session_not_found(&session.id))?;
        *slot = session.clone();
        Ok(())
    }

    fn set_session_status(&self, id: &str, status: SessionStatus) -> StoreResult<()> {
        let mut state = self.write()?;
        let slot = state
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| session_not_found(id))?;
        slot.status = status;
        Ok(())
    }
}

impl SeriesStore for MemoryStore {
    fn series(&self, id: &str) -> StoreResult<Option<ClassSeries>> {
        Ok(self.read()?.series.iter().find(|s| s.id == id).cloned())
    }

    fn series_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.read()?.series.iter().map(|s| s.id.clone()).collect())
    }

    fn set_last_generated_through(&self, id: &str, date: NaiveDate) -> StoreResult<()> {
        let mut state = self.write()?;
        let series = state
            .series
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "series",
                id: id.to_string(),
            })?;
        series.last_generated_through = Some(date);
        Ok(())
    }

    fn delete_series(&self, id: &str) -> StoreResult<()> {
        self.write()?.series.retain(|s| s.id != id);
        Ok(())
    }
}

impl VacationStore for MemoryStore {
    fn vacations_for_branch(&self, branch_id: Option<&str>) -> StoreResult<Vec<Vacation>> {
        Ok(self
            .read()?
            .vacations
            .iter()
            .filter(|v| v.branch_id.is_none() || v.branch_id.as_deref() == branch_id)
            .cloned()
            .collect())
    }
}

impl PersonDirectory for MemoryStore {
    fn teacher_person(&self, teacher_id: &str) -> StoreResult<Option<String>> {
        Ok(self.read()?.teachers.get(teacher_id).cloned())
    }

    fn student_person(&self, student_id: &str) -> StoreResult<Option<String>> {
        Ok(self.read()?.students.get(student_id).cloned())
    }
}

impl PolicyStore for MemoryStore {
    fn global_policy(&self) -> StoreResult<Option<SchedulingPolicy>> {
        Ok(self.read()?.global_policy)
    }

    fn branch_policy(&self, branch_id: &str) -> StoreResult<Option<PolicyOverride>> {
        Ok(self.read()?.branch_policies.get(branch_id).cloned())
    }

    fn put_branch_policy(&self, branch_id: &str, policy: &PolicyOverride) -> StoreResult<()> {
        self.write()?
            .branch_policies
            .insert(branch_id.to_string(), policy.clone());
        Ok(())
    }
}

impl ClassTypeStore for MemoryStore {
    fn class_type(&self, id: &str) -> StoreResult<Option<ClassType>> {
        Ok(self.read()?.class_types.iter().find(|c| c.id == id).cloned())
    }
}
