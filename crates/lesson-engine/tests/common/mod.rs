//! Shared fixtures for lesson-engine integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use lesson_engine::availability::{
    AvailabilityOracle, AvailabilityQuery, AvailabilityReport, OracleError, SideAvailability,
};
use lesson_engine::conflict::ResourceFilter;
use lesson_engine::memory::MemoryStore;
use lesson_engine::model::{ClassSeries, ClassSession, ClassType, NewSession, SessionStatus, Vacation};
use lesson_engine::policy::{PolicyOverride, SchedulingPolicy};
use lesson_engine::store::{
    ClassTypeStore, PersonDirectory, PolicyStore, SeriesStore, SessionKey, SessionStore,
    StoreError, StoreResult, VacationStore,
};
use lesson_engine::{Engine, FixedClock};

// ── Dates and times ─────────────────────────────────────────────────────────

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

// ── Records ─────────────────────────────────────────────────────────────────

/// A confirmed, uncancelled session with no resources assigned.
pub fn session(id: &str, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> ClassSession {
    ClassSession {
        id: id.to_string(),
        series_id: None,
        teacher_id: None,
        student_id: None,
        subject_id: None,
        class_type_id: None,
        booth_id: None,
        branch_id: None,
        date,
        start_time: start,
        end_time: end,
        duration_minutes: (end - start).num_minutes() as u32,
        notes: None,
        status: SessionStatus::Confirmed,
        is_cancelled: false,
        cancelled_at: None,
        cancelled_by: None,
    }
}

pub fn with_teacher(mut s: ClassSession, teacher: &str) -> ClassSession {
    s.teacher_id = Some(teacher.to_string());
    s
}

pub fn with_student(mut s: ClassSession, student: &str) -> ClassSession {
    s.student_id = Some(student.to_string());
    s
}

pub fn with_booth(mut s: ClassSession, booth: &str) -> ClassSession {
    s.booth_id = Some(booth.to_string());
    s
}

/// Weekly series at 16:00-17:00 with teacher `t1`, student `s1`, booth `b1`
/// in branch `north`, never generated.
pub fn series(id: &str, weekdays: &[u8], start_date: NaiveDate, end_date: Option<NaiveDate>) -> ClassSeries {
    ClassSeries {
        id: id.to_string(),
        start_date,
        end_date,
        weekdays: weekdays.to_vec(),
        start_time: t(16, 0),
        end_time: t(17, 0),
        duration_minutes: 60,
        teacher_id: Some("t1".to_string()),
        student_id: Some("s1".to_string()),
        subject_id: Some("math".to_string()),
        class_type_id: None,
        booth_id: Some("b1".to_string()),
        branch_id: Some("north".to_string()),
        notes: None,
        last_generated_through: None,
        policy_override: None,
    }
}

pub fn vacation(id: &str, start: NaiveDate, end: NaiveDate, is_recurring: bool) -> Vacation {
    Vacation {
        id: id.to_string(),
        branch_id: Some("north".to_string()),
        name: None,
        start_date: start,
        end_date: end,
        is_recurring,
    }
}

// ── Oracles ─────────────────────────────────────────────────────────────────

/// Oracle that returns a fixed report, or fails, and counts its calls.
pub struct StubOracle {
    report: Option<AvailabilityReport>,
    pub calls: Cell<usize>,
}

impl StubOracle {
    pub fn available() -> Self {
        Self::reporting(SideAvailability::available(), SideAvailability::available())
    }

    pub fn reporting(teacher: SideAvailability, student: SideAvailability) -> Self {
        Self {
            report: Some(AvailabilityReport {
                available: teacher.available && student.available,
                teacher,
                student,
            }),
            calls: Cell::new(0),
        }
    }

    pub fn unattributed() -> Self {
        Self {
            report: Some(AvailabilityReport {
                available: false,
                teacher: SideAvailability::available(),
                student: SideAvailability::available(),
            }),
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            report: None,
            calls: Cell::new(0),
        }
    }
}

impl AvailabilityOracle for StubOracle {
    fn check(&self, _query: &AvailabilityQuery<'_>) -> Result<AvailabilityReport, OracleError> {
        self.calls.set(self.calls.get() + 1);
        self.report
            .ok_or_else(|| OracleError::Lookup("availability service unreachable".to_string()))
    }
}

// ── Store wrapper ───────────────────────────────────────────────────────────

/// How `CountingStore::create_session` should fail, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateFailure {
    UniqueViolation,
    Backend,
}

/// `MemoryStore` wrapper that counts status writes and can be told to fail
/// reads of particular sessions, every session create, or person lookups.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub status_writes: Cell<usize>,
    pub failing_sessions: RefCell<HashSet<String>>,
    pub create_failure: Cell<Option<CreateFailure>>,
    pub person_lookups_fail: Cell<bool>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads_of(&self, id: &str) {
        self.failing_sessions.borrow_mut().insert(id.to_string());
    }

    pub fn fail_creates(&self, failure: CreateFailure) {
        self.create_failure.set(Some(failure));
    }

    pub fn fail_person_lookups(&self) {
        self.person_lookups_fail.set(true);
    }
}

impl SessionStore for CountingStore {
    fn session(&self, id: &str) -> StoreResult<Option<ClassSession>> {
        if self.failing_sessions.borrow().contains(id) {
            return Err(StoreError::Backend(format!("read of {id} failed")));
        }
        self.inner.session(id)
    }

    fn sessions_sharing_resources(
        &self,
        date: NaiveDate,
        filter: &ResourceFilter,
        exclude_id: Option<&str>,
    ) -> StoreResult<Vec<ClassSession>> {
        self.inner.sessions_sharing_resources(date, filter, exclude_id)
    }

    fn find_identical(&self, key: SessionKey<'_>) -> StoreResult<Option<ClassSession>> {
        self.inner.find_identical(key)
    }

    fn create_session(&self, session: NewSession) -> StoreResult<ClassSession> {
        match self.create_failure.get() {
            Some(CreateFailure::UniqueViolation) => Err(StoreError::UniqueViolation(format!(
                "session on {} already exists",
                session.date
            ))),
            Some(CreateFailure::Backend) => Err(StoreError::Backend("insert failed".to_string())),
            None => self.inner.create_session(session),
        }
    }

    fn update_session(&self, session: &ClassSession) -> StoreResult<()> {
        self.inner.update_session(session)
    }

    fn set_session_status(&self, id: &str, status: SessionStatus) -> StoreResult<()> {
        self.status_writes.set(self.status_writes.get() + 1);
        self.inner.set_session_status(id, status)
    }
}

impl SeriesStore for CountingStore {
    fn series(&self, id: &str) -> StoreResult<Option<ClassSeries>> {
        self.inner.series(id)
    }

    fn series_ids(&self) -> StoreResult<Vec<String>> {
        self.inner.series_ids()
    }

    fn set_last_generated_through(&self, id: &str, date: NaiveDate) -> StoreResult<()> {
        self.inner.set_last_generated_through(id, date)
    }

    fn delete_series(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_series(id)
    }
}

impl VacationStore for CountingStore {
    fn vacations_for_branch(&self, branch_id: Option<&str>) -> StoreResult<Vec<Vacation>> {
        self.inner.vacations_for_branch(branch_id)
    }
}

impl PersonDirectory for CountingStore {
    fn teacher_person(&self, teacher_id: &str) -> StoreResult<Option<String>> {
        if self.person_lookups_fail.get() {
            return Err(StoreError::Backend("directory unreachable".to_string()));
        }
        self.inner.teacher_person(teacher_id)
    }

    fn student_person(&self, student_id: &str) -> StoreResult<Option<String>> {
        if self.person_lookups_fail.get() {
            return Err(StoreError::Backend("directory unreachable".to_string()));
        }
        self.inner.student_person(student_id)
    }
}

impl PolicyStore for CountingStore {
    fn global_policy(&self) -> StoreResult<Option<SchedulingPolicy>> {
        self.inner.global_policy()
    }

    fn branch_policy(&self, branch_id: &str) -> StoreResult<Option<PolicyOverride>> {
        self.inner.branch_policy(branch_id)
    }

    fn put_branch_policy(&self, branch_id: &str, policy: &PolicyOverride) -> StoreResult<()> {
        self.inner.put_branch_policy(branch_id, policy)
    }
}

impl ClassTypeStore for CountingStore {
    fn class_type(&self, id: &str) -> StoreResult<Option<ClassType>> {
        self.inner.class_type(id)
    }
}

// ── Engines ─────────────────────────────────────────────────────────────────

pub type TestEngine = Engine<MemoryStore, StubOracle, FixedClock>;

/// Engine over an empty in-memory store with teacher `t1` → person `p-t1`
/// and student `s1` → person `p-s1` registered.
pub fn engine_with(oracle: StubOracle, today: NaiveDate) -> TestEngine {
    let store = MemoryStore::new();
    store.register_teacher("t1", "p-t1").unwrap();
    store.register_student("s1", "p-s1").unwrap();
    Engine::new(store, oracle, FixedClock(today))
}

pub fn engine() -> TestEngine {
    engine_with(StubOracle::available(), d(2025, 1, 1))
}

pub fn status_of<O, C>(engine: &Engine<MemoryStore, O, C>, id: &str) -> SessionStatus
where
    O: AvailabilityOracle,
    C: lesson_engine::Clock,
{
    engine.store().session(id).unwrap().unwrap().status
}
