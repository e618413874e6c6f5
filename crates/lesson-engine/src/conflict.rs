//! Detect resource double-bookings between a placement and existing sessions.
//!
//! Windows are half-open: `[start, end)`. Two windows overlap iff
//! `a.start < b.end && b.start < a.end`, so a session ending at 10:00 and one
//! starting at 10:00 are NOT in conflict.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::model::{ClassSession, SessionPlacement};

/// A time-of-day window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Minutes shared by both windows, 0 when they do not overlap.
    pub fn overlap_minutes(&self, other: &TimeWindow) -> i64 {
        if !self.overlaps(other) {
            return 0;
        }
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (end - start).num_minutes()
    }

    /// Whether `other` lies entirely inside this window.
    pub fn covers(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Closed set of reasons a placement may be problematic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    TeacherConflict,
    StudentConflict,
    BoothConflict,
    TeacherUnavailable,
    StudentUnavailable,
    TeacherWrongTime,
    StudentWrongTime,
    NoSharedAvailability,
    /// Always an unconditional skip; never reaches the status decision.
    Vacation,
}

impl ConflictType {
    pub const HARD: [ConflictType; 3] = [
        ConflictType::TeacherConflict,
        ConflictType::StudentConflict,
        ConflictType::BoothConflict,
    ];

    pub const SOFT: [ConflictType; 5] = [
        ConflictType::TeacherUnavailable,
        ConflictType::StudentUnavailable,
        ConflictType::TeacherWrongTime,
        ConflictType::StudentWrongTime,
        ConflictType::NoSharedAvailability,
    ];

    /// Resource double-bookings. These always force `CONFLICTED`.
    pub fn is_hard(self) -> bool {
        Self::HARD.contains(&self)
    }

    pub fn is_soft(self) -> bool {
        Self::SOFT.contains(&self)
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            ConflictType::TeacherConflict => "TEACHER_CONFLICT",
            ConflictType::StudentConflict => "STUDENT_CONFLICT",
            ConflictType::BoothConflict => "BOOTH_CONFLICT",
            ConflictType::TeacherUnavailable => "TEACHER_UNAVAILABLE",
            ConflictType::StudentUnavailable => "STUDENT_UNAVAILABLE",
            ConflictType::TeacherWrongTime => "TEACHER_WRONG_TIME",
            ConflictType::StudentWrongTime => "STUDENT_WRONG_TIME",
            ConflictType::NoSharedAvailability => "NO_SHARED_AVAILABILITY",
            ConflictType::Vacation => "VACATION",
        };
        f.write_str(tag)
    }
}

/// One detected problem with a placement. Produced fresh on every
/// classification, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReason {
    #[serde(rename = "type")]
    pub kind: ConflictType,
    /// The existing session that is double-booked against, for hard reasons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_minutes: Option<i64>,
}

impl ConflictReason {
    pub fn new(kind: ConflictType) -> Self {
        Self {
            kind,
            conflicting_session_id: None,
            overlap_minutes: None,
        }
    }

    fn double_booking(kind: ConflictType, other: &ClassSession, overlap_minutes: i64) -> Self {
        Self {
            kind,
            conflicting_session_id: Some(other.id.clone()),
            overlap_minutes: Some(overlap_minutes),
        }
    }
}

/// Predicate matching sessions that share at least one of teacher, student or
/// booth. A filter with no resources set is valid and never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceFilter {
    pub teacher_id: Option<String>,
    pub student_id: Option<String>,
    pub booth_id: Option<String>,
}

/// Build the teacher-OR-student-OR-booth predicate for a resource set.
pub fn build_resource_intersection_filter(
    teacher_id: Option<&str>,
    student_id: Option<&str>,
    booth_id: Option<&str>,
) -> ResourceFilter {
    ResourceFilter {
        teacher_id: teacher_id.map(str::to_string),
        student_id: student_id.map(str::to_string),
        booth_id: booth_id.map(str::to_string),
    }
}

impl ResourceFilter {
    pub fn for_placement(placement: &SessionPlacement) -> Self {
        build_resource_intersection_filter(
            placement.teacher_id.as_deref(),
            placement.student_id.as_deref(),
            placement.booth_id.as_deref(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.teacher_id.is_none() && self.student_id.is_none() && self.booth_id.is_none()
    }

    pub fn matches(&self, session: &ClassSession) -> bool {
        !self.shared_resources(session).is_empty()
    }

    /// The hard conflict type for every resource `session` shares with this
    /// filter, in teacher, student, booth order.
    pub fn shared_resources(&self, session: &ClassSession) -> Vec<ConflictType> {
        let pairs = [
            (&self.teacher_id, &session.teacher_id, ConflictType::TeacherConflict),
            (&self.student_id, &session.student_id, ConflictType::StudentConflict),
            (&self.booth_id, &session.booth_id, ConflictType::BoothConflict),
        ];
        pairs
            .into_iter()
            .filter_map(|(mine, theirs, kind)| match (mine, theirs) {
                (Some(a), Some(b)) if a == b => Some(kind),
                _ => None,
            })
            .collect()
    }
}

/// Sessions in `candidates` that share a resource with `placement` and whose
/// window overlaps it on the same date.
///
/// Cancelled sessions and the session named by `exclude_id` never count.
/// `candidates` may be any superset of the relevant sessions.
pub fn overlapping_sessions<'a>(
    placement: &SessionPlacement,
    candidates: &'a [ClassSession],
    exclude_id: Option<&str>,
) -> Vec<&'a ClassSession> {
    let filter = ResourceFilter::for_placement(placement);
    if filter.is_empty() {
        return Vec::new();
    }
    let window = placement.window();

    candidates
        .iter()
        .filter(|s| !s.is_cancelled)
        .filter(|s| s.date == placement.date)
        .filter(|s| exclude_id != Some(s.id.as_str()))
        .filter(|s| filter.matches(s))
        .filter(|s| window.overlaps(&s.window()))
        .collect()
}

/// Hard conflict reasons for `placement` against `candidates`.
///
/// Emits one reason per shared resource per overlapping session, so a single
/// neighbor that shares both teacher and booth yields two reasons.
pub fn find_resource_conflicts(
    placement: &SessionPlacement,
    candidates: &[ClassSession],
    exclude_id: Option<&str>,
) -> Vec<ConflictReason> {
    let filter = ResourceFilter::for_placement(placement);
    let window = placement.window();

    overlapping_sessions(placement, candidates, exclude_id)
        .into_iter()
        .flat_map(|other| {
            let overlap = window.overlap_minutes(&other.window());
            filter
                .shared_resources(other)
                .into_iter()
                .map(move |kind| ConflictReason::double_booking(kind, other, overlap))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn existing(
        id: &str,
        teacher: &str,
        student: &str,
        booth: &str,
        start: NaiveTime,
        end: NaiveTime,
    ) -> ClassSession {
        ClassSession {
            id: id.to_string(),
            series_id: None,
            teacher_id: Some(teacher.to_string()),
            student_id: Some(student.to_string()),
            subject_id: None,
            class_type_id: None,
            booth_id: Some(booth.to_string()),
            branch_id: None,
            date: day(),
            start_time: start,
            end_time: end,
            duration_minutes: (end - start).num_minutes() as u32,
            notes: None,
            status: Default::default(),
            is_cancelled: false,
            cancelled_at: None,
            cancelled_by: None,
        }
    }

    #[test]
    fn filter_with_no_resources_never_matches() {
        let filter = build_resource_intersection_filter(None, None, None);
        assert!(filter.is_empty());
        assert!(!filter.matches(&existing("a", "t1", "s1", "b1", t(9, 0), t(10, 0))));
    }

    #[test]
    fn filter_matches_any_shared_resource() {
        let filter = build_resource_intersection_filter(Some("t9"), Some("s9"), Some("b1"));
        let other = existing("a", "t1", "s1", "b1", t(9, 0), t(10, 0));
        assert!(filter.matches(&other));
        assert_eq!(filter.shared_resources(&other), vec![ConflictType::BoothConflict]);
    }

    #[test]
    fn shared_teacher_and_booth_yield_two_reasons() {
        let placement = SessionPlacement::new(day(), t(9, 30), t(10, 30))
            .with_teacher("t1")
            .with_booth("b1");
        let others = [existing("a", "t1", "s1", "b1", t(9, 0), t(10, 0))];

        let reasons = find_resource_conflicts(&placement, &others, None);
        let kinds: Vec<_> = reasons.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![ConflictType::TeacherConflict, ConflictType::BoothConflict]
        );
        assert!(reasons.iter().all(|r| r.overlap_minutes == Some(30)));
        assert!(reasons.iter().all(|r| r.conflicting_session_id.as_deref() == Some("a")));
    }

    #[test]
    fn cancelled_excluded_and_touching_sessions_are_ignored() {
        let placement = SessionPlacement::new(day(), t(10, 0), t(11, 0)).with_teacher("t1");
        let mut cancelled = existing("c", "t1", "s1", "b1", t(10, 0), t(11, 0));
        cancelled.is_cancelled = true;
        let others = [
            cancelled,
            existing("self", "t1", "s1", "b1", t(10, 0), t(11, 0)),
            existing("before", "t1", "s2", "b2", t(9, 0), t(10, 0)),
        ];

        assert!(overlapping_sessions(&placement, &others, Some("self")).is_empty());
    }
}
