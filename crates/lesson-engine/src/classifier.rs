//! Classify a placement into typed conflict reasons.
//!
//! Two passes:
//!
//! 1. Hard overlaps. Every non-cancelled session on the same date that shares
//!    a teacher, student or booth and overlaps the window yields one reason
//!    per shared resource.
//! 2. Availability. Only when both teacher and student are assigned. At most
//!    one soft reason is produced: teacher side first, then student side,
//!    then `NO_SHARED_AVAILABILITY`. A side whose `allow_outside_availability`
//!    flag is set is skipped, so no reason is emitted for it at all. Lookup or
//!    oracle failures produce nothing.

use crate::availability::{AvailabilityConflict, AvailabilityOracle, AvailabilityQuery, AvailabilityReport};
use crate::clock::Clock;
use crate::conflict::{find_resource_conflicts, ConflictReason, ConflictType, ResourceFilter};
use crate::engine::Engine;
use crate::error::Result;
use crate::model::SessionPlacement;
use crate::policy::{PolicyOverride, SchedulingPolicy};
use crate::store::{SchedulingStore, StoreResult};

impl<S, O, C> Engine<S, O, C>
where
    S: SchedulingStore,
    O: AvailabilityOracle,
    C: Clock,
{
    /// Conflict reasons for `placement`, ignoring the session `exclude_id`.
    ///
    /// # Errors
    /// Only a failing overlap query propagates. Availability problems never do.
    pub fn classify(
        &self,
        placement: &SessionPlacement,
        exclude_id: Option<&str>,
    ) -> Result<Vec<ConflictReason>> {
        self.classify_with_override(placement, exclude_id, None)
    }

    pub(crate) fn classify_with_override(
        &self,
        placement: &SessionPlacement,
        exclude_id: Option<&str>,
        series_override: Option<&PolicyOverride>,
    ) -> Result<Vec<ConflictReason>> {
        let mut reasons = Vec::new();

        if placement.has_resources() {
            let filter = ResourceFilter::for_placement(placement);
            let candidates =
                self.store
                    .sessions_sharing_resources(placement.date, &filter, exclude_id)?;
            reasons.extend(find_resource_conflicts(placement, &candidates, exclude_id));
        }

        if let Some(reason) = self.availability_reason(placement, series_override) {
            reasons.push(reason);
        }

        tracing::debug!(
            date = %placement.date,
            start = %placement.start_time,
            end = %placement.end_time,
            reasons = reasons.len(),
            "Placement classified"
        );
        Ok(reasons)
    }

    fn availability_reason(
        &self,
        placement: &SessionPlacement,
        series_override: Option<&PolicyOverride>,
    ) -> Option<ConflictReason> {
        let (teacher_id, student_id) = match (&placement.teacher_id, &placement.student_id) {
            (Some(t), Some(s)) => (t.as_str(), s.as_str()),
            _ => return None,
        };

        let teacher_person = self.lookup_person(teacher_id, "teacher", |id| self.store.teacher_person(id))?;
        let student_person = self.lookup_person(student_id, "student", |id| self.store.student_person(id))?;

        let query = AvailabilityQuery {
            teacher_person_id: &teacher_person,
            student_person_id: &student_person,
            date: placement.date,
            start_time: placement.start_time,
            end_time: placement.end_time,
            bypass_vacation: true,
        };
        let report = match self.oracle.check(&query) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(teacher_id, student_id, error = %e, "Availability check failed, no soft reason produced");
                return None;
            }
        };

        if report.available && report.teacher.available && report.student.available {
            return None;
        }

        let policy = self.resolve_effective_policy(placement.branch_id.as_deref(), series_override);
        soft_reason(&report, &policy).map(ConflictReason::new)
    }

    fn lookup_person<F>(&self, id: &str, role: &'static str, lookup: F) -> Option<String>
    where
        F: FnOnce(&str) -> StoreResult<Option<String>>,
    {
        match lookup(id) {
            Ok(Some(person)) => Some(person),
            Ok(None) => {
                tracing::debug!(role, id, "No person record, skipping availability check");
                None
            }
            Err(e) => {
                tracing::warn!(role, id, error = %e, "Person lookup failed, skipping availability check");
                None
            }
        }
    }
}

/// The single soft reason an availability report yields under `policy`.
pub fn soft_reason(report: &AvailabilityReport, policy: &SchedulingPolicy) -> Option<ConflictType> {
    let allow = policy.allow_outside_availability;

    if !report.teacher.available && !allow.teacher {
        return Some(match report.teacher.conflict {
            Some(AvailabilityConflict::WrongTime) => ConflictType::TeacherWrongTime,
            _ => ConflictType::TeacherUnavailable,
        });
    }

    if !report.student.available && !allow.student {
        return Some(match report.student.conflict {
            Some(AvailabilityConflict::WrongTime) => ConflictType::StudentWrongTime,
            _ => ConflictType::StudentUnavailable,
        });
    }

    let unattributed = !report.available && report.teacher.available && report.student.available;
    if unattributed && !(allow.teacher && allow.student) {
        return Some(ConflictType::NoSharedAvailability);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::SideAvailability;

    fn report(teacher: SideAvailability, student: SideAvailability) -> AvailabilityReport {
        AvailabilityReport {
            available: teacher.available && student.available,
            teacher,
            student,
        }
    }

    #[test]
    fn teacher_side_takes_priority() {
        let r = report(
            SideAvailability::unavailable(AvailabilityConflict::WrongTime),
            SideAvailability::unavailable(AvailabilityConflict::Unavailable),
        );
        assert_eq!(
            soft_reason(&r, &SchedulingPolicy::default()),
            Some(ConflictType::TeacherWrongTime)
        );
    }

    #[test]
    fn allowed_teacher_side_falls_through_to_student() {
        let r = report(
            SideAvailability::unavailable(AvailabilityConflict::Unavailable),
            SideAvailability::unavailable(AvailabilityConflict::WrongTime),
        );
        let mut policy = SchedulingPolicy::default();
        policy.allow_outside_availability.teacher = true;
        assert_eq!(soft_reason(&r, &policy), Some(ConflictType::StudentWrongTime));

        policy.allow_outside_availability.student = true;
        assert_eq!(soft_reason(&r, &policy), None);
    }

    #[test]
    fn student_side_reported_when_teacher_is_free() {
        let r = report(
            SideAvailability::available(),
            SideAvailability::unavailable(AvailabilityConflict::Unavailable),
        );
        assert_eq!(
            soft_reason(&r, &SchedulingPolicy::default()),
            Some(ConflictType::StudentUnavailable)
        );
    }

    #[test]
    fn unattributed_unavailability_is_no_shared_availability() {
        let r = AvailabilityReport {
            available: false,
            teacher: SideAvailability::available(),
            student: SideAvailability::available(),
        };
        assert_eq!(
            soft_reason(&r, &SchedulingPolicy::default()),
            Some(ConflictType::NoSharedAvailability)
        );
    }
}
