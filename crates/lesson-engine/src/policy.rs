//! Scheduling policy: which conflict reasons mark a session `CONFLICTED`, and
//! whether sessions may sit outside a person's availability.
//!
//! The effective policy is a layered merge applied field by field:
//!
//! 1. hardcoded defaults (hard types marked, soft types not, no outside
//!    availability allowed)
//! 2. the stored global configuration, which replaces every field
//! 3. the branch override, where each field set in the override wins
//! 4. a series-level override, same rule as the branch
//!
//! The result is always fully populated.

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityOracle;
use crate::clock::Clock;
use crate::conflict::ConflictType;
use crate::engine::Engine;
use crate::error::Result;
use crate::store::SchedulingStore;

/// Per-reason flag: does a present reason of this type force `CONFLICTED`?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkAsConflicted {
    pub teacher_conflict: bool,
    pub student_conflict: bool,
    pub booth_conflict: bool,
    pub teacher_unavailable: bool,
    pub student_unavailable: bool,
    pub teacher_wrong_time: bool,
    pub student_wrong_time: bool,
    pub no_shared_availability: bool,
}

impl Default for MarkAsConflicted {
    fn default() -> Self {
        Self {
            teacher_conflict: true,
            student_conflict: true,
            booth_conflict: true,
            teacher_unavailable: false,
            student_unavailable: false,
            teacher_wrong_time: false,
            student_wrong_time: false,
            no_shared_availability: false,
        }
    }
}

impl MarkAsConflicted {
    /// The flag for `kind`. `Vacation` has no flag and is always `false`.
    pub fn get(&self, kind: ConflictType) -> bool {
        match kind {
            ConflictType::TeacherConflict => self.teacher_conflict,
            ConflictType::StudentConflict => self.student_conflict,
            ConflictType::BoothConflict => self.booth_conflict,
            ConflictType::TeacherUnavailable => self.teacher_unavailable,
            ConflictType::StudentUnavailable => self.student_unavailable,
            ConflictType::TeacherWrongTime => self.teacher_wrong_time,
            ConflictType::StudentWrongTime => self.student_wrong_time,
            ConflictType::NoSharedAvailability => self.no_shared_availability,
            ConflictType::Vacation => false,
        }
    }

    fn slot(&mut self, kind: ConflictType) -> Option<&mut bool> {
        match kind {
            ConflictType::TeacherConflict => Some(&mut self.teacher_conflict),
            ConflictType::StudentConflict => Some(&mut self.student_conflict),
            ConflictType::BoothConflict => Some(&mut self.booth_conflict),
            ConflictType::TeacherUnavailable => Some(&mut self.teacher_unavailable),
            ConflictType::StudentUnavailable => Some(&mut self.student_unavailable),
            ConflictType::TeacherWrongTime => Some(&mut self.teacher_wrong_time),
            ConflictType::StudentWrongTime => Some(&mut self.student_wrong_time),
            ConflictType::NoSharedAvailability => Some(&mut self.no_shared_availability),
            ConflictType::Vacation => None,
        }
    }

    pub fn set(&mut self, kind: ConflictType, value: bool) {
        if let Some(flag) = self.slot(kind) {
            *flag = value;
        }
    }
}

/// Suppress soft availability reasons for one side entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowOutsideAvailability {
    pub teacher: bool,
    pub student: bool,
}

/// Fully-populated effective configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingPolicy {
    pub mark_as_conflicted: MarkAsConflicted,
    pub allow_outside_availability: AllowOutsideAvailability,
}

impl SchedulingPolicy {
    /// Whether a present reason of `kind` forces `CONFLICTED` under this policy.
    pub fn marks(&self, kind: ConflictType) -> bool {
        self.mark_as_conflicted.get(kind)
    }

    /// Overlay every field that `layer` sets.
    pub fn apply(&mut self, layer: &PolicyOverride) {
        for (kind, value) in layer.mark_fields() {
            if let Some(value) = value {
                self.mark_as_conflicted.set(kind, value);
            }
        }
        if let Some(v) = layer.allow_outside_availability_teacher {
            self.allow_outside_availability.teacher = v;
        }
        if let Some(v) = layer.allow_outside_availability_student {
            self.allow_outside_availability.student = v;
        }
    }
}

/// Flat record of optional booleans, as stored for a branch or supplied with a
/// series request. Unset fields leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_teacher_conflict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_student_conflict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_booth_conflict: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_teacher_unavailable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_student_unavailable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_teacher_wrong_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_student_wrong_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_no_shared_availability: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_outside_availability_teacher: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_outside_availability_student: Option<bool>,
}

impl PolicyOverride {
    fn mark_fields(&self) -> [(ConflictType, Option<bool>); 8] {
        [
            (ConflictType::TeacherConflict, self.mark_teacher_conflict),
            (ConflictType::StudentConflict, self.mark_student_conflict),
            (ConflictType::BoothConflict, self.mark_booth_conflict),
            (ConflictType::TeacherUnavailable, self.mark_teacher_unavailable),
            (ConflictType::StudentUnavailable, self.mark_student_unavailable),
            (ConflictType::TeacherWrongTime, self.mark_teacher_wrong_time),
            (ConflictType::StudentWrongTime, self.mark_student_wrong_time),
            (ConflictType::NoSharedAvailability, self.mark_no_shared_availability),
        ]
    }

    pub fn is_empty(&self) -> bool {
        *self == PolicyOverride::default()
    }

    /// Copy every field `patch` sets onto `self`; fields `patch` leaves unset
    /// keep their current value.
    pub fn upsert(&mut self, patch: &PolicyOverride) {
        fn take(slot: &mut Option<bool>, value: Option<bool>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.mark_teacher_conflict, patch.mark_teacher_conflict);
        take(&mut self.mark_student_conflict, patch.mark_student_conflict);
        take(&mut self.mark_booth_conflict, patch.mark_booth_conflict);
        take(&mut self.mark_teacher_unavailable, patch.mark_teacher_unavailable);
        take(&mut self.mark_student_unavailable, patch.mark_student_unavailable);
        take(&mut self.mark_teacher_wrong_time, patch.mark_teacher_wrong_time);
        take(&mut self.mark_student_wrong_time, patch.mark_student_wrong_time);
        take(
            &mut self.mark_no_shared_availability,
            patch.mark_no_shared_availability,
        );
        take(
            &mut self.allow_outside_availability_teacher,
            patch.allow_outside_availability_teacher,
        );
        take(
            &mut self.allow_outside_availability_student,
            patch.allow_outside_availability_student,
        );
    }
}

/// Deterministic layered merge: defaults, then `global` (full replace), then
/// `branch`, then `series`.
pub fn merge_policy(
    global: Option<&SchedulingPolicy>,
    branch: Option<&PolicyOverride>,
    series: Option<&PolicyOverride>,
) -> SchedulingPolicy {
    let mut policy = global.copied().unwrap_or_default();
    for layer in [branch, series].into_iter().flatten() {
        policy.apply(layer);
    }
    policy
}

impl<S, O, C> Engine<S, O, C>
where
    S: SchedulingStore,
    O: AvailabilityOracle,
    C: Clock,
{
    /// Effective policy for a branch, optionally overlaid by a series request.
    ///
    /// Never fails: a store that cannot produce the global or branch layer is
    /// logged and that layer falls back to what lies beneath it.
    pub fn resolve_effective_policy(
        &self,
        branch_id: Option<&str>,
        series_override: Option<&PolicyOverride>,
    ) -> SchedulingPolicy {
        let global = self.store.global_policy().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Global policy unreadable, using defaults");
            None
        });
        let branch = match branch_id {
            Some(id) => self.store.branch_policy(id).unwrap_or_else(|e| {
                tracing::warn!(branch_id = id, error = %e, "Branch policy unreadable, ignoring override");
                None
            }),
            None => None,
        };
        merge_policy(global.as_ref(), branch.as_ref(), series_override)
    }

    /// Partially upsert a branch override and return the branch's new
    /// effective policy.
    pub fn update_branch_policy(
        &self,
        branch_id: &str,
        patch: &PolicyOverride,
    ) -> Result<SchedulingPolicy> {
        let mut stored = self.store.branch_policy(branch_id)?.unwrap_or_default();
        stored.upsert(patch);
        self.store.put_branch_policy(branch_id, &stored)?;
        tracing::info!(branch_id, "Branch scheduling policy updated");
        Ok(self.resolve_effective_policy(Some(branch_id), None))
    }
}
