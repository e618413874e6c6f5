//! Status evaluation for placements and persisted sessions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityOracle;
use crate::clock::Clock;
use crate::conflict::ConflictReason;
use crate::decision::decide;
use crate::engine::Engine;
use crate::error::{Result, SchedulerError};
use crate::model::{ClassSession, SessionPlacement, SessionStatus};
use crate::policy::PolicyOverride;
use crate::store::SchedulingStore;
use crate::vacation::is_vacation_date;

/// Reasons found for a placement and the status they resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: SessionStatus,
    pub reasons: Vec<ConflictReason>,
}

/// Outcome of checking an ad hoc placement before it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlacementAssessment {
    /// The date is inside a branch vacation; the session must not be created.
    Vacation { date: NaiveDate },
    Schedulable(Evaluation),
}

/// Result of recomputing one persisted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Recomputed {
    pub status: SessionStatus,
    pub changed: bool,
}

impl<S, O, C> Engine<S, O, C>
where
    S: SchedulingStore,
    O: AvailabilityOracle,
    C: Clock,
{
    /// Classify `placement` and decide its status under the branch policy,
    /// overlaid by `series_override` when given.
    pub fn evaluate(
        &self,
        placement: &SessionPlacement,
        exclude_id: Option<&str>,
        series_override: Option<&PolicyOverride>,
    ) -> Result<Evaluation> {
        let reasons = self.classify_with_override(placement, exclude_id, series_override)?;
        let policy = self.resolve_effective_policy(placement.branch_id.as_deref(), series_override);
        Ok(Evaluation {
            status: decide(&reasons, &policy),
            reasons,
        })
    }

    /// Check an ad hoc placement: vacations first, then classify and decide.
    pub fn assess_placement(
        &self,
        placement: &SessionPlacement,
        exclude_id: Option<&str>,
    ) -> Result<PlacementAssessment> {
        if self.is_vacation_day(placement.branch_id.as_deref(), placement.date)? {
            return Ok(PlacementAssessment::Vacation {
                date: placement.date,
            });
        }
        Ok(PlacementAssessment::Schedulable(self.evaluate(
            placement,
            exclude_id,
            None,
        )?))
    }

    /// Whether `date` falls in a vacation of `branch_id` or a school-wide one.
    pub fn is_vacation_day(&self, branch_id: Option<&str>, date: NaiveDate) -> Result<bool> {
        let vacations = self.store.vacations_for_branch(branch_id)?;
        Ok(is_vacation_date(&vacations, date))
    }

    /// Recompute a session's status from its current fields and persist it if
    /// it changed. Cancelled sessions keep whatever status they have.
    ///
    /// # Errors
    /// `SchedulerError::SessionNotFound` if the session does not exist.
    pub fn recompute_and_persist_status(&self, session_id: &str) -> Result<SessionStatus> {
        self.recompute(session_id).map(|r| r.status)
    }

    pub(crate) fn recompute(&self, session_id: &str) -> Result<Recomputed> {
        let session = self
            .store
            .session(session_id)?
            .ok_or_else(|| SchedulerError::SessionNotFound(session_id.to_string()))?;

        if session.is_cancelled {
            return Ok(Recomputed {
                status: session.status,
                changed: false,
            });
        }

        let series_override = self.series_override_for(&session);
        let evaluation = self.evaluate(
            &session.placement(),
            Some(&session.id),
            series_override.as_ref(),
        )?;

        if evaluation.status == session.status {
            return Ok(Recomputed {
                status: session.status,
                changed: false,
            });
        }

        self.store.set_session_status(&session.id, evaluation.status)?;
        tracing::info!(
            session_id = %session.id,
            from = %session.status,
            to = %evaluation.status,
            "Session status changed"
        );
        Ok(Recomputed {
            status: evaluation.status,
            changed: true,
        })
    }

    /// Policy override of the series a session was generated from, if that
    /// series still exists.
    fn series_override_for(&self, session: &ClassSession) -> Option<PolicyOverride> {
        let series_id = session.series_id.as_deref()?;
        match self.store.series(series_id) {
            Ok(series) => series.and_then(|s| s.policy_override),
            Err(e) => {
                tracing::warn!(series_id, error = %e, "Series lookup failed, using branch policy");
                None
            }
        }
    }
}
