//! Rolling-window materialization of recurring series.
//!
//! Each run pushes a series' concrete-session horizon forward to
//! `today + lead_days`, never past the series' hard end date. Candidate dates
//! come from the weekday set; vacation dates are skipped unconditionally,
//! before any classification. Runs are idempotent: a date that already has an
//! identical live session is skipped, and a uniqueness violation on create is
//! a skip as well.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityOracle;
use crate::class_type::is_excluded_class_type;
use crate::clock::Clock;
use crate::conflict::ConflictReason;
use crate::engine::Engine;
use crate::error::{Result, SchedulerError};
use crate::expander::candidate_dates;
use crate::model::{ClassSeries, SessionStatus};
use crate::store::{SchedulingStore, SessionKey, StoreError};
use crate::vacation::is_vacation_date;

/// Counters for one advancement run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceResult {
    pub attempted: usize,
    pub created_confirmed: usize,
    pub created_conflicted: usize,
    pub skipped: usize,
    /// Watermark after the run, if the series still exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generated_through: Option<NaiveDate>,
    /// The blueprint was deleted because its end date is fully materialized.
    #[serde(default)]
    pub series_deleted: bool,
}

impl AdvanceResult {
    pub fn created(&self) -> usize {
        self.created_confirmed + self.created_conflicted
    }

    fn absorb(&mut self, other: &AdvanceResult) {
        self.attempted += other.attempted;
        self.created_confirmed += other.created_confirmed;
        self.created_conflicted += other.created_conflicted;
        self.skipped += other.skipped;
    }
}

/// Result of advancing every stored series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceAllResult {
    pub series: Vec<(String, AdvanceResult)>,
    /// Series whose run failed outright, with the error message.
    pub failed: Vec<(String, String)>,
    pub totals: AdvanceResult,
}

/// Longest span one run expands; the recurrence expansion is capped at
/// `u16::MAX` instances.
pub const MAX_WINDOW_DAYS: i64 = u16::MAX as i64 - 1;

/// The date range one run will consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceWindow {
    /// The hard end date is already behind the window start.
    Expired,
    /// Nothing new to consider yet.
    Empty,
    Range { from: NaiveDate, to: NaiveDate },
}

/// Compute the advancement window for `series` as of `today`.
///
/// `from` is the day after the watermark (or the later of start date and
/// today when nothing was generated), never earlier than the start date or
/// today. `to` is `today + lead_days`, clamped to the end date and to at
/// most [`MAX_WINDOW_DAYS`] past `from`; later runs resume from the watermark.
pub fn advancement_window(series: &ClassSeries, today: NaiveDate, lead_days: u32) -> AdvanceWindow {
    let from = series
        .last_generated_through
        .and_then(|d| d.succ_opt())
        .unwrap_or(series.start_date)
        .max(series.start_date)
        .max(today);

    let horizon = today
        .checked_add_signed(Duration::days(i64::from(lead_days)))
        .unwrap_or(NaiveDate::MAX)
        .min(
            from.checked_add_signed(Duration::days(MAX_WINDOW_DAYS))
                .unwrap_or(NaiveDate::MAX),
        );
    let to = match series.end_date {
        Some(end) => horizon.min(end),
        None => horizon,
    };

    if series.end_date.is_some_and(|end| from > end) {
        return AdvanceWindow::Expired;
    }
    if from > to {
        return AdvanceWindow::Empty;
    }
    AdvanceWindow::Range { from, to }
}

/// What would happen on one candidate date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Vacation,
    /// An identical live session already exists.
    Duplicate { session_id: String },
    Scheduled {
        status: SessionStatus,
        reasons: Vec<ConflictReason>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePreview {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub outcome: CandidateOutcome,
}

impl<S, O, C> Engine<S, O, C>
where
    S: SchedulingStore,
    O: AvailabilityOracle,
    C: Clock,
{
    /// Materialize the next `lead_days` of a series.
    ///
    /// # Errors
    /// `SchedulerError::SeriesNotFound` if the series does not exist, and
    /// lookup failures before the per-date loop. Nothing inside the loop
    /// raises; bad dates are counted as skipped.
    pub fn advance_series(&self, series_id: &str, lead_days: u32) -> Result<AdvanceResult> {
        let series = self
            .store
            .series(series_id)?
            .ok_or_else(|| SchedulerError::SeriesNotFound(series_id.to_string()))?;

        if self.is_excluded(&series)? {
            tracing::debug!(series_id, "Series class type is excluded from advancement");
            return Ok(AdvanceResult {
                last_generated_through: series.last_generated_through,
                ..Default::default()
            });
        }

        let today = self.clock.today();
        let (from, to) = match advancement_window(&series, today, lead_days) {
            AdvanceWindow::Expired => {
                self.store.delete_series(series_id)?;
                tracing::info!(series_id, "Series end date passed, blueprint deleted");
                return Ok(AdvanceResult {
                    series_deleted: true,
                    ..Default::default()
                });
            }
            AdvanceWindow::Empty => {
                return Ok(AdvanceResult {
                    last_generated_through: series.last_generated_through,
                    ..Default::default()
                });
            }
            AdvanceWindow::Range { from, to } => (from, to),
        };

        let dates = candidate_dates(&series.weekdays, from, to)?;
        let vacations = self.store.vacations_for_branch(series.branch_id.as_deref())?;

        let mut result = AdvanceResult::default();
        for &date in &dates {
            result.attempted += 1;
            if is_vacation_date(&vacations, date) {
                result.skipped += 1;
                continue;
            }
            match self.materialize(&series, date) {
                Some(SessionStatus::Confirmed) => result.created_confirmed += 1,
                Some(SessionStatus::Conflicted) => result.created_conflicted += 1,
                None => result.skipped += 1,
            }
        }

        // The window reaching the end date retires the blueprint, even when the
        // last matching weekday falls before it.
        if series.end_date.is_some_and(|end| to >= end) {
            self.store.delete_series(series_id)?;
            result.series_deleted = true;
        } else if let Some(&last) = dates.last() {
            self.store.set_last_generated_through(series_id, last)?;
            result.last_generated_through = Some(last);
        } else {
            result.last_generated_through = series.last_generated_through;
        }

        tracing::info!(
            series_id,
            %from,
            %to,
            attempted = result.attempted,
            confirmed = result.created_confirmed,
            conflicted = result.created_conflicted,
            skipped = result.skipped,
            deleted = result.series_deleted,
            "Series advanced"
        );
        Ok(result)
    }

    /// Advance every stored series, isolating failures per series.
    ///
    /// `lead_days` defaults to the configured lead window.
    pub fn advance_all_series(&self, lead_days: Option<u32>) -> Result<AdvanceAllResult> {
        let lead_days = lead_days.unwrap_or(self.config.default_lead_days);
        let mut all = AdvanceAllResult::default();

        for id in self.store.series_ids()? {
            match self.advance_series(&id, lead_days) {
                Ok(result) => {
                    all.totals.absorb(&result);
                    all.series.push((id, result));
                }
                Err(e) => {
                    tracing::warn!(series_id = %id, error = %e, "Series advancement failed");
                    all.failed.push((id, e.to_string()));
                }
            }
        }
        Ok(all)
    }

    /// Dry run of what advancing `series` over `[from, to]` would do. The
    /// window is clamped to the series' start and end dates. Nothing is
    /// written.
    pub fn preview_series(
        &self,
        series: &ClassSeries,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CandidatePreview>> {
        let from = from.max(series.start_date);
        let to = match series.end_date {
            Some(end) => to.min(end),
            None => to,
        };
        let vacations = self.store.vacations_for_branch(series.branch_id.as_deref())?;

        let mut previews = Vec::new();
        for date in candidate_dates(&series.weekdays, from, to)? {
            let outcome = if is_vacation_date(&vacations, date) {
                CandidateOutcome::Vacation
            } else {
                let new = series.session_on(date, SessionStatus::Confirmed);
                match self.store.find_identical(SessionKey::of_new(&new))? {
                    Some(existing) => CandidateOutcome::Duplicate {
                        session_id: existing.id,
                    },
                    None => {
                        let evaluation = self.evaluate(
                            &series.placement_on(date),
                            None,
                            series.policy_override.as_ref(),
                        )?;
                        CandidateOutcome::Scheduled {
                            status: evaluation.status,
                            reasons: evaluation.reasons,
                        }
                    }
                }
            };
            previews.push(CandidatePreview { date, outcome });
        }
        Ok(previews)
    }

    fn is_excluded(&self, series: &ClassSeries) -> Result<bool> {
        let Some(class_type_id) = series.class_type_id.as_deref() else {
            return Ok(false);
        };
        Ok(is_excluded_class_type(
            &self.store,
            class_type_id,
            &self.config.excluded_class_type_ids,
            self.config.max_class_type_depth,
        )?)
    }

    /// Create the session for one candidate date. `None` means skipped.
    fn materialize(&self, series: &ClassSeries, date: NaiveDate) -> Option<SessionStatus> {
        let mut new = series.session_on(date, SessionStatus::Confirmed);

        match self.store.find_identical(SessionKey::of_new(&new)) {
            Ok(Some(_)) => return None,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(series_id = %series.id, %date, error = %e, "Duplicate check failed, skipping date");
                return None;
            }
        }

        let placement = series.placement_on(date);
        let evaluation = match self.evaluate(&placement, None, series.policy_override.as_ref()) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::warn!(series_id = %series.id, %date, error = %e, "Classification failed, skipping date");
                return None;
            }
        };
        new.status = evaluation.status;

        let created = match self.store.create_session(new) {
            Ok(created) => created,
            Err(StoreError::UniqueViolation(msg)) => {
                tracing::debug!(series_id = %series.id, %date, reason = %msg, "Session already generated");
                return None;
            }
            Err(e) => {
                tracing::warn!(series_id = %series.id, %date, error = %e, "Session create failed, skipping date");
                return None;
            }
        };

        // The new session may put existing ones into conflict.
        if let Err(e) = self.recompute_neighbors(None, Some(&created.placement())) {
            tracing::warn!(session_id = %created.id, error = %e, "Neighbor recompute after generation failed");
        }
        Some(created.status)
    }
}
