//! Re-evaluate sessions affected by a placement change.
//!
//! Moving, reassigning, cancelling or reactivating a session can add or clear
//! conflicts on the sessions around it. For each placement involved (the old
//! one, the new one, or both) every non-cancelled session on that date that
//! shares a resource and overlaps the window is a neighbor. Neighbors are
//! deduplicated and each is recomputed independently: one failure is logged
//! and counted, never fatal to the rest.
//!
//! Each recompute reads current persisted state, so later neighbors see
//! earlier writes. Running the same recompute twice converges.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityOracle;
use crate::clock::Clock;
use crate::conflict::{overlapping_sessions, ResourceFilter};
use crate::engine::Engine;
use crate::error::Result;
use crate::model::SessionPlacement;
use crate::store::SchedulingStore;

/// What a best-effort recompute pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeSummary {
    /// Sessions whose status was recomputed, successfully or not.
    pub examined: usize,
    /// Sessions whose persisted status changed.
    pub changed: usize,
    /// Sessions whose recompute failed and were skipped.
    pub failed: usize,
}

impl RecomputeSummary {
    fn absorb(&mut self, other: RecomputeSummary) {
        self.examined += other.examined;
        self.changed += other.changed;
        self.failed += other.failed;
    }
}

impl<S, O, C> Engine<S, O, C>
where
    S: SchedulingStore,
    O: AvailabilityOracle,
    C: Clock,
{
    /// Recompute every neighbor of `old` and `new`.
    ///
    /// # Errors
    /// Only a failing neighbor lookup propagates; per-neighbor failures are
    /// counted in the summary.
    pub fn recompute_neighbors(
        &self,
        old: Option<&SessionPlacement>,
        new: Option<&SessionPlacement>,
    ) -> Result<RecomputeSummary> {
        let subjects: Vec<&str> = [old, new]
            .into_iter()
            .flatten()
            .filter_map(|p| p.session_id.as_deref())
            .collect();

        let mut neighbor_ids = BTreeSet::new();
        for placement in [old, new].into_iter().flatten() {
            neighbor_ids.extend(self.neighbor_ids(placement, &subjects)?);
        }

        let mut summary = RecomputeSummary::default();
        for id in &neighbor_ids {
            summary.examined += 1;
            match self.recompute(id) {
                Ok(r) if r.changed => summary.changed += 1,
                Ok(_) => {}
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(session_id = %id, error = %e, "Neighbor recompute failed, skipping");
                }
            }
        }

        if summary.examined > 0 {
            tracing::debug!(
                examined = summary.examined,
                changed = summary.changed,
                failed = summary.failed,
                "Neighbors recomputed"
            );
        }
        Ok(summary)
    }

    /// Recompute around sessions that were just cancelled.
    pub fn recompute_neighbors_for_cancelled(&self, placements: &[SessionPlacement]) -> RecomputeSummary {
        let mut summary = RecomputeSummary::default();
        for placement in placements {
            match self.recompute_neighbors(Some(placement), None) {
                Ok(s) => summary.absorb(s),
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(session_id = ?placement.session_id, error = %e, "Neighbor lookup failed for cancelled session");
                }
            }
        }
        summary
    }

    /// Recompute around sessions that were just reactivated, then the
    /// reactivated sessions themselves.
    pub fn recompute_neighbors_for_reactivated(&self, placements: &[SessionPlacement]) -> RecomputeSummary {
        let mut summary = RecomputeSummary::default();
        for placement in placements {
            match self.recompute_neighbors(None, Some(placement)) {
                Ok(s) => summary.absorb(s),
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(session_id = ?placement.session_id, error = %e, "Neighbor lookup failed for reactivated session");
                }
            }

            let Some(id) = placement.session_id.as_deref() else {
                continue;
            };
            summary.examined += 1;
            match self.recompute(id) {
                Ok(r) if r.changed => summary.changed += 1,
                Ok(_) => {}
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(session_id = id, error = %e, "Reactivated session recompute failed");
                }
            }
        }
        summary
    }

    fn neighbor_ids(&self, placement: &SessionPlacement, subjects: &[&str]) -> Result<Vec<String>> {
        let filter = ResourceFilter::for_placement(placement);
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = self
            .store
            .sessions_sharing_resources(placement.date, &filter, None)?;
        Ok(overlapping_sessions(placement, &candidates, None)
            .into_iter()
            .filter(|s| !subjects.contains(&s.id.as_str()))
            .map(|s| s.id.clone())
            .collect())
    }
}
