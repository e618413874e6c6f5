//! Reduce conflict reasons and a policy to a session status.
//!
//! Any hard reason forces `CONFLICTED` whatever the policy says. Otherwise
//! the session is `CONFLICTED` iff some present reason is marked in
//! `policy.mark_as_conflicted`. `VACATION` never counts.

use crate::conflict::{ConflictReason, ConflictType};
use crate::model::SessionStatus;
use crate::policy::SchedulingPolicy;

pub fn decide(reasons: &[ConflictReason], policy: &SchedulingPolicy) -> SessionStatus {
    let kinds = reasons
        .iter()
        .map(|r| r.kind)
        .filter(|&k| k != ConflictType::Vacation);

    let mut conflicted = false;
    for kind in kinds {
        if kind.is_hard() {
            return SessionStatus::Conflicted;
        }
        conflicted |= policy.marks(kind);
    }

    if conflicted {
        SessionStatus::Conflicted
    } else {
        SessionStatus::Confirmed
    }
}
