//! Tests for cascading status recomputation across neighboring sessions.

mod common;

use common::*;
use lesson_engine::model::{SessionPlacement, SessionStatus};
use lesson_engine::store::SessionStore;
use lesson_engine::{Engine, FixedClock, RecomputeSummary};

fn monday() -> chrono::NaiveDate {
    d(2025, 1, 6)
}

fn conflicted(mut s: lesson_engine::ClassSession) -> lesson_engine::ClassSession {
    s.status = SessionStatus::Conflicted;
    s
}

#[test]
fn moving_away_clears_the_neighbor_conflict() {
    let engine = engine();
    let store = engine.store();
    store
        .insert_session(conflicted(with_teacher(session("a", monday(), t(9, 0), t(10, 0)), "T")))
        .unwrap();
    let b = conflicted(with_teacher(session("b", monday(), t(9, 30), t(10, 30)), "T"));
    store.insert_session(b.clone()).unwrap();

    let old = b.placement();
    let mut moved = b;
    moved.start_time = t(14, 0);
    moved.end_time = t(15, 0);
    store.update_session(&moved).unwrap();

    let summary = engine
        .recompute_neighbors(Some(&old), Some(&moved.placement()))
        .unwrap();

    assert_eq!(status_of(&engine, "a"), SessionStatus::Confirmed);
    assert_eq!(
        summary,
        RecomputeSummary {
            examined: 1,
            changed: 1,
            failed: 0
        }
    );
}

#[test]
fn moving_into_a_slot_conflicts_the_neighbor() {
    let engine = engine();
    let store = engine.store();
    store
        .insert_session(with_booth(session("a", monday(), t(11, 0), t(12, 0)), "B"))
        .unwrap();
    let b = with_booth(session("b", monday(), t(9, 0), t(10, 0)), "B");
    store.insert_session(b.clone()).unwrap();

    let old = b.placement();
    let mut moved = b;
    moved.start_time = t(11, 30);
    moved.end_time = t(12, 30);
    store.update_session(&moved).unwrap();

    engine
        .recompute_neighbors(Some(&old), Some(&moved.placement()))
        .unwrap();
    assert_eq!(status_of(&engine, "a"), SessionStatus::Conflicted);
}

#[test]
fn subject_session_is_not_its_own_neighbor() {
    let engine = engine();
    let b = with_teacher(session("b", monday(), t(9, 0), t(10, 0)), "T");
    engine.store().insert_session(b.clone()).unwrap();

    let summary = engine.recompute_neighbors(None, Some(&b.placement())).unwrap();
    assert_eq!(summary.examined, 0);
}

#[test]
fn neighbors_of_both_placements_are_deduplicated() {
    let engine = engine();
    let store = engine.store();
    store
        .insert_session(with_teacher(session("a", monday(), t(9, 0), t(11, 0)), "T"))
        .unwrap();
    let b = with_teacher(session("b", monday(), t(9, 0), t(9, 30)), "T");
    store.insert_session(b.clone()).unwrap();

    let old = b.placement();
    let mut moved = b;
    moved.start_time = t(10, 0);
    moved.end_time = t(10, 30);
    store.update_session(&moved).unwrap();

    let summary = engine
        .recompute_neighbors(Some(&old), Some(&moved.placement()))
        .unwrap();
    assert_eq!(summary.examined, 1);
}

#[test]
fn cancelling_clears_conflicts_around_the_session() {
    let engine = engine();
    let store = engine.store();
    store
        .insert_session(conflicted(with_student(session("a", monday(), t(9, 0), t(10, 0)), "S")))
        .unwrap();
    store
        .insert_session(conflicted(with_student(session("c", monday(), t(13, 0), t(14, 0)), "S")))
        .unwrap();
    let b = conflicted(with_student(session("b", monday(), t(9, 0), t(10, 0)), "S"));
    let d_ = conflicted(with_student(session("d", monday(), t(13, 30), t(14, 30)), "S"));
    store.insert_session(b.clone()).unwrap();
    store.insert_session(d_.clone()).unwrap();

    let mut placements = Vec::new();
    for mut s in [b, d_] {
        s.is_cancelled = true;
        store.update_session(&s).unwrap();
        placements.push(s.placement());
    }

    let summary = engine.recompute_neighbors_for_cancelled(&placements);

    assert_eq!(status_of(&engine, "a"), SessionStatus::Confirmed);
    assert_eq!(status_of(&engine, "c"), SessionStatus::Confirmed);
    assert_eq!(summary.changed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        status_of(&engine, "b"),
        SessionStatus::Conflicted,
        "cancelled sessions keep their status"
    );
}

#[test]
fn reactivation_recomputes_neighbors_and_the_session_itself() {
    let engine = engine();
    let store = engine.store();
    store
        .insert_session(with_teacher(session("a", monday(), t(9, 0), t(10, 0)), "T"))
        .unwrap();
    let mut b = with_teacher(session("b", monday(), t(9, 30), t(10, 30)), "T");
    b.is_cancelled = true;
    store.insert_session(b.clone()).unwrap();

    b.is_cancelled = false;
    store.update_session(&b).unwrap();

    let summary = engine.recompute_neighbors_for_reactivated(&[b.placement()]);

    assert_eq!(status_of(&engine, "a"), SessionStatus::Conflicted);
    assert_eq!(status_of(&engine, "b"), SessionStatus::Conflicted);
    assert_eq!(summary.examined, 2);
    assert_eq!(summary.changed, 2);
}

#[test]
fn second_pass_converges() {
    let engine = engine();
    let store = engine.store();
    for (id, start, end) in [("a", 9, 11), ("b", 10, 12), ("c", 11, 13)] {
        store
            .insert_session(with_booth(session(id, monday(), t(start, 0), t(end, 0)), "B"))
            .unwrap();
    }
    let probe = SessionPlacement::new(monday(), t(8, 0), t(14, 0)).with_booth("B");

    let first = engine.recompute_neighbors(None, Some(&probe)).unwrap();
    assert_eq!(first.examined, 3);
    assert_eq!(first.changed, 3);

    let second = engine.recompute_neighbors(None, Some(&probe)).unwrap();
    assert_eq!(second.examined, 3);
    assert_eq!(second.changed, 0);
}

#[test]
fn one_failing_neighbor_does_not_stop_the_rest() {
    let engine = Engine::new(
        CountingStore::new(),
        StubOracle::available(),
        FixedClock(d(2025, 1, 1)),
    );
    let store = engine.store();
    for id in ["a", "b", "c"] {
        store
            .inner
            .insert_session(with_teacher(session(id, monday(), t(9, 0), t(10, 0)), "T"))
            .unwrap();
    }
    store.fail_reads_of("b");

    let probe = SessionPlacement::new(monday(), t(9, 0), t(10, 0)).with_teacher("T");
    let summary = engine.recompute_neighbors(None, Some(&probe)).unwrap();

    assert_eq!(summary.examined, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.changed, 2);
    assert_eq!(
        store.inner.session("a").unwrap().unwrap().status,
        SessionStatus::Conflicted
    );
    assert_eq!(
        store.inner.session("c").unwrap().unwrap().status,
        SessionStatus::Conflicted
    );
}

#[test]
fn placement_without_resources_has_no_neighbors() {
    let engine = engine();
    engine
        .store()
        .insert_session(session("a", monday(), t(9, 0), t(10, 0)))
        .unwrap();

    let probe = SessionPlacement::new(monday(), t(9, 0), t(10, 0));
    let summary = engine.recompute_neighbors(Some(&probe), None).unwrap();
    assert_eq!(summary, RecomputeSummary::default());
}
