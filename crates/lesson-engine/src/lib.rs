//! # lesson-engine
//!
//! Conflict detection and status recomputation for tutoring-school class
//! scheduling.
//!
//! Given where a class session is (or would be), the engine decides whether
//! it can be scheduled, which kind of conflict it has (a hard double-booking
//! of a teacher, student or booth, or a soft availability mismatch), and how
//! a change to one session ripples into the statuses of its neighbors. It
//! also materializes recurring series on a rolling lead window.
//!
//! Storage, availability data and "today" are supplied by the caller through
//! the traits in [`store`], [`availability`] and [`clock`].
//!
//! ## Modules
//!
//! - [`policy`] — layered scheduling policy resolution
//! - [`conflict`] — half-open overlap detection and conflict reason types
//! - [`classifier`] — placement → conflict reasons
//! - [`decision`] — conflict reasons + policy → `CONFIRMED` / `CONFLICTED`
//! - [`status`] — evaluate placements and recompute persisted sessions
//! - [`neighbors`] — cascade re-evaluation to affected sessions
//! - [`series`] — rolling-window series advancement
//! - [`expander`] — weekday set → candidate dates via RRULE expansion
//! - [`vacation`] — vacation date matching, including annual recurrences
//! - [`class_type`] — bounded class-type ancestor walk
//! - [`availability`] — availability oracle seam and a weekly implementation
//! - [`store`] / [`memory`] — persistence seams and an in-memory store
//! - [`config`] / [`clock`] — engine configuration and the source of "today"
//! - [`error`] — Error types

pub mod availability;
pub mod class_type;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod decision;
pub mod engine;
pub mod error;
pub mod expander;
pub mod memory;
pub mod model;
pub mod neighbors;
pub mod policy;
pub mod series;
pub mod status;
pub mod store;
pub mod vacation;

pub use availability::{
    AvailabilityConflict, AvailabilityOracle, AvailabilityQuery, AvailabilityReport,
    PersonAvailability, SideAvailability, WeeklyAvailability,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use conflict::{build_resource_intersection_filter, ConflictReason, ConflictType, TimeWindow};
pub use decision::decide;
pub use engine::Engine;
pub use error::SchedulerError;
pub use memory::{MemoryStore, Snapshot};
pub use model::{ClassSeries, ClassSession, ClassType, SessionPlacement, SessionStatus, Vacation};
pub use neighbors::RecomputeSummary;
pub use policy::{merge_policy, PolicyOverride, SchedulingPolicy};
pub use series::{AdvanceAllResult, AdvanceResult, CandidateOutcome, CandidatePreview};
pub use status::{Evaluation, PlacementAssessment};
