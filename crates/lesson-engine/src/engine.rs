//! The engine handle shared by every scheduling operation.
//!
//! Operations are implemented in their own modules as `impl` blocks on
//! [`Engine`]:
//!
//! - [`crate::policy`] — `resolve_effective_policy`, `update_branch_policy`
//! - [`crate::classifier`] — `classify`
//! - [`crate::status`] — `evaluate`, `assess_placement`, `recompute_and_persist_status`
//! - [`crate::neighbors`] — `recompute_neighbors` and its batch forms
//! - [`crate::series`] — `advance_series`, `advance_all_series`, `preview_series`

use crate::availability::AvailabilityOracle;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::store::SchedulingStore;

pub struct Engine<S, O, C> {
    pub(crate) store: S,
    pub(crate) oracle: O,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
}

impl<S, O, C> Engine<S, O, C>
where
    S: SchedulingStore,
    O: AvailabilityOracle,
    C: Clock,
{
    pub fn new(store: S, oracle: O, clock: C) -> Self {
        Self {
            store,
            oracle,
            clock,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consume the engine and hand back its store.
    pub fn into_store(self) -> S {
        self.store
    }
}
