//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::clock::SystemClock;
use crate::error::{Result, SchedulerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lead window, in days, for runs that do not name one.
    pub default_lead_days: u32,
    /// Bound on the class-type ancestor walk.
    pub max_class_type_depth: usize,
    /// Class types whose whole subtree is never advanced.
    pub excluded_class_type_ids: Vec<String>,
    /// IANA timezone in which "today" is read.
    pub timezone: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_lead_days: 30,
            max_class_type_depth: 10,
            excluded_class_type_ids: Vec::new(),
            timezone: "UTC".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SchedulerError::InvalidConfig(e.to_string()))
    }

    pub fn system_clock(&self) -> Result<SystemClock> {
        SystemClock::new(&self.timezone)
    }
}
