//! Error types for lesson-engine operations.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SchedulerError {
    /// Whether this error means the primary subject of the call does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchedulerError::SessionNotFound(_)
                | SchedulerError::SeriesNotFound(_)
                | SchedulerError::Store(StoreError::NotFound { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
