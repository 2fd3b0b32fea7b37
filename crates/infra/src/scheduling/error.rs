//! Scheduler error types

use std::time::Duration;

use docketsync_domain::DocketError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,

    #[error("scheduler not running")]
    NotRunning,

    #[error("failed to create scheduler: {source}")]
    CreationFailed { source: JobSchedulerError },

    #[error("failed to start scheduler: {source}")]
    StartFailed { source: JobSchedulerError },

    #[error("failed to stop scheduler: {source}")]
    StopFailed { source: JobSchedulerError },

    /// Usually an invalid cron expression
    #[error("failed to register job: {source}")]
    JobRegistrationFailed { source: JobSchedulerError },

    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration, source: tokio::time::error::Elapsed },

    #[error("task join failed: {0}")]
    TaskJoinFailed(#[from] tokio::task::JoinError),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let docket_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                DocketError::Conflict(err.to_string())
            }
            SchedulerError::JobRegistrationFailed { .. } => DocketError::Config(err.to_string()),
            _ => DocketError::Internal(err.to_string()),
        };
        InfraError(docket_err)
    }
}

impl From<SchedulerError> for DocketError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
