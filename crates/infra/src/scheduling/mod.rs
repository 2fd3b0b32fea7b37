//! Cron scheduling for the batch sync
//!
//! Explicit lifecycle (start/stop), tracked join handles, cancellation
//! tokens and a timeout around every asynchronous scheduler operation.

pub mod batch_scheduler;
pub mod error;

pub use batch_scheduler::{BatchJob, BatchScheduler, BatchSchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
