//! # DocketSync Infrastructure
//!
//! Adapters implementing the ports defined in `docketsync-core`.
//!
//! This crate contains:
//! - SQLite repositories over an r2d2 pool
//! - The retrying HTTP client and Google Calendar/Drive adapters
//! - The token-scoped provider client factory
//! - Configuration loading
//! - The cron scheduler driving batch runs
//!
//! ## Architecture
//! - Implements traits defined in `docketsync-core`
//! - All I/O lives here; provider and storage errors are translated to
//!   `DocketError` before leaving the crate

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod scheduling;

pub use database::{
    DbManager, SqliteCalendarEventRepository, SqliteDocumentRepository,
    SqliteFolderRecordRepository, SqlitePracticeDirectory, SqliteSyncCursorStore,
};
pub use errors::InfraError;
pub use http::HttpClient;
pub use integrations::google::GoogleClientFactory;
pub use scheduling::{BatchJob, BatchScheduler, BatchSchedulerConfig};
