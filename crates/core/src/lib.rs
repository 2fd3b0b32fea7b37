//! # DocketSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the calendar and storage
//!   providers and for local persistence
//! - The sync pipeline: event mapping, cursor management, pull
//!   reconciliation and push writing
//! - Folder provisioning and document filing
//! - The batch orchestrator that fans work out across practices and matters
//!
//! ## Architecture Principles
//! - Only depends on `docketsync-common` and `docketsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod batch;
pub mod calendar;
pub mod storage;

// Infrastructure ports
pub mod practice_ports;
pub mod provider_ports;

// Re-export specific items to avoid ambiguity
pub use batch::{BatchOptions, BatchOrchestrator};
pub use calendar::ports::{CalendarApi, CalendarEventRepository, SyncCursorStore};
pub use calendar::{PullReconciler, PushAction, PushWriter, SyncCursorManager};
pub use practice_ports::PracticeDirectory;
pub use provider_ports::{ProviderClientFactory, ProviderClients};
pub use storage::ports::{DocumentRepository, FolderRecordRepository, StorageApi};
pub use storage::{DocumentFiler, FolderLayout, FolderProvisioner, MatterStorageService};
