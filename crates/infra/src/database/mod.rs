//! SQLite persistence: connection pool, schema and repository adapters

mod columns;

pub mod calendar_event_repository;
pub mod document_repository;
pub mod folder_record_repository;
pub mod manager;
pub mod practice_repository;
pub mod sync_cursor_repository;

pub use calendar_event_repository::SqliteCalendarEventRepository;
pub use document_repository::SqliteDocumentRepository;
pub use folder_record_repository::SqliteFolderRecordRepository;
pub use manager::{DbManager, SqliteConnection, SqlitePool};
pub use practice_repository::SqlitePracticeDirectory;
pub use sync_cursor_repository::SqliteSyncCursorStore;
