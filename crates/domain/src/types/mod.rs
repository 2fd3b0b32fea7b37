//! Domain types and models

pub mod batch;
pub mod calendar;
pub mod practice;
pub mod storage;

pub use batch::{BatchError, BatchSummary, MatterSyncOutcome, PullOutcome, PushFailure, PushOutcome};
pub use calendar::{
    CalendarEvent, CalendarPage, EventType, ListEventsQuery, PrivateProperties, RemoteEvent,
    RemoteEventFields, RemoteEventTime, RemoteExtendedProperties, SyncCursor,
};
pub use practice::{Matter, MatterStatus, Practice, RefreshToken};
pub use storage::{
    Document, DocumentStatus, FolderEntry, FolderStructure, MatterFolderRecord, RemoteFile,
    UploadRequest,
};
