//! Application constants
//!
//! Centralized location for domain-level constants shared by the sync
//! pipeline, the storage provisioner and the adapters.

// Calendar
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
pub const CALENDAR_PAGE_SIZE: u32 = 250;

// Private extended property keys stamped on every pushed event
pub const PROP_EVENT_ID: &str = "docketsyncEventId";
pub const PROP_MATTER_ID: &str = "docketsyncMatterId";
pub const PROP_TASK_ID: &str = "docketsyncTaskId";
pub const PROP_EVENT_TYPE: &str = "docketsyncEventType";

/// Remote status marking a deleted event
pub const REMOTE_STATUS_CANCELLED: &str = "cancelled";

// Rate limiting
pub const PROVIDER_RATE_LIMIT_PREFIX: &str = "provider:";
pub const TRIGGER_RATE_LIMIT_PREFIX: &str = "trigger:";

/// Rate limiter key guarding provider calls for one practice credential
pub fn provider_rate_limit_key(practice_id: &uuid::Uuid) -> String {
    format!("{PROVIDER_RATE_LIMIT_PREFIX}{practice_id}")
}

/// Rate limiter key guarding the trigger endpoints for one client address
pub fn trigger_rate_limit_key(client: &str) -> String {
    format!("{TRIGGER_RATE_LIMIT_PREFIX}{client}")
}

// Storage
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const DEFAULT_UPLOAD_MIME_TYPE: &str = "application/octet-stream";
pub const MATTER_ID_SHORT_LEN: usize = 8;
pub const MAX_FOLDER_NAME_LENGTH: usize = 200;

/// Current standard folder layout version
pub const FOLDER_STRUCTURE_VERSION: u32 = 1;

/// Standard matter subfolders, version 1
pub const STANDARD_SUBFOLDERS_V1: &[&str] = &[
    "Correspondence",
    "Pleadings",
    "Discovery",
    "Evidence",
    "Contracts",
    "Court Filings",
    "Research",
    "Billing",
    "Client Documents",
    "Internal Notes",
];

// HTTP
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const HTTP_MAX_ATTEMPTS: u32 = 2;
pub const HTTP_RETRY_BACKOFF_MS: u64 = 250;

// Batch
pub const DEFAULT_INTER_ITEM_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_RATE_LIMIT_WAIT_SECS: u64 = 60;
pub const DEFAULT_CRON_EXPRESSION: &str = "0 */15 * * * *";
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 600;
