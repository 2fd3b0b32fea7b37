//! Configuration structures
//!
//! Loading lives in the infra crate; this module only defines the shape,
//! defaults and validation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CRON_EXPRESSION, DEFAULT_INTER_ITEM_DELAY_MS, DEFAULT_JOB_TIMEOUT_SECS,
    DEFAULT_LOOKBACK_DAYS, DEFAULT_MAX_RATE_LIMIT_WAIT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::{DocketError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub google: GoogleConfig,
}

impl Config {
    /// Check cross-field constraints.
    ///
    /// The cron secret is deliberately not required here: a missing secret
    /// is reported per request by the trigger endpoints.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(DocketError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(DocketError::Config("database.pool_size must be greater than 0".into()));
        }
        if self.sync.rate_limit_max_requests == 0 || self.sync.rate_limit_window_secs == 0 {
            return Err(DocketError::Config("sync rate limit must be non-zero".into()));
        }
        if self.server.trigger_rate_limit_max == 0 || self.server.trigger_rate_limit_window_secs == 0
        {
            return Err(DocketError::Config("trigger rate limit must be non-zero".into()));
        }
        if self.sync.request_timeout_secs == 0 {
            return Err(DocketError::Config("sync.request_timeout_secs must be non-zero".into()));
        }
        if self.sync.lookback_days == 0 {
            return Err(DocketError::Config("sync.lookback_days must be non-zero".into()));
        }
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "docketsync.db".to_string(), pool_size: 8 }
    }
}

/// HTTP surface configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Shared bearer secret for trigger endpoints
    #[serde(default, skip_serializing)]
    pub cron_secret: Option<String>,
    pub trigger_rate_limit_max: u32,
    pub trigger_rate_limit_window_secs: u64,
    /// Key the trigger rate limit by the first `X-Forwarded-For` hop.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            cron_secret: None,
            trigger_rate_limit_max: 10,
            trigger_rate_limit_window_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_address", &self.bind_address)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field("trigger_rate_limit_max", &self.trigger_rate_limit_max)
            .field("trigger_rate_limit_window_secs", &self.trigger_rate_limit_window_secs)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish()
    }
}

/// Sync pipeline and batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub cron_expression: String,
    pub scheduler_enabled: bool,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub inter_item_delay_ms: u64,
    /// Upper bound on a single wait for the provider rate limiter
    pub max_rate_limit_wait_secs: u64,
    pub lookback_days: u32,
    pub request_timeout_secs: u64,
    pub job_timeout_secs: u64,
    pub dedupe_before_create: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_CRON_EXPRESSION.to_string(),
            scheduler_enabled: false,
            rate_limit_max_requests: 50,
            rate_limit_window_secs: 60,
            inter_item_delay_ms: DEFAULT_INTER_ITEM_DELAY_MS,
            max_rate_limit_wait_secs: DEFAULT_MAX_RATE_LIMIT_WAIT_SECS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            dedupe_before_create: true,
        }
    }
}

impl SyncConfig {
    pub const fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay_ms)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.max_rate_limit_wait_secs)
    }

    pub const fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

/// Google OAuth client and API endpoints
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    #[serde(default, skip_serializing)]
    pub client_secret: String,
    pub token_url: String,
    pub calendar_base_url: String,
    pub drive_base_url: String,
    pub upload_base_url: String,
    /// Parent folder under which matter roots are created
    #[serde(default)]
    pub root_folder_id: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            calendar_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            drive_base_url: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
            root_folder_id: None,
        }
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("token_url", &self.token_url)
            .field("calendar_base_url", &self.calendar_base_url)
            .field("drive_base_url", &self.drive_base_url)
            .field("upload_base_url", &self.upload_base_url)
            .field("root_folder_id", &self.root_folder_id)
            .finish()
    }
}
