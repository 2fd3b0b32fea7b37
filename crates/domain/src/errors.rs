//! Error types used throughout the engine
//!
//! Adapters translate provider and storage failures into [`DocketError`] at
//! the boundary; business logic only ever matches on these variants.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for DocketSync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DocketError {
    /// Network failure, timeout, 429 or 5xx. Safe to retry on the next run.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Credential revoked or expired. Never retried automatically.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Referenced remote resource no longer exists.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Incremental sync cursor rejected by the provider (HTTP 410).
    #[error("Sync cursor invalidated: {0}")]
    Invalidated(String),

    /// Local data cannot be mapped or is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unique constraint lost to a concurrent writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocketError {
    /// Classification label for summaries and logs
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient(_) => ErrorKind::Transient,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Invalidated(_) => ErrorKind::Invalidated,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Database(_) => ErrorKind::Database,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(m)
            | Self::Authentication(m)
            | Self::NotFound(m)
            | Self::Invalidated(m)
            | Self::Validation(m)
            | Self::Conflict(m)
            | Self::Database(m)
            | Self::Config(m)
            | Self::Internal(m) => m,
        }
    }

    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Error classification carried in batch summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Authentication,
    NotFound,
    Invalidated,
    Validation,
    Conflict,
    Database,
    Config,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Authentication => "authentication",
            Self::NotFound => "not_found",
            Self::Invalidated => "invalidated",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Database => "database",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for DocketSync operations
pub type Result<T> = std::result::Result<T, DocketError>;
