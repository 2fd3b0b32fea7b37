//! Conversions from external infrastructure errors into domain errors.
//!
//! Everything provider- or storage-shaped stops here; callers above this
//! layer only see [`DocketError`] variants.

use docketsync_domain::DocketError;
use reqwest::{Error as HttpError, StatusCode};
use rusqlite::Error as SqlError;

/// Longest slice of a provider error body kept in error messages.
const MAX_BODY_EXCERPT: usize = 300;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DocketError);

impl From<InfraError> for DocketError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DocketError> for InfraError {
    fn from(value: DocketError) -> Self {
        InfraError(value)
    }
}

trait IntoDocketError {
    fn into_docket(self) -> DocketError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → DocketError */
/* -------------------------------------------------------------------------- */

impl IntoDocketError for SqlError {
    fn into_docket(self) -> DocketError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    // SQLITE_CONSTRAINT_UNIQUE, SQLITE_CONSTRAINT_PRIMARYKEY
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        DocketError::Conflict(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        DocketError::Database(format!("foreign key constraint violation: {message}"))
                    }
                    (ErrorCode::DatabaseBusy, _) => {
                        DocketError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        DocketError::Database("database is locked".into())
                    }
                    _ => DocketError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => DocketError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                DocketError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                DocketError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => DocketError::Config(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => DocketError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_docket())
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(DocketError::Database(format!("connection pool error: {value}")))
    }
}

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        InfraError(DocketError::Internal(format!("blocking task failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DocketError */
/* -------------------------------------------------------------------------- */

impl IntoDocketError for HttpError {
    fn into_docket(self) -> DocketError {
        if self.is_timeout() {
            return DocketError::Transient("HTTP request timed out".into());
        }

        if self.is_connect() {
            return DocketError::Transient("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return status_error(status, "");
        }

        if self.is_decode() {
            return DocketError::Validation(format!("malformed provider response: {self}"));
        }

        if self.is_builder() {
            return DocketError::Internal(format!("invalid HTTP request: {self}"));
        }

        DocketError::Transient(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_docket())
    }
}

/* -------------------------------------------------------------------------- */
/* HTTP status → DocketError */
/* -------------------------------------------------------------------------- */

/// Classify a non-success provider response.
///
/// Google reports quota exhaustion as 403 with a `rateLimitExceeded` reason;
/// that case is transient, every other 403 is a credential problem.
pub fn status_error(status: StatusCode, body: &str) -> DocketError {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let excerpt = excerpt(body);
    let message = if excerpt.is_empty() {
        format!("HTTP {code} {reason}")
    } else {
        format!("HTTP {code} {reason}: {excerpt}")
    };

    match code {
        403 if is_rate_limit_body(body) => DocketError::Transient(message),
        401 | 403 => DocketError::Authentication(message),
        404 => DocketError::NotFound(message),
        410 => DocketError::Invalidated(message),
        408 | 429 => DocketError::Transient(message),
        400..=499 => DocketError::Validation(message),
        _ => DocketError::Transient(message),
    }
}

fn is_rate_limit_body(body: &str) -> bool {
    body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded")
}

fn excerpt(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.len() <= MAX_BODY_EXCERPT {
        return trimmed;
    }
    let mut end = MAX_BODY_EXCERPT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
