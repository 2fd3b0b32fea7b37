use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use docketsync_domain::{DocketError, ErrorKind};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("trigger secret is not configured")]
    MissingSecret,

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("too many requests")]
    RateLimited { retry_after: Duration },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Docket(#[from] DocketError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingSecret => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Docket(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Authentication | ErrorKind::Invalidated => StatusCode::BAD_GATEWAY,
                ErrorKind::Database | ErrorKind::Config | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn kind_label(&self) -> &'static str {
        match self {
            Self::MissingSecret => "config",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidInput(_) => "validation",
            Self::Docket(err) => err.kind().as_str(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if code.is_server_error() {
            error!(status = code.as_u16(), kind = self.kind_label(), error = %self, "request failed");
        }

        let body = ErrorBody { error: self.to_string(), kind: self.kind_label() };
        let mut response = (code, Json(body)).into_response();

        match &self {
            Self::RateLimited { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
            }
            Self::Unauthorized => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            _ => {}
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DocketError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DocketError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DocketError::Conflict("x".into()), StatusCode::CONFLICT),
            (DocketError::Transient("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (DocketError::Authentication("x".into()), StatusCode::BAD_GATEWAY),
            (DocketError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn rate_limited_sets_retry_after_in_whole_seconds() {
        let response =
            ApiError::RateLimited { retry_after: Duration::from_millis(1500) }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[test]
    fn unauthorized_advertises_bearer() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
