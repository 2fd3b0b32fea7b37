//! Refresh-token exchange against the Google OAuth token endpoint.
//!
//! Only the refresh grant is supported; obtaining the refresh token in the
//! first place happens in the portal.

use std::fmt;

use docketsync_domain::{DocketError, GoogleConfig, RefreshToken, Result};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, warn};

use super::types::{TokenErrorResponse, TokenResponse};
use crate::errors::status_error;
use crate::http::HttpClient;

/// Short-lived bearer token for one practice.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// Exchanges refresh tokens for access tokens.
#[derive(Clone)]
pub struct TokenExchanger {
    http: HttpClient,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenExchanger {
    pub fn new(http: HttpClient, config: &GoogleConfig) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// Exchange `refresh_token` for a fresh access token.
    ///
    /// # Errors
    /// `Authentication` when the grant is rejected (`invalid_grant`, 401,
    /// 403); `Transient` for network failures and 5xx.
    #[instrument(skip_all)]
    pub async fn exchange(&self, refresh_token: &RefreshToken) -> Result<AccessToken> {
        let request = self.http.request(Method::POST, &self.token_url).form(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ]);

        let response = self.http.send_replayable(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_token_failure(status, &body);
            warn!(%status, kind = %err.kind(), "token exchange rejected");
            return Err(err);
        }

        let token: TokenResponse = response.json().await.map_err(|err| {
            DocketError::Validation(format!("malformed token endpoint response: {err}"))
        })?;
        if token.access_token.is_empty() {
            return Err(DocketError::Validation("token endpoint returned an empty access token".into()));
        }

        debug!(
            expires_in = token.expires_in,
            token_type = token.token_type.as_deref().unwrap_or("Bearer"),
            "access token obtained"
        );
        Ok(AccessToken::new(token.access_token))
    }
}

/// The token endpoint answers a revoked or expired grant with
/// `400 {"error":"invalid_grant"}`, which must not be retried.
fn classify_token_failure(status: StatusCode, body: &str) -> DocketError {
    let parsed: TokenErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let detail = parsed.error_description.as_deref().unwrap_or(parsed.error.as_str());

    match (status, parsed.error.as_str()) {
        (_, "invalid_grant" | "unauthorized_client" | "invalid_client") => {
            DocketError::Authentication(format!("{}: {detail}", parsed.error))
        }
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            DocketError::Authentication(format!("token endpoint returned {status}"))
        }
        _ => status_error(status, body),
    }
}
