//! Bearer gate for the trigger endpoints.
//!
//! Order matters: a missing secret fails closed with 500 before anything
//! else runs, then the per-client rate limit applies, then the token check.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use docketsync_domain::constants::trigger_rate_limit_key;
use tracing::{error, warn};

use crate::context::AppContext;
use crate::error::ApiError;

pub async fn require_trigger_auth(req: Request<Body>, next: Next) -> Response {
    let Some(ctx) = req.extensions().get::<Arc<AppContext>>().cloned() else {
        error!("application context missing from request extensions");
        return ApiError::MissingSecret.into_response();
    };

    if !ctx.secret_configured() {
        error!(path = %req.uri().path(), "trigger called without a configured secret");
        return ApiError::MissingSecret.into_response();
    }

    let key = client_key(&req, ctx.config.server.trust_forwarded_for);
    let decision = ctx.trigger_limiter.check(&key);
    if !decision.allowed {
        warn!(client = %key, retry_after_ms = decision.retry_after_ms(), "trigger rate limited");
        return ApiError::RateLimited { retry_after: decision.retry_after }.into_response();
    }

    let verified = bearer_token(req.headers()).and_then(|token| ctx.verify_secret(token));
    if verified != Some(true) {
        warn!(client = %key, path = %req.uri().path(), "trigger rejected: bad credentials");
        return ApiError::Unauthorized.into_response();
    }

    next.run(req).await
}

/// Rate limit key for the caller.
///
/// The peer address is used unless `trust_forwarded_for` is set, in which
/// case the first `X-Forwarded-For` hop wins when present.
fn client_key(req: &Request<Body>, trust_forwarded_for: bool) -> String {
    let forwarded = if trust_forwarded_for { forwarded_client(req.headers()) } else { None };
    let client = forwarded.map(str::to_string).or_else(|| {
        req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip().to_string())
    });
    trigger_rate_limit_key(client.as_deref().unwrap_or("anonymous"))
}

fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
