use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::require_trigger_auth;

pub mod cron;
pub mod health;
pub mod matters;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().route("/health", get(health::get_health)).merge(trigger_router())
}

/// Routes behind the bearer gate.
fn trigger_router() -> Router {
    Router::new()
        .route("/api/cron/sync", post(cron::run_sync))
        .merge(matters::router())
        .route_layer(middleware::from_fn(require_trigger_auth))
}
