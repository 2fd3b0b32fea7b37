use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

pub async fn get_health(
    Extension(ctx): Extension<Arc<AppContext>>,
) -> (StatusCode, Json<HealthResponse>) {
    let db = ctx.db.clone();
    let healthy = tokio::task::spawn_blocking(move || db.health_check().is_ok())
        .await
        .unwrap_or(false);

    if healthy {
        (StatusCode::OK, Json(HealthResponse { status: "ok", database: "ok" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "degraded", database: "unavailable" }),
        )
    }
}
