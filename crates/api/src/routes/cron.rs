use std::sync::Arc;

use axum::extract::Query;
use axum::{Extension, Json};
use docketsync_domain::BatchSummary;
use serde::Deserialize;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    /// Restrict the run to one matter
    #[serde(default)]
    pub matter_id: Option<Uuid>,
}

/// Run the batch sync, or a single matter when `matter_id` is given.
#[tracing::instrument(level = "info", skip_all, fields(matter_id = ?params.matter_id))]
pub async fn run_sync(
    Extension(ctx): Extension<Arc<AppContext>>,
    Query(params): Query<SyncParams>,
) -> Result<Json<BatchSummary>, ApiError> {
    let summary = match params.matter_id {
        Some(matter_id) => ctx.orchestrator.run_for_matter(matter_id).await?,
        None => ctx.orchestrator.run().await?,
    };
    Ok(Json(summary))
}
