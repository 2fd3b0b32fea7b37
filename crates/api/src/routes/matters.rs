use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Extension, Json, Router};
use docketsync_domain::constants::DEFAULT_UPLOAD_MIME_TYPE;
use docketsync_domain::{Document, MatterFolderRecord, UploadRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::ApiError;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().route("/api/matters/{matter_id}/folders", post(ensure_folders)).route(
        "/api/matters/{matter_id}/documents",
        post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

#[tracing::instrument(level = "info", skip_all, fields(%matter_id))]
pub async fn ensure_folders(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(matter_id): Path<Uuid>,
) -> Result<Json<MatterFolderRecord>, ApiError> {
    let record = ctx.storage.ensure_folders(matter_id).await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub title: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub task_id: Option<Uuid>,
}

#[tracing::instrument(level = "info", skip_all, fields(%matter_id, bytes = body.len()))]
pub async fn upload_document(
    Extension(ctx): Extension<Arc<AppContext>>,
    Path(matter_id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let title = params
        .title
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("title is required".to_string()))?;
    if body.is_empty() {
        return Err(ApiError::InvalidInput("document body is empty".to_string()));
    }

    let mime_type = params
        .mime_type
        .or_else(|| {
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_UPLOAD_MIME_TYPE.to_string());

    let request = UploadRequest {
        matter_id,
        task_id: params.task_id,
        title,
        classification: params.classification,
        mime_type,
        bytes: body.to_vec(),
    };
    let document = ctx.storage.upload(request).await?;
    Ok((StatusCode::CREATED, Json(document)))
}
