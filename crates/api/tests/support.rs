//! Shared fixtures for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response};
use axum::Router;
use docketsync_api::AppContext;
use docketsync_domain::{Config, GoogleConfig, Matter, MatterStatus, Practice};
use docketsync_infra::SqlitePracticeDirectory;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "cron-secret-for-tests";

/// Application context over a temporary database.
pub struct TestApp {
    pub ctx: Arc<AppContext>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn new(configure: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let mut config = Config::default();
        config.database.path = temp_dir.path().join("api.db").to_string_lossy().into_owned();
        config.database.pool_size = 4;
        config.server.cron_secret = Some(SECRET.to_string());
        config.sync.inter_item_delay_ms = 0;
        configure(&mut config);

        let ctx = AppContext::new(config).expect("context should build");
        Self { ctx: Arc::new(ctx), _temp_dir: temp_dir }
    }

    pub fn router(&self) -> Router {
        docketsync_api::router(self.ctx.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.expect("router is infallible")
    }

    /// Insert a practice with a credential and one active matter.
    pub async fn seed_matter(&self) -> (Practice, Matter) {
        let directory = SqlitePracticeDirectory::new(self.ctx.db.clone());
        let practice =
            Practice::new(Uuid::now_v7(), "Hale & Partners").with_refresh_token("1//refresh-hale");
        let matter = Matter {
            id: Uuid::now_v7(),
            practice_id: practice.id,
            title: "Estate of Doe".to_string(),
            client_name: Some("Doe, Jane".to_string()),
            status: MatterStatus::Active,
        };
        directory.upsert_practice(&practice).await.expect("practice saved");
        directory.upsert_matter(&matter).await.expect("matter saved");
        (practice, matter)
    }
}

pub fn google_config(base: &str) -> GoogleConfig {
    GoogleConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        token_url: format!("{base}/token"),
        calendar_base_url: format!("{base}/calendar/v3"),
        drive_base_url: format!("{base}/drive/v3"),
        upload_base_url: format!("{base}/upload/drive/v3"),
        root_folder_id: Some("firm-root".to_string()),
    }
}

pub fn post(uri: &str, bearer: Option<&str>) -> Request<Body> {
    post_body(uri, bearer, Body::empty())
}

pub fn post_body(uri: &str, bearer: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body).expect("request should build")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}
