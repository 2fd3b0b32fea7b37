//! Shared fixtures for infra integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use docketsync_domain::{CalendarEvent, GoogleConfig, Matter, MatterStatus, Practice};
use docketsync_infra::database::DbManager;
use docketsync_infra::http::HttpClient;
use tempfile::TempDir;
use uuid::Uuid;

/// Temporary migrated database; the directory lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::new(temp_dir.path().join("docketsync.db"), 4)
            .expect("db manager should be created");
        manager.run_migrations().expect("migrations should apply");
        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed instant, whole seconds, so values survive the microsecond column.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

pub fn practice(name: &str) -> Practice {
    Practice::new(Uuid::now_v7(), name).with_refresh_token(format!("1//refresh-{name}"))
}

pub fn matter(practice_id: Uuid, title: &str, client: Option<&str>, status: MatterStatus) -> Matter {
    Matter {
        id: Uuid::now_v7(),
        practice_id,
        title: title.to_string(),
        client_name: client.map(str::to_string),
        status,
    }
}

pub fn event(practice_id: Uuid, matter_id: Option<Uuid>, title: &str) -> CalendarEvent {
    let mut event = CalendarEvent::new(practice_id, matter_id, title, at(9, 0), at(10, 0));
    event.created_at = at(8, 0);
    event.updated_at = at(8, 0);
    event
}

/// Google endpoints all pointed at one mock server.
pub fn google_config(base: &str) -> GoogleConfig {
    GoogleConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        token_url: format!("{base}/token"),
        calendar_base_url: format!("{base}/calendar/v3"),
        drive_base_url: format!("{base}/drive/v3"),
        upload_base_url: format!("{base}/upload/drive/v3"),
        root_folder_id: None,
    }
}

pub fn http_client() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .base_backoff(Duration::from_millis(10))
        .build()
        .expect("http client")
}
