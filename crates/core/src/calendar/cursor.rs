//! Sync Cursor Manager
//!
//! A cursor is used in full or not at all. It is only committed after every
//! page of a pass has been fetched, and discarded entirely when the provider
//! reports it invalid.

use std::sync::Arc;

use chrono::Utc;
use docketsync_domain::{Result, SyncCursor};
use tracing::{debug, info};
use uuid::Uuid;

use super::ports::SyncCursorStore;

#[derive(Clone)]
pub struct SyncCursorManager {
    store: Arc<dyn SyncCursorStore>,
}

impl SyncCursorManager {
    pub fn new(store: Arc<dyn SyncCursorStore>) -> Self {
        Self { store }
    }

    /// Stored cursor, or `None` when a bounded full sync is needed
    pub async fn get(&self, practice_id: Uuid, calendar_id: &str) -> Result<Option<SyncCursor>> {
        self.store.load_cursor(practice_id, calendar_id).await
    }

    /// Persist the cursor returned by the final page of a successful pass
    pub async fn commit(
        &self,
        practice_id: Uuid,
        calendar_id: &str,
        token: impl Into<String> + Send,
    ) -> Result<SyncCursor> {
        let cursor = SyncCursor {
            practice_id,
            calendar_id: calendar_id.to_string(),
            token: token.into(),
            last_synced_at: Utc::now(),
        };
        self.store.save_cursor(&cursor).await?;
        debug!(%practice_id, calendar_id, "sync cursor committed");
        Ok(cursor)
    }

    /// Discard the cursor so the next pass starts with a bounded full sync
    pub async fn invalidate(&self, practice_id: Uuid, calendar_id: &str) -> Result<()> {
        self.store.delete_cursor(practice_id, calendar_id).await?;
        info!(%practice_id, calendar_id, "sync cursor invalidated");
        Ok(())
    }
}
