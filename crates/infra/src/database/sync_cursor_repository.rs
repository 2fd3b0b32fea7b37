//! Sync cursor persistence, one row per (practice, calendar).

use std::sync::Arc;

use async_trait::async_trait;
use docketsync_core::calendar::ports::SyncCursorStore;
use docketsync_domain::{Result, SyncCursor};
use rusqlite::{params, OptionalExtension};
use tracing::instrument;
use uuid::Uuid;

use super::columns::{micros, sql_err, time_at, uuid_at};
use super::manager::DbManager;

pub struct SqliteSyncCursorStore {
    db: Arc<DbManager>,
}

impl SqliteSyncCursorStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncCursorStore for SqliteSyncCursorStore {
    #[instrument(skip(self))]
    async fn load_cursor(&self, practice_id: Uuid, calendar_id: &str) -> Result<Option<SyncCursor>> {
        let calendar_id = calendar_id.to_string();
        self.db
            .call(move |conn| {
                conn.query_row(
                    "SELECT practice_id, calendar_id, token, last_synced_at
                     FROM sync_cursors WHERE practice_id = ?1 AND calendar_id = ?2",
                    params![practice_id.to_string(), calendar_id],
                    |row| {
                        Ok(SyncCursor {
                            practice_id: uuid_at(row, 0)?,
                            calendar_id: row.get(1)?,
                            token: row.get(2)?,
                            last_synced_at: time_at(row, 3)?,
                        })
                    },
                )
                .optional()
                .map_err(sql_err)
            })
            .await
    }

    // The token itself is never a span field.
    #[instrument(skip(self, cursor), fields(practice_id = %cursor.practice_id, calendar_id = %cursor.calendar_id))]
    async fn save_cursor(&self, cursor: &SyncCursor) -> Result<()> {
        let cursor = cursor.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sync_cursors (practice_id, calendar_id, token, last_synced_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(practice_id, calendar_id) DO UPDATE SET
                        token = excluded.token,
                        last_synced_at = excluded.last_synced_at",
                    params![
                        cursor.practice_id.to_string(),
                        cursor.calendar_id,
                        cursor.token,
                        micros(cursor.last_synced_at),
                    ],
                )
                .map_err(sql_err)?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self))]
    async fn delete_cursor(&self, practice_id: Uuid, calendar_id: &str) -> Result<()> {
        let calendar_id = calendar_id.to_string();
        self.db
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM sync_cursors WHERE practice_id = ?1 AND calendar_id = ?2",
                    params![practice_id.to_string(), calendar_id],
                )
                .map_err(sql_err)?;
                Ok(())
            })
            .await
    }
}
