//! SQLite-backed implementation of the CalendarEventRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docketsync_core::calendar::ports::CalendarEventRepository;
use docketsync_domain::{CalendarEvent, DocketError, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::columns::{micros, opt_micros, opt_time_at, opt_uuid_at, parsed_at, sql_err, time_at, uuid_at};
use super::manager::DbManager;

const EVENT_COLUMNS: &str = "id, practice_id, matter_id, task_id, title, description, location,
     start_at, end_at, all_day, event_type, provider_event_id, provider_etag,
     provider_updated_at, deleted_at, created_at, updated_at";

/// SQLite implementation of CalendarEventRepository
pub struct SqliteCalendarEventRepository {
    db: Arc<DbManager>,
}

impl SqliteCalendarEventRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    Ok(CalendarEvent {
        id: uuid_at(row, 0)?,
        practice_id: uuid_at(row, 1)?,
        matter_id: opt_uuid_at(row, 2)?,
        task_id: opt_uuid_at(row, 3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        location: row.get(6)?,
        start: time_at(row, 7)?,
        end: time_at(row, 8)?,
        all_day: row.get(9)?,
        event_type: parsed_at(row, 10)?,
        provider_event_id: row.get(11)?,
        provider_etag: row.get(12)?,
        provider_updated_at: opt_time_at(row, 13)?,
        deleted_at: opt_time_at(row, 14)?,
        created_at: time_at(row, 15)?,
        updated_at: time_at(row, 16)?,
    })
}

#[async_trait]
impl CalendarEventRepository for SqliteCalendarEventRepository {
    #[instrument(skip(self))]
    async fn get_event(&self, id: Uuid) -> Result<Option<CalendarEvent>> {
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE id = ?1"),
                    params![id.to_string()],
                    map_event,
                )
                .optional()
                .map_err(sql_err)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn find_by_provider_id(
        &self,
        practice_id: Uuid,
        provider_event_id: &str,
    ) -> Result<Option<CalendarEvent>> {
        let provider_event_id = provider_event_id.to_string();
        self.db
            .call(move |conn| {
                conn.query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM calendar_events
                         WHERE practice_id = ?1 AND provider_event_id = ?2"
                    ),
                    params![practice_id.to_string(), provider_event_id],
                    map_event,
                )
                .optional()
                .map_err(sql_err)
            })
            .await
    }

    #[instrument(skip(self))]
    async fn list_pending_for_matter(&self, matter_id: Uuid) -> Result<Vec<CalendarEvent>> {
        let events = self
            .db
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {EVENT_COLUMNS} FROM calendar_events
                         WHERE matter_id = ?1
                           AND (
                                (deleted_at IS NULL AND (
                                    provider_event_id IS NULL
                                    OR provider_updated_at IS NULL
                                    OR updated_at > provider_updated_at))
                             OR (deleted_at IS NOT NULL AND provider_event_id IS NOT NULL)
                           )
                         ORDER BY start_at, id"
                    ))
                    .map_err(sql_err)?;
                let rows = stmt.query_map(params![matter_id.to_string()], map_event).map_err(sql_err)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_err)
            })
            .await?;

        debug!(pending = events.len(), "loaded pending events");
        Ok(events)
    }

    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn save_event(&self, event: &CalendarEvent) -> Result<()> {
        let event = event.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO calendar_events ({EVENT_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                         ON CONFLICT(id) DO UPDATE SET
                            practice_id = excluded.practice_id,
                            matter_id = excluded.matter_id,
                            task_id = excluded.task_id,
                            title = excluded.title,
                            description = excluded.description,
                            location = excluded.location,
                            start_at = excluded.start_at,
                            end_at = excluded.end_at,
                            all_day = excluded.all_day,
                            event_type = excluded.event_type,
                            provider_event_id = excluded.provider_event_id,
                            provider_etag = excluded.provider_etag,
                            provider_updated_at = excluded.provider_updated_at,
                            deleted_at = excluded.deleted_at,
                            created_at = excluded.created_at,
                            updated_at = excluded.updated_at"
                    ),
                    params![
                        event.id.to_string(),
                        event.practice_id.to_string(),
                        event.matter_id.map(|id| id.to_string()),
                        event.task_id.map(|id| id.to_string()),
                        event.title,
                        event.description,
                        event.location,
                        micros(event.start),
                        micros(event.end),
                        event.all_day,
                        event.event_type.as_str(),
                        event.provider_event_id,
                        event.provider_etag,
                        opt_micros(event.provider_updated_at),
                        opt_micros(event.deleted_at),
                        micros(event.created_at),
                        micros(event.updated_at),
                    ],
                )
                .map_err(sql_err)?;
                Ok(())
            })
            .await
    }

    #[instrument(skip(self, etag))]
    async fn set_provider_link(
        &self,
        event_id: Uuid,
        provider_event_id: Option<&str>,
        etag: Option<&str>,
        provider_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let provider_event_id = provider_event_id.map(str::to_string);
        let etag = etag.map(str::to_string);
        let changed = self
            .db
            .call(move |conn| {
                conn.execute(
                    "UPDATE calendar_events
                     SET provider_event_id = ?2, provider_etag = ?3, provider_updated_at = ?4
                     WHERE id = ?1",
                    params![
                        event_id.to_string(),
                        provider_event_id,
                        etag,
                        opt_micros(provider_updated_at),
                    ],
                )
                .map_err(sql_err)
            })
            .await?;

        if changed == 0 {
            return Err(DocketError::NotFound(format!("calendar event {event_id}")));
        }
        Ok(())
    }
}
