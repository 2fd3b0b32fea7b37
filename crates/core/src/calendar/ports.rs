//! Port interfaces for calendar synchronization

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docketsync_domain::{
    CalendarEvent, CalendarPage, ListEventsQuery, RemoteEvent, Result, SyncCursor,
};
use uuid::Uuid;

/// Calendar provider bound to one practice's access token
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Fetch one page of events
    ///
    /// Returns `DocketError::Invalidated` when the provider rejects the
    /// query's sync token.
    async fn list_events(&self, calendar_id: &str, query: &ListEventsQuery)
        -> Result<CalendarPage>;

    /// Create an event, returning the stored resource
    async fn insert_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent>;

    /// Replace an event, returning the stored resource
    ///
    /// Returns `DocketError::NotFound` when the event no longer exists.
    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent>;

    /// Delete an event
    ///
    /// Returns `DocketError::NotFound` when the event is already gone.
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()>;
}

/// Local calendar event store
#[async_trait]
pub trait CalendarEventRepository: Send + Sync {
    /// Get an event by its local id, including soft-deleted ones
    async fn get_event(&self, id: Uuid) -> Result<Option<CalendarEvent>>;

    /// Find the event linked to a remote resource within a practice
    async fn find_by_provider_id(
        &self,
        practice_id: Uuid,
        provider_event_id: &str,
    ) -> Result<Option<CalendarEvent>>;

    /// Events of a matter that need a create, update or delete upstream
    async fn list_pending_for_matter(&self, matter_id: Uuid) -> Result<Vec<CalendarEvent>>;

    /// Insert or fully replace an event
    async fn save_event(&self, event: &CalendarEvent) -> Result<()>;

    /// Record (or clear, with `None`) the remote counterpart without touching
    /// the event's content
    async fn set_provider_link(
        &self,
        event_id: Uuid,
        provider_event_id: Option<&str>,
        etag: Option<&str>,
        provider_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// Persistence for incremental sync cursors
#[async_trait]
pub trait SyncCursorStore: Send + Sync {
    async fn load_cursor(&self, practice_id: Uuid, calendar_id: &str)
        -> Result<Option<SyncCursor>>;

    /// Insert or replace the cursor for the cursor's (practice, calendar)
    async fn save_cursor(&self, cursor: &SyncCursor) -> Result<()>;

    async fn delete_cursor(&self, practice_id: Uuid, calendar_id: &str) -> Result<()>;
}
