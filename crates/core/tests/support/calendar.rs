//! In-memory calendar provider, event store and cursor store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docketsync_core::calendar::ports::{CalendarApi, CalendarEventRepository, SyncCursorStore};
use docketsync_domain::constants::REMOTE_STATUS_CANCELLED;
use docketsync_domain::{
    CalendarEvent, CalendarPage, DocketError, ListEventsQuery, RemoteEvent, Result as DomainResult,
    SyncCursor,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredEvent {
    event: RemoteEvent,
    changed_seq: u64,
}

#[derive(Debug, Default)]
struct RemoteState {
    events: Vec<StoredEvent>,
    seq: u64,
    next_id: u64,
    min_valid_token: u64,
    reject_all_tokens: bool,
    fail_list_after_pages: Option<usize>,
    list_pages_served: usize,
    failing_titles: HashMap<String, DocketError>,
}

/// Fake calendar provider with sync tokens, paging and failure injection.
///
/// Sync tokens are `sync-{seq}` where `seq` counts changes; an incremental
/// listing returns every event changed after the token's sequence,
/// including cancelled ones.
#[derive(Debug)]
pub struct MockCalendarApi {
    state: Mutex<RemoteState>,
    page_size: usize,
    pub list_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl Default for MockCalendarApi {
    fn default() -> Self {
        Self::with_page_size(50)
    }
}

impl MockCalendarApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(RemoteState::default()),
            page_size,
            list_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Add an event as if created by someone else on the provider.
    pub fn seed_external(&self, mut event: RemoteEvent) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = event.id.clone().unwrap_or_else(|| format!("ext-{}", state.next_id));
        event.id = Some(id.clone());
        event.status.get_or_insert_with(|| "confirmed".to_string());
        Self::store(&mut state, event);
        id
    }

    /// Insert through the provider API without going through the writer.
    pub async fn insert_event_direct(&self, body: &RemoteEvent) -> String {
        self.insert_event("primary", body).await.unwrap().id.unwrap()
    }

    /// Edit an event's title remotely.
    pub fn edit_remote(&self, id: &str, summary: &str) {
        let mut state = self.state.lock().unwrap();
        let mut event = state.events.iter().find(|s| s.event.id.as_deref() == Some(id)).unwrap().event.clone();
        event.summary = Some(summary.to_string());
        Self::store(&mut state, event);
    }

    /// Cancel an event remotely.
    pub fn cancel_remote(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        let mut event = state.events.iter().find(|s| s.event.id.as_deref() == Some(id)).unwrap().event.clone();
        event.status = Some(REMOTE_STATUS_CANCELLED.to_string());
        Self::store(&mut state, event);
    }

    /// Make every previously issued sync token invalid (HTTP 410).
    pub fn expire_sync_tokens(&self) {
        let mut state = self.state.lock().unwrap();
        state.min_valid_token = state.seq + 1;
    }

    /// Reject every listing, including bounded full syncs, as invalidated.
    pub fn reject_all_listings(&self) {
        self.state.lock().unwrap().reject_all_tokens = true;
    }

    /// Serve `pages` list pages successfully, then fail with a transient error.
    pub fn fail_listing_after(&self, pages: usize) {
        let mut state = self.state.lock().unwrap();
        state.fail_list_after_pages = Some(pages);
        state.list_pages_served = 0;
    }

    /// Fail inserts and updates of events with this title.
    pub fn fail_writes_for_title(&self, title: &str, error: DocketError) {
        self.state.lock().unwrap().failing_titles.insert(title.to_string(), error);
    }

    pub fn live_events(&self) -> Vec<RemoteEvent> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|s| !s.event.is_cancelled())
            .map(|s| s.event.clone())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<RemoteEvent> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .find(|s| s.event.id.as_deref() == Some(id))
            .map(|s| s.event.clone())
    }

    fn store(state: &mut RemoteState, mut event: RemoteEvent) {
        state.seq += 1;
        event.etag = Some(format!("\"etag-{}\"", state.seq));
        event.updated = Some(Utc::now());
        let seq = state.seq;
        if let Some(existing) = state.events.iter_mut().find(|s| s.event.id == event.id) {
            existing.event = event;
            existing.changed_seq = seq;
        } else {
            state.events.push(StoredEvent { event, changed_seq: seq });
        }
    }

    fn check_title(state: &RemoteState, event: &RemoteEvent) -> DomainResult<()> {
        match event.summary.as_ref().and_then(|title| state.failing_titles.get(title)) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn live_index(state: &RemoteState, id: &str) -> DomainResult<usize> {
        state
            .events
            .iter()
            .position(|s| s.event.id.as_deref() == Some(id) && !s.event.is_cancelled())
            .ok_or_else(|| DocketError::NotFound(format!("event {id}")))
    }
}

fn parse_seq(token: &str, prefix: &str) -> u64 {
    token.strip_prefix(prefix).and_then(|raw| raw.parse().ok()).unwrap_or(0)
}

#[async_trait]
impl CalendarApi for MockCalendarApi {
    async fn list_events(
        &self,
        _calendar_id: &str,
        query: &ListEventsQuery,
    ) -> DomainResult<CalendarPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();

        if let Some(limit) = state.fail_list_after_pages {
            if state.list_pages_served >= limit {
                return Err(DocketError::Transient("503 backend error".into()));
            }
        }

        if let Some(filter) = &query.private_extended_property {
            let (key, value) = filter.split_once('=').unwrap();
            let events = state
                .events
                .iter()
                .filter(|s| s.event.private_property(key) == Some(value))
                .map(|s| s.event.clone())
                .collect();
            return Ok(CalendarPage { events, next_page_token: None, next_sync_token: None });
        }

        if state.reject_all_tokens {
            return Err(DocketError::Invalidated("410 Gone".into()));
        }

        let matching: Vec<RemoteEvent> = match &query.sync_token {
            Some(token) => {
                let since = parse_seq(token, "sync-");
                if since < state.min_valid_token {
                    return Err(DocketError::Invalidated("410 Gone: fullSyncRequired".into()));
                }
                state.events.iter().filter(|s| s.changed_seq > since).map(|s| s.event.clone()).collect()
            }
            None => state
                .events
                .iter()
                .filter(|s| query.show_deleted || !s.event.is_cancelled())
                .filter(|s| match (query.time_min, event_start(&s.event)) {
                    (Some(min), Some(start)) => start >= min,
                    _ => true,
                })
                .map(|s| s.event.clone())
                .collect(),
        };

        let offset = query.page_token.as_deref().map_or(0, |t| parse_seq(t, "page-") as usize);
        let end = (offset + self.page_size).min(matching.len());
        let events = matching[offset.min(end)..end].to_vec();
        let last = end >= matching.len();
        state.list_pages_served += 1;

        Ok(CalendarPage {
            events,
            next_page_token: (!last).then(|| format!("page-{end}")),
            next_sync_token: last.then(|| format!("sync-{}", state.seq)),
        })
    }

    async fn insert_event(
        &self,
        _calendar_id: &str,
        event: &RemoteEvent,
    ) -> DomainResult<RemoteEvent> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::check_title(&state, event)?;
        state.next_id += 1;
        let mut stored = event.clone();
        stored.id = Some(format!("evt-{}", state.next_id));
        stored.status = Some("confirmed".to_string());
        let id = stored.id.clone();
        Self::store(&mut state, stored);
        Ok(state.events.iter().find(|s| s.event.id == id).unwrap().event.clone())
    }

    async fn update_event(
        &self,
        _calendar_id: &str,
        event_id: &str,
        event: &RemoteEvent,
    ) -> DomainResult<RemoteEvent> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::check_title(&state, event)?;
        let index = Self::live_index(&state, event_id)?;
        let mut stored = event.clone();
        stored.id = Some(event_id.to_string());
        stored.status = state.events[index].event.status.clone();
        Self::store(&mut state, stored);
        Ok(state.events[index].event.clone())
    }

    async fn delete_event(&self, _calendar_id: &str, event_id: &str) -> DomainResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let index = Self::live_index(&state, event_id)?;
        let mut cancelled = state.events[index].event.clone();
        cancelled.status = Some(REMOTE_STATUS_CANCELLED.to_string());
        Self::store(&mut state, cancelled);
        Ok(())
    }
}

fn event_start(event: &RemoteEvent) -> Option<DateTime<Utc>> {
    let start = event.start.as_ref()?;
    start.date_time.or_else(|| start.date.map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc()))
}

/// In-memory local event store with write and listing failure injection.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: Mutex<HashMap<Uuid, CalendarEvent>>,
    failing_saves: Mutex<HashMap<String, DocketError>>,
    failing_matters: Mutex<HashMap<Uuid, DocketError>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `save_event` for events with this title.
    pub fn fail_saves_for_title(&self, title: &str, error: DocketError) {
        self.failing_saves.lock().unwrap().insert(title.to_string(), error);
    }

    pub fn clear_save_failures(&self) {
        self.failing_saves.lock().unwrap().clear();
    }

    /// Fail `list_pending_for_matter` for this matter.
    pub fn fail_pending_listing(&self, matter_id: Uuid, error: DocketError) {
        self.failing_matters.lock().unwrap().insert(matter_id, error);
    }

    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<_> = self.all().into_iter().map(|e| e.title).collect();
        titles.sort();
        titles
    }

    pub fn insert(&self, event: CalendarEvent) {
        self.events.lock().unwrap().insert(event.id, event);
    }

    pub fn get(&self, id: Uuid) -> Option<CalendarEvent> {
        self.events.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<CalendarEvent> {
        let mut events: Vec<_> = self.events.lock().unwrap().values().cloned().collect();
        events.sort_by_key(|e| e.id);
        events
    }
}

#[async_trait]
impl CalendarEventRepository for InMemoryEventRepository {
    async fn get_event(&self, id: Uuid) -> DomainResult<Option<CalendarEvent>> {
        Ok(self.get(id))
    }

    async fn find_by_provider_id(
        &self,
        practice_id: Uuid,
        provider_event_id: &str,
    ) -> DomainResult<Option<CalendarEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .find(|e| {
                e.practice_id == practice_id
                    && e.provider_event_id.as_deref() == Some(provider_event_id)
            })
            .cloned())
    }

    async fn list_pending_for_matter(&self, matter_id: Uuid) -> DomainResult<Vec<CalendarEvent>> {
        if let Some(err) = self.failing_matters.lock().unwrap().get(&matter_id) {
            return Err(err.clone());
        }
        let mut pending: Vec<_> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.matter_id == Some(matter_id))
            .filter(|e| e.needs_push() || e.needs_remote_delete())
            .cloned()
            .collect();
        pending.sort_by_key(|e| e.id);
        Ok(pending)
    }

    async fn save_event(&self, event: &CalendarEvent) -> DomainResult<()> {
        if let Some(err) = self.failing_saves.lock().unwrap().get(&event.title) {
            return Err(err.clone());
        }
        self.insert(event.clone());
        Ok(())
    }

    async fn set_provider_link(
        &self,
        event_id: Uuid,
        provider_event_id: Option<&str>,
        etag: Option<&str>,
        provider_updated_at: Option<DateTime<Utc>>,
    ) -> DomainResult<()> {
        let mut events = self.events.lock().unwrap();
        let event = events
            .get_mut(&event_id)
            .ok_or_else(|| DocketError::NotFound(format!("event {event_id}")))?;
        event.provider_event_id = provider_event_id.map(str::to_string);
        event.provider_etag = etag.map(str::to_string);
        event.provider_updated_at = provider_updated_at;
        Ok(())
    }
}

/// In-memory cursor store.
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    cursors: Mutex<HashMap<(Uuid, String), SyncCursor>>,
}

impl InMemoryCursorStore {
    pub fn token(&self, practice_id: Uuid, calendar_id: &str) -> Option<String> {
        self.cursors
            .lock()
            .unwrap()
            .get(&(practice_id, calendar_id.to_string()))
            .map(|c| c.token.clone())
    }

    pub fn put(&self, practice_id: Uuid, calendar_id: &str, token: &str) {
        self.cursors.lock().unwrap().insert(
            (practice_id, calendar_id.to_string()),
            SyncCursor {
                practice_id,
                calendar_id: calendar_id.to_string(),
                token: token.to_string(),
                last_synced_at: Utc::now(),
            },
        );
    }
}

#[async_trait]
impl SyncCursorStore for InMemoryCursorStore {
    async fn load_cursor(
        &self,
        practice_id: Uuid,
        calendar_id: &str,
    ) -> DomainResult<Option<SyncCursor>> {
        Ok(self.cursors.lock().unwrap().get(&(practice_id, calendar_id.to_string())).cloned())
    }

    async fn save_cursor(&self, cursor: &SyncCursor) -> DomainResult<()> {
        self.cursors
            .lock()
            .unwrap()
            .insert((cursor.practice_id, cursor.calendar_id.clone()), cursor.clone());
        Ok(())
    }

    async fn delete_cursor(&self, practice_id: Uuid, calendar_id: &str) -> DomainResult<()> {
        self.cursors.lock().unwrap().remove(&(practice_id, calendar_id.to_string()));
        Ok(())
    }
}
