//! Push Writer
//!
//! Writes local calendar changes to the provider and records the resulting
//! remote identity. A remote id is only ever cleared once the provider has
//! confirmed the resource is gone.

use std::sync::Arc;

use chrono::Utc;
use docketsync_domain::constants::PROP_EVENT_ID;
use docketsync_domain::{
    CalendarEvent, DocketError, ListEventsQuery, PushFailure, PushOutcome, RemoteEvent, Result,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::mapper;
use super::ports::{CalendarApi, CalendarEventRepository};

/// What a single push did upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAction {
    Created,
    Updated,
    Deleted,
    Unchanged,
}

pub struct PushWriter {
    events: Arc<dyn CalendarEventRepository>,
    dedupe_before_create: bool,
}

impl PushWriter {
    pub fn new(events: Arc<dyn CalendarEventRepository>) -> Self {
        Self { events, dedupe_before_create: true }
    }

    /// Look for an already-created remote copy before inserting
    #[must_use]
    pub const fn with_dedupe_before_create(mut self, enabled: bool) -> Self {
        self.dedupe_before_create = enabled;
        self
    }

    /// Push every pending event of a matter.
    ///
    /// Per-event failures are collected in the outcome. An authentication
    /// failure stops the pass and is returned, since every later call would
    /// fail the same way.
    #[instrument(skip(self, api), fields(%matter_id))]
    pub async fn push_pending(
        &self,
        api: &dyn CalendarApi,
        calendar_id: &str,
        matter_id: Uuid,
    ) -> Result<PushOutcome> {
        let pending = self.events.list_pending_for_matter(matter_id).await?;
        let mut outcome = PushOutcome::default();

        for event in &pending {
            match self.push_event(api, calendar_id, event).await {
                Ok(PushAction::Created) => outcome.created += 1,
                Ok(PushAction::Updated) => outcome.updated += 1,
                Ok(PushAction::Deleted) => outcome.deleted += 1,
                Ok(PushAction::Unchanged) => {}
                Err(err) if err.is_authentication() => return Err(err),
                Err(err) => {
                    warn!(event_id = %event.id, error = %err, "event push failed");
                    outcome.failures.push(PushFailure::new(event.id, &err));
                }
            }
        }

        if !pending.is_empty() {
            info!(
                pending = pending.len(),
                created = outcome.created,
                updated = outcome.updated,
                deleted = outcome.deleted,
                failed = outcome.failures.len(),
                "matter push complete"
            );
        }
        Ok(outcome)
    }

    /// Bring the provider in line with one local event.
    #[instrument(skip(self, api, event), fields(event_id = %event.id, provider_event_id = ?event.provider_event_id))]
    pub async fn push_event(
        &self,
        api: &dyn CalendarApi,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<PushAction> {
        if event.needs_remote_delete() {
            return self.delete(api, calendar_id, event).await;
        }
        if !event.needs_push() {
            return Ok(PushAction::Unchanged);
        }

        let body = mapper::to_remote(event)?;

        if let Some(provider_id) = event.provider_event_id.as_deref() {
            match api.update_event(calendar_id, provider_id, &body).await {
                Ok(stored) => {
                    self.record_link(event, &stored).await?;
                    return Ok(PushAction::Updated);
                }
                Err(DocketError::NotFound(_)) => {
                    info!("remote event gone, recreating");
                    self.events.set_provider_link(event.id, None, None, None).await?;
                }
                Err(err) => return Err(err),
            }
        }

        self.create(api, calendar_id, event, &body).await
    }

    async fn create(
        &self,
        api: &dyn CalendarApi,
        calendar_id: &str,
        event: &CalendarEvent,
        body: &RemoteEvent,
    ) -> Result<PushAction> {
        if self.dedupe_before_create {
            if let Some(existing) = self.find_existing_copy(api, calendar_id, event.id).await? {
                debug!(provider_event_id = ?existing.id, "adopting remote copy from an earlier attempt");
                if let Some(existing_id) = existing.id.as_deref() {
                    let stored = api.update_event(calendar_id, existing_id, body).await?;
                    self.record_link(event, &stored).await?;
                    return Ok(PushAction::Created);
                }
            }
        }

        let stored = api.insert_event(calendar_id, body).await?;
        self.record_link(event, &stored).await?;
        debug!(provider_event_id = ?stored.id, "remote event created");
        Ok(PushAction::Created)
    }

    async fn delete(
        &self,
        api: &dyn CalendarApi,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<PushAction> {
        let Some(provider_id) = event.provider_event_id.as_deref() else {
            return Ok(PushAction::Unchanged);
        };

        match api.delete_event(calendar_id, provider_id).await {
            Ok(()) => {}
            Err(DocketError::NotFound(_)) => debug!("remote event already gone"),
            Err(err) => return Err(err),
        }

        self.events.set_provider_link(event.id, None, None, None).await?;
        Ok(PushAction::Deleted)
    }

    async fn find_existing_copy(
        &self,
        api: &dyn CalendarApi,
        calendar_id: &str,
        event_id: Uuid,
    ) -> Result<Option<RemoteEvent>> {
        let query = ListEventsQuery::by_private_property(PROP_EVENT_ID, &event_id.to_string());
        let page = api.list_events(calendar_id, &query).await?;
        Ok(page.events.into_iter().find(|remote| remote.id.is_some() && !remote.is_cancelled()))
    }

    async fn record_link(&self, event: &CalendarEvent, stored: &RemoteEvent) -> Result<()> {
        let provider_id = stored.id.as_deref().ok_or_else(|| {
            DocketError::Internal(format!("provider returned no id for event {}", event.id))
        })?;
        // Never stamp earlier than the local edit, or the event stays pending.
        let synced_at = stored.updated.unwrap_or_else(Utc::now).max(event.updated_at);
        self.events
            .set_provider_link(event.id, Some(provider_id), stored.etag.as_deref(), Some(synced_at))
            .await
    }
}
