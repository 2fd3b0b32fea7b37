//! Pull Reconciler
//!
//! One pass:
//! 1. Load the cursor. Without one, list from `now - lookback` (bounded full
//!    sync).
//! 2. Walk every page, collecting events and the final page's sync token.
//! 3. If the provider rejects the cursor, discard it and restart once as a
//!    bounded full sync. A second rejection inside that pass is transient.
//! 4. Reconcile the collected events locally, then commit the new cursor.
//!    If any event fails to apply the cursor is left untouched, so the next
//!    pass lists the same changes again; reconciliation is safe to repeat.
//!
//! Any other page failure aborts the pass before anything is committed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use docketsync_domain::constants::{DEFAULT_LOOKBACK_DAYS, PROP_EVENT_ID};
use docketsync_domain::{
    CalendarEvent, CalendarPage, DocketError, ListEventsQuery, Practice, PullOutcome,
    RemoteEvent, Result,
};
use futures::stream::{self, Stream, TryStreamExt};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::cursor::SyncCursorManager;
use super::mapper;
use super::ports::{CalendarApi, CalendarEventRepository};

/// Events gathered across all pages of one listing
#[derive(Debug, Default)]
struct Listing {
    events: Vec<RemoteEvent>,
    next_sync_token: Option<String>,
}

pub struct PullReconciler {
    events: Arc<dyn CalendarEventRepository>,
    cursors: SyncCursorManager,
    lookback: Duration,
}

impl PullReconciler {
    pub fn new(events: Arc<dyn CalendarEventRepository>, cursors: SyncCursorManager) -> Self {
        Self { events, cursors, lookback: Duration::days(i64::from(DEFAULT_LOOKBACK_DAYS)) }
    }

    /// How far back a full sync reaches
    #[must_use]
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback = Duration::days(i64::from(days));
        self
    }

    /// Run one pull pass for the practice's calendar.
    #[instrument(skip(self, api, practice), fields(practice_id = %practice.id, calendar_id = %practice.calendar_id))]
    pub async fn pull(&self, api: &dyn CalendarApi, practice: &Practice) -> Result<PullOutcome> {
        let calendar_id = practice.calendar_id.as_str();
        let mut outcome = PullOutcome::default();

        let listing = match self.cursors.get(practice.id, calendar_id).await? {
            Some(cursor) => {
                match collect(api, calendar_id, ListEventsQuery::incremental(cursor.token)).await {
                    Err(DocketError::Invalidated(reason)) => {
                        warn!(%reason, "sync cursor rejected, restarting with bounded full sync");
                        self.cursors.invalidate(practice.id, calendar_id).await?;
                        outcome.cursor_reset = true;
                        outcome.full_sync = true;
                        self.full_listing(api, calendar_id).await?
                    }
                    other => other?,
                }
            }
            None => {
                outcome.full_sync = true;
                self.full_listing(api, calendar_id).await?
            }
        };

        outcome.fetched = listing.events.len();

        let mut first_failure = None;
        for remote in &listing.events {
            if let Err(err) = self.reconcile(practice.id, remote, &mut outcome).await {
                warn!(provider_event_id = ?remote.id, error = %err, "failed to apply remote event");
                first_failure.get_or_insert(err);
            }
        }
        if let Some(err) = first_failure {
            warn!(fetched = outcome.fetched, "pull pass incomplete, cursor not committed");
            return Err(err);
        }

        match listing.next_sync_token {
            Some(token) => {
                self.cursors.commit(practice.id, calendar_id, token).await?;
            }
            None => warn!("final page carried no sync token, cursor left unchanged"),
        }

        info!(
            fetched = outcome.fetched,
            created = outcome.created,
            updated = outcome.updated,
            deleted = outcome.deleted,
            skipped = outcome.skipped,
            full_sync = outcome.full_sync,
            cursor_reset = outcome.cursor_reset,
            "pull pass complete"
        );
        Ok(outcome)
    }

    async fn full_listing(&self, api: &dyn CalendarApi, calendar_id: &str) -> Result<Listing> {
        let query = ListEventsQuery::full(Utc::now() - self.lookback);
        collect(api, calendar_id, query).await.map_err(|err| match err {
            DocketError::Invalidated(reason) => DocketError::Transient(format!(
                "provider rejected a bounded full sync: {reason}"
            )),
            other => other,
        })
    }

    async fn reconcile(
        &self,
        practice_id: Uuid,
        remote: &RemoteEvent,
        outcome: &mut PullOutcome,
    ) -> Result<()> {
        let provider_id = remote.id.as_deref();
        let embedded_id = remote.embedded_uuid(PROP_EVENT_ID);

        if remote.is_cancelled() {
            let Some(mut local) = self.find_local(practice_id, provider_id, embedded_id).await?
            else {
                return Ok(());
            };
            if local.provider_event_id.is_some() && local.provider_event_id.as_deref() != provider_id
            {
                debug!(event_id = %local.id, "cancelled remote is not the linked copy, ignoring");
                return Ok(());
            }
            let now = Utc::now();
            if !local.is_deleted() {
                local.deleted_at = Some(now);
                outcome.deleted += 1;
            }
            local.clear_provider_link();
            local.updated_at = now;
            self.events.save_event(&local).await?;
            debug!(event_id = %local.id, "remote cancellation applied");
            return Ok(());
        }

        let fields = match mapper::from_remote(remote) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(provider_event_id = ?provider_id, error = %err, "skipping unmappable remote event");
                outcome.skipped += 1;
                return Ok(());
            }
        };

        match self.find_local(practice_id, provider_id, embedded_id).await? {
            Some(mut local) => {
                let linked = local.provider_event_id.as_deref();
                if linked.is_some() && linked != Some(fields.provider_event_id.as_str()) {
                    debug!(event_id = %local.id, provider_event_id = %fields.provider_event_id, "remote copy is not the linked one, skipping");
                    outcome.skipped += 1;
                    return Ok(());
                }
                if linked.is_some() && local.provider_etag.is_some() && local.provider_etag == fields.etag {
                    return Ok(());
                }
                if local.is_deleted() {
                    // Local deletion wins; the push side removes the remote copy.
                    if linked.is_none() {
                        self.events
                            .set_provider_link(
                                local.id,
                                Some(&fields.provider_event_id),
                                fields.etag.as_deref(),
                                fields.updated,
                            )
                            .await?;
                    }
                    return Ok(());
                }
                if local_is_newer(&local, fields.updated) {
                    debug!(event_id = %local.id, "local edit is newer than remote, keeping local");
                    if linked.is_none() {
                        self.events
                            .set_provider_link(local.id, Some(&fields.provider_event_id), fields.etag.as_deref(), None)
                            .await?;
                    }
                    return Ok(());
                }

                mapper::apply_remote(&mut local, &fields);
                stamp_synced(&mut local, fields.updated);
                self.events.save_event(&local).await?;
                outcome.updated += 1;
            }
            None if fields.local_event_id.is_some() => {
                debug!(provider_event_id = %fields.provider_event_id, "remote event references an unknown local event, skipping");
                outcome.skipped += 1;
            }
            None => {
                let mut local = CalendarEvent::new(
                    practice_id,
                    fields.matter_id,
                    fields.title.clone(),
                    fields.start,
                    fields.end,
                );
                mapper::apply_remote(&mut local, &fields);
                stamp_synced(&mut local, fields.updated);
                local.created_at = local.updated_at;
                self.events.save_event(&local).await?;
                outcome.created += 1;
            }
        }
        Ok(())
    }

    /// Match by provider id first, then by the embedded local id
    async fn find_local(
        &self,
        practice_id: Uuid,
        provider_id: Option<&str>,
        embedded_id: Option<Uuid>,
    ) -> Result<Option<CalendarEvent>> {
        if let Some(provider_id) = provider_id {
            if let Some(event) = self.events.find_by_provider_id(practice_id, provider_id).await? {
                return Ok(Some(event));
            }
        }
        if let Some(id) = embedded_id {
            if let Some(event) = self.events.get_event(id).await? {
                if event.practice_id == practice_id {
                    return Ok(Some(event));
                }
            }
        }
        Ok(None)
    }
}

fn local_is_newer(local: &CalendarEvent, remote_updated: Option<DateTime<Utc>>) -> bool {
    local.needs_push() && remote_updated.is_some_and(|remote| local.updated_at > remote)
}

fn stamp_synced(event: &mut CalendarEvent, remote_updated: Option<DateTime<Utc>>) {
    let stamp = remote_updated.unwrap_or_else(Utc::now);
    event.provider_updated_at = Some(stamp);
    event.updated_at = stamp;
}

/// Lazy stream of list pages, following page tokens until the last page.
///
/// Dropping the stream and building a new one restarts the listing.
pub fn page_stream<'a>(
    api: &'a dyn CalendarApi,
    calendar_id: &'a str,
    query: ListEventsQuery,
) -> impl Stream<Item = Result<CalendarPage>> + Send + 'a {
    stream::try_unfold(Some(query), move |next| async move {
        let Some(query) = next else {
            return Ok(None);
        };
        let page = api.list_events(calendar_id, &query).await?;
        let following = page
            .next_page_token
            .clone()
            .map(|token| query.clone().with_page_token(Some(token)));
        Ok(Some((page, following)))
    })
}

async fn collect(
    api: &dyn CalendarApi,
    calendar_id: &str,
    query: ListEventsQuery,
) -> Result<Listing> {
    let mut pages = std::pin::pin!(page_stream(api, calendar_id, query));
    let mut listing = Listing::default();
    let mut page_count = 0usize;

    while let Some(page) = pages.try_next().await? {
        page_count += 1;
        listing.events.extend(page.events);
        if page.next_page_token.is_none() {
            listing.next_sync_token = page.next_sync_token;
        }
    }

    debug!(pages = page_count, events = listing.events.len(), "listing collected");
    Ok(listing)
}
