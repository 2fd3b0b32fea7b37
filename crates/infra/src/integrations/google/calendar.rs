//! Google Calendar v3 adapter for the `CalendarApi` port.

use async_trait::async_trait;
use chrono::SecondsFormat;
use docketsync_core::calendar::ports::CalendarApi;
use docketsync_domain::{CalendarPage, DocketError, ListEventsQuery, RemoteEvent, Result};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument};

use super::oauth::AccessToken;
use super::types::EventsListResponse;
use crate::errors::status_error;
use crate::http::HttpClient;

/// Calendar client bound to one practice's access token.
pub struct GoogleCalendarClient {
    http: HttpClient,
    base_url: String,
    token: AccessToken,
}

impl GoogleCalendarClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>, token: AccessToken) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url, token }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(calendar_id))
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!("{}/{}", self.events_url(calendar_id), urlencoding::encode(event_id))
    }

    /// Send a request addressed to a single event.
    ///
    /// Google answers 410 for an event that was already deleted; for
    /// single-resource calls that means the same as 404.
    async fn send_event_request(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self.http.send(request.bearer_auth(self.token.secret())).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::GONE => DocketError::NotFound(format!("event already deleted: HTTP {status}")),
            _ => status_error(status, &body),
        })
    }
}

/// Query parameters for `events.list`.
///
/// Google rejects `timeMin` and property filters combined with a
/// `syncToken`, so those are only sent on non-incremental listings.
pub fn list_params(query: &ListEventsQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    match &query.sync_token {
        Some(token) => params.push(("syncToken", token.clone())),
        None => {
            if let Some(time_min) = query.time_min {
                params.push(("timeMin", time_min.to_rfc3339_opts(SecondsFormat::Secs, true)));
            }
            if let Some(filter) = &query.private_extended_property {
                params.push(("privateExtendedProperty", filter.clone()));
            }
        }
    }
    if let Some(page_token) = &query.page_token {
        params.push(("pageToken", page_token.clone()));
    }
    if query.show_deleted {
        params.push(("showDeleted", "true".to_string()));
    }
    if let Some(max_results) = query.max_results {
        params.push(("maxResults", max_results.to_string()));
    }
    params
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    #[instrument(skip(self, query), fields(incremental = query.sync_token.is_some(), paged = query.page_token.is_some()))]
    async fn list_events(&self, calendar_id: &str, query: &ListEventsQuery) -> Result<CalendarPage> {
        let request = self
            .http
            .request(Method::GET, self.events_url(calendar_id))
            .bearer_auth(self.token.secret())
            .query(&list_params(query));

        let page: EventsListResponse = self.http.send_json(request).await?;
        debug!(
            items = page.items.len(),
            has_next_page = page.next_page_token.is_some(),
            "listed calendar events"
        );

        Ok(CalendarPage {
            events: page.items,
            next_page_token: page.next_page_token,
            next_sync_token: page.next_sync_token,
        })
    }

    #[instrument(skip(self, event))]
    async fn insert_event(&self, calendar_id: &str, event: &RemoteEvent) -> Result<RemoteEvent> {
        let request = self.http.request(Method::POST, self.events_url(calendar_id)).json(event);
        let created: RemoteEvent = self
            .send_event_request(request)
            .await?
            .json()
            .await
            .map_err(|err| DocketError::Validation(format!("malformed event response: {err}")))?;
        debug!(provider_event_id = ?created.id, "calendar event created");
        Ok(created)
    }

    #[instrument(skip(self, event))]
    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &RemoteEvent,
    ) -> Result<RemoteEvent> {
        let request =
            self.http.request(Method::PUT, self.event_url(calendar_id, event_id)).json(event);
        self.send_event_request(request)
            .await?
            .json()
            .await
            .map_err(|err| DocketError::Validation(format!("malformed event response: {err}")))
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()> {
        let request = self.http.request(Method::DELETE, self.event_url(calendar_id, event_id));
        self.send_event_request(request).await?;
        Ok(())
    }
}
