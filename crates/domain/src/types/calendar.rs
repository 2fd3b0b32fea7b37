//! Calendar events, their remote representation, and sync cursors
//!
//! [`RemoteEvent`] mirrors the provider's JSON event resource so adapters can
//! (de)serialize it directly. Only the event mapper reads its fields.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CALENDAR_PAGE_SIZE, REMOTE_STATUS_CANCELLED};
use crate::impl_status_conversions;

/// Classification of a local calendar event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Hearing,
    Deadline,
    Meeting,
    Consultation,
    Task,
    #[default]
    Other,
}

impl_status_conversions!(EventType {
    Hearing => "hearing",
    Deadline => "deadline",
    Meeting => "meeting",
    Consultation => "consultation",
    Task => "task",
    Other => "other",
});

/// Local calendar event owned by the portal.
///
/// All-day events store `start` and `end` at midnight UTC of the first and
/// last (inclusive) day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub practice_id: Uuid,
    pub matter_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub event_type: EventType,
    pub provider_event_id: Option<String>,
    pub provider_etag: Option<String>,
    pub provider_updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    /// New local event with no remote counterpart yet
    pub fn new(
        practice_id: Uuid,
        matter_id: Option<Uuid>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            practice_id,
            matter_id,
            task_id: None,
            title: title.into(),
            description: None,
            location: None,
            start,
            end,
            all_day: false,
            event_type: EventType::Other,
            provider_event_id: None,
            provider_etag: None,
            provider_updated_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Live event whose local state is ahead of the provider
    pub fn needs_push(&self) -> bool {
        if self.is_deleted() {
            return false;
        }
        match (&self.provider_event_id, self.provider_updated_at) {
            (None, _) | (Some(_), None) => true,
            (Some(_), Some(pushed)) => self.updated_at > pushed,
        }
    }

    /// Soft-deleted event that still has a remote counterpart
    pub const fn needs_remote_delete(&self) -> bool {
        self.is_deleted() && self.provider_event_id.is_some()
    }

    /// Forget the remote counterpart
    pub fn clear_provider_link(&mut self) {
        self.provider_event_id = None;
        self.provider_etag = None;
        self.provider_updated_at = None;
    }
}

/// Private extended properties (key → value)
pub type PrivateProperties = BTreeMap<String, String>;

/// Start or end of a remote event. Exactly one of `date` or `date_time` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RemoteEventTime {
    pub const fn date(date: NaiveDate) -> Self {
        Self { date: Some(date), date_time: None, time_zone: None }
    }

    pub fn date_time(instant: DateTime<Utc>) -> Self {
        Self { date: None, date_time: Some(instant), time_zone: Some("UTC".to_string()) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteExtendedProperties {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub private: PrivateProperties,
}

/// Event resource as exchanged with the calendar provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<RemoteEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<RemoteEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<RemoteExtendedProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl RemoteEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some(REMOTE_STATUS_CANCELLED)
    }

    pub fn private_property(&self, key: &str) -> Option<&str> {
        self.extended_properties.as_ref().and_then(|props| props.private.get(key)).map(String::as_str)
    }

    /// Local event id embedded by a previous push, if parseable
    pub fn embedded_uuid(&self, key: &str) -> Option<Uuid> {
        self.private_property(key).and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

/// Local fields recovered from a remote event by the mapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEventFields {
    pub provider_event_id: String,
    pub local_event_id: Option<Uuid>,
    pub matter_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub event_type: EventType,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub etag: Option<String>,
    pub updated: Option<DateTime<Utc>>,
}

/// Parameters for one call to the provider's list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEventsQuery {
    pub time_min: Option<DateTime<Utc>>,
    pub sync_token: Option<String>,
    pub page_token: Option<String>,
    pub show_deleted: bool,
    /// `key=value` filter on private extended properties
    pub private_extended_property: Option<String>,
    pub max_results: Option<u32>,
}

impl ListEventsQuery {
    /// Bounded full listing starting at `time_min`
    pub fn full(time_min: DateTime<Utc>) -> Self {
        Self { time_min: Some(time_min), max_results: Some(CALENDAR_PAGE_SIZE), ..Self::default() }
    }

    /// Incremental listing from an opaque cursor
    pub fn incremental(sync_token: impl Into<String>) -> Self {
        Self {
            sync_token: Some(sync_token.into()),
            show_deleted: true,
            max_results: Some(CALENDAR_PAGE_SIZE),
            ..Self::default()
        }
    }

    /// Lookup by a private extended property
    pub fn by_private_property(key: &str, value: &str) -> Self {
        Self { private_extended_property: Some(format!("{key}={value}")), ..Self::default() }
    }

    #[must_use]
    pub fn with_page_token(mut self, page_token: Option<String>) -> Self {
        self.page_token = page_token;
        self
    }
}

/// One page of the provider's list response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarPage {
    pub events: Vec<RemoteEvent>,
    pub next_page_token: Option<String>,
    pub next_sync_token: Option<String>,
}

/// Incremental sync cursor for one (practice, calendar) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub practice_id: Uuid,
    pub calendar_id: String,
    pub token: String,
    pub last_synced_at: DateTime<Utc>,
}
