//! Event Mapper: local calendar events ↔ provider event resources
//!
//! All-day events are date-only on the provider side and its end date is
//! exclusive, so a local event ending on day `D` (inclusive) is sent with
//! `end.date = D + 1` and mapped back the same way. Timed events are sent as
//! UTC instants truncated to whole seconds.
//!
//! Every pushed event carries private extended properties that let a later
//! pull (or a dedupe lookup) find the local record again.

use chrono::{DateTime, Days, NaiveDate, Timelike, Utc};
use docketsync_domain::constants::{PROP_EVENT_ID, PROP_EVENT_TYPE, PROP_MATTER_ID, PROP_TASK_ID};
use docketsync_domain::{
    CalendarEvent, DocketError, EventType, PrivateProperties, RemoteEvent, RemoteEventFields,
    RemoteEventTime, RemoteExtendedProperties, Result,
};

const UNTITLED: &str = "(No title)";

/// Build the provider resource for a local event.
///
/// # Errors
/// `DocketError::Validation` if the event ends before it starts.
pub fn to_remote(event: &CalendarEvent) -> Result<RemoteEvent> {
    let (start, end) = if event.all_day {
        let first = event.start.date_naive();
        let last = event.end.date_naive();
        if last < first {
            return Err(DocketError::Validation(format!(
                "event {} ends ({last}) before it starts ({first})",
                event.id
            )));
        }
        (RemoteEventTime::date(first), RemoteEventTime::date(next_day(last, event)?))
    } else {
        let start = truncate_to_second(event.start);
        let end = truncate_to_second(event.end);
        if end < start {
            return Err(DocketError::Validation(format!(
                "event {} ends ({end}) before it starts ({start})",
                event.id
            )));
        }
        (RemoteEventTime::date_time(start), RemoteEventTime::date_time(end))
    };

    let mut private = PrivateProperties::new();
    private.insert(PROP_EVENT_ID.to_string(), event.id.to_string());
    private.insert(PROP_EVENT_TYPE.to_string(), event.event_type.as_str().to_string());
    if let Some(matter_id) = event.matter_id {
        private.insert(PROP_MATTER_ID.to_string(), matter_id.to_string());
    }
    if let Some(task_id) = event.task_id {
        private.insert(PROP_TASK_ID.to_string(), task_id.to_string());
    }

    Ok(RemoteEvent {
        summary: Some(event.title.clone()),
        description: event.description.clone(),
        location: event.location.clone(),
        start: Some(start),
        end: Some(end),
        extended_properties: Some(RemoteExtendedProperties { private }),
        ..RemoteEvent::default()
    })
}

/// Recover local fields from a provider resource.
///
/// # Errors
/// `DocketError::Validation` if the resource has no id, is missing its start
/// or end, mixes date-only and timed bounds, or ends before it starts.
pub fn from_remote(remote: &RemoteEvent) -> Result<RemoteEventFields> {
    let provider_event_id = remote
        .id
        .clone()
        .ok_or_else(|| DocketError::Validation("remote event has no id".into()))?;

    let start = remote.start.as_ref().ok_or_else(|| {
        DocketError::Validation(format!("remote event {provider_event_id} has no start"))
    })?;
    let end = remote.end.as_ref().ok_or_else(|| {
        DocketError::Validation(format!("remote event {provider_event_id} has no end"))
    })?;

    let (start, end, all_day) = match (start.date, start.date_time, end.date, end.date_time) {
        (Some(first), _, Some(exclusive_end), _) => {
            let last = exclusive_end.checked_sub_days(Days::new(1)).ok_or_else(|| {
                DocketError::Validation(format!(
                    "remote event {provider_event_id} has an out of range end date"
                ))
            })?;
            if last < first {
                return Err(DocketError::Validation(format!(
                    "remote event {provider_event_id} ends before it starts"
                )));
            }
            (midnight_utc(first), midnight_utc(last), true)
        }
        (None, Some(start), None, Some(end)) => {
            let start = truncate_to_second(start);
            let end = truncate_to_second(end);
            if end < start {
                return Err(DocketError::Validation(format!(
                    "remote event {provider_event_id} ends before it starts"
                )));
            }
            (start, end, false)
        }
        _ => {
            return Err(DocketError::Validation(format!(
                "remote event {provider_event_id} has inconsistent start/end"
            )))
        }
    };

    let event_type = remote
        .private_property(PROP_EVENT_TYPE)
        .and_then(|raw| raw.parse::<EventType>().ok())
        .unwrap_or_default();

    Ok(RemoteEventFields {
        provider_event_id,
        local_event_id: remote.embedded_uuid(PROP_EVENT_ID),
        matter_id: remote.embedded_uuid(PROP_MATTER_ID),
        task_id: remote.embedded_uuid(PROP_TASK_ID),
        event_type,
        title: remote
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNTITLED)
            .to_string(),
        description: remote.description.clone(),
        location: remote.location.clone(),
        start,
        end,
        all_day,
        etag: remote.etag.clone(),
        updated: remote.updated,
    })
}

/// Overwrite an event's content with fields from the provider.
///
/// Identity fields (`id`, `practice_id`, `created_at`) are left alone; the
/// matter and task links are only filled in, never cleared.
pub fn apply_remote(event: &mut CalendarEvent, fields: &RemoteEventFields) {
    event.title.clone_from(&fields.title);
    event.description.clone_from(&fields.description);
    event.location.clone_from(&fields.location);
    event.start = fields.start;
    event.end = fields.end;
    event.all_day = fields.all_day;
    event.event_type = fields.event_type;
    if event.matter_id.is_none() {
        event.matter_id = fields.matter_id;
    }
    if event.task_id.is_none() {
        event.task_id = fields.task_id;
    }
    event.provider_event_id = Some(fields.provider_event_id.clone());
    event.provider_etag.clone_from(&fields.etag);
}

fn next_day(date: NaiveDate, event: &CalendarEvent) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(1)).ok_or_else(|| {
        DocketError::Validation(format!("event {} has an out of range end date", event.id))
    })
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn truncate_to_second(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.with_nanosecond(0).unwrap_or(instant)
}
