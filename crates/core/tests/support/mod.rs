//! Shared test helpers for `docketsync-core` integration tests.
//!
//! In-memory fakes for every port so the sync pipeline, provisioning and the
//! batch orchestrator can be exercised without a database or network.

#![allow(dead_code)]

pub mod calendar;
pub mod directory;
pub mod storage;

use chrono::{Duration, DurationRound, Utc};
use docketsync_domain::CalendarEvent;
use uuid::Uuid;

/// A one-hour timed event starting tomorrow, not yet pushed.
pub fn local_event(practice_id: Uuid, matter_id: Uuid, title: &str) -> CalendarEvent {
    let start = Utc::now().duration_trunc(Duration::hours(1)).unwrap() + Duration::days(1);
    CalendarEvent::new(practice_id, Some(matter_id), title, start, start + Duration::hours(1))
}
