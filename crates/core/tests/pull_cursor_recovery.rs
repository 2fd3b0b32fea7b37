//! Pull Reconciler: incremental sync, cursor invalidation and reconciliation.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, Utc};
use docketsync_core::calendar::{PullReconciler, PushWriter, SyncCursorManager};
use docketsync_domain::{DocketError, Practice, RemoteEvent, RemoteEventTime};
use support::calendar::{InMemoryCursorStore, InMemoryEventRepository, MockCalendarApi};
use support::local_event;
use uuid::Uuid;

struct Harness {
    practice: Practice,
    repo: Arc<InMemoryEventRepository>,
    cursors: Arc<InMemoryCursorStore>,
    reconciler: PullReconciler,
}

fn harness() -> Harness {
    let practice = Practice::new(Uuid::now_v7(), "Hale & Partners").with_refresh_token("rt");
    let repo = Arc::new(InMemoryEventRepository::new());
    let cursors = Arc::new(InMemoryCursorStore::default());
    let reconciler = PullReconciler::new(repo.clone(), SyncCursorManager::new(cursors.clone()));
    Harness { practice, repo, cursors, reconciler }
}

fn external(summary: &str, days_from_now: i64) -> RemoteEvent {
    let start = Utc::now() + Duration::days(days_from_now);
    RemoteEvent {
        summary: Some(summary.to_string()),
        start: Some(RemoteEventTime::date_time(start)),
        end: Some(RemoteEventTime::date_time(start + Duration::hours(1))),
        ..RemoteEvent::default()
    }
}

#[tokio::test]
async fn first_pull_is_a_bounded_full_sync() {
    let h = harness();
    let api = MockCalendarApi::new();
    api.seed_external(external("Bar association lunch", 2));
    api.seed_external(external("Partner meeting", -3));
    api.seed_external(external("Ancient history", -90));

    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert!(outcome.full_sync);
    assert!(!outcome.cursor_reset);
    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.created, 2);
    assert!(h.cursors.token(h.practice.id, "primary").is_some());

    for event in h.repo.all() {
        assert_eq!(event.practice_id, h.practice.id);
        assert!(event.matter_id.is_none());
        assert!(!event.needs_push(), "remote-origin events must not bounce back");
    }
}

#[tokio::test]
async fn incremental_pull_applies_remote_edits() {
    let h = harness();
    let api = MockCalendarApi::new();
    let id = api.seed_external(external("Strategy session", 1));
    h.reconciler.pull(&api, &h.practice).await.unwrap();
    let first_cursor = h.cursors.token(h.practice.id, "primary").unwrap();

    api.edit_remote(&id, "Strategy session (moved)");
    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert!(!outcome.full_sync);
    assert_eq!(outcome.fetched, 1);
    assert_eq!(outcome.updated, 1);
    assert_eq!(h.repo.all()[0].title, "Strategy session (moved)");
    assert_ne!(h.cursors.token(h.practice.id, "primary").unwrap(), first_cursor);
}

#[tokio::test]
async fn invalidated_cursor_restarts_as_full_sync() {
    let h = harness();
    let api = MockCalendarApi::new();
    api.seed_external(external("Intake call", 1));
    h.reconciler.pull(&api, &h.practice).await.unwrap();

    api.expire_sync_tokens();
    api.seed_external(external("New consult", 2));
    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert!(outcome.cursor_reset);
    assert!(outcome.full_sync);
    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.created, 1);
    assert_eq!(h.repo.all().len(), 2);
    assert!(h.cursors.token(h.practice.id, "primary").is_some());
}

#[tokio::test]
async fn second_invalidation_in_one_pass_is_transient() {
    let h = harness();
    let api = MockCalendarApi::new();
    h.cursors.put(h.practice.id, "primary", "sync-999");
    api.reject_all_listings();

    let err = h.reconciler.pull(&api, &h.practice).await.unwrap_err();

    assert!(matches!(err, DocketError::Transient(_)), "got {err:?}");
    assert!(h.cursors.token(h.practice.id, "primary").is_none());
}

#[tokio::test]
async fn page_failure_aborts_without_committing() {
    let h = harness();
    let api = MockCalendarApi::with_page_size(2);
    for day in 1..=5 {
        api.seed_external(external(&format!("Event {day}"), day));
    }
    h.cursors.put(h.practice.id, "primary", "sync-0");
    api.fail_listing_after(1);

    let err = h.reconciler.pull(&api, &h.practice).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(h.cursors.token(h.practice.id, "primary").as_deref(), Some("sync-0"));
    assert!(h.repo.all().is_empty());
}

#[tokio::test]
async fn follows_every_page() {
    let h = harness();
    let api = MockCalendarApi::with_page_size(2);
    for day in 1..=5 {
        api.seed_external(external(&format!("Event {day}"), day));
    }

    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert_eq!(outcome.fetched, 5);
    assert_eq!(outcome.created, 5);
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn remote_cancellation_soft_deletes_local() {
    let h = harness();
    let api = MockCalendarApi::new();
    let id = api.seed_external(external("Cancelled hearing", 3));
    h.reconciler.pull(&api, &h.practice).await.unwrap();

    api.cancel_remote(&id);
    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert_eq!(outcome.deleted, 1);
    let local = &h.repo.all()[0];
    assert!(local.is_deleted());
    assert!(local.provider_event_id.is_none());
    assert!(!local.needs_remote_delete());
}

#[tokio::test]
async fn own_pushed_events_come_back_unchanged() {
    let h = harness();
    let api = MockCalendarApi::new();
    let matter = Uuid::now_v7();
    let writer = PushWriter::new(h.repo.clone());

    h.reconciler.pull(&api, &h.practice).await.unwrap();
    h.repo.insert(local_event(h.practice.id, matter, "Closing argument"));
    writer.push_pending(&api, "primary", matter).await.unwrap();

    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert_eq!(outcome.fetched, 1);
    assert_eq!(outcome.changed(), 0);
    assert_eq!(h.repo.all().len(), 1);
}

#[tokio::test]
async fn matches_by_embedded_id_when_link_was_lost() {
    let h = harness();
    let api = MockCalendarApi::new();
    let matter = Uuid::now_v7();
    let event = local_event(h.practice.id, matter, "Expert witness prep");
    h.repo.insert(event.clone());

    h.reconciler.pull(&api, &h.practice).await.unwrap();
    let remote_id =
        api.insert_event_direct(&docketsync_core::calendar::mapper::to_remote(&event).unwrap()).await;

    h.reconciler.pull(&api, &h.practice).await.unwrap();

    let all = h.repo.all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].provider_event_id.as_deref(), Some(remote_id.as_str()));
}

#[tokio::test]
async fn unmappable_events_are_skipped() {
    let h = harness();
    let api = MockCalendarApi::new();
    let mut broken = external("No end", 1);
    broken.end = None;
    api.seed_external(broken);
    api.seed_external(RemoteEvent {
        summary: Some("Holiday".into()),
        start: Some(RemoteEventTime::date(
            (Utc::now() + Duration::days(4)).date_naive(),
        )),
        end: Some(RemoteEventTime::date(
            (Utc::now() + Duration::days(5)).date_naive(),
        )),
        ..RemoteEvent::default()
    });

    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.skipped, 1);
    let holiday = &h.repo.all()[0];
    assert!(holiday.all_day);
    assert_eq!(holiday.start.date_naive(), holiday.end.date_naive());
}

#[tokio::test]
async fn failed_local_write_leaves_cursor_for_replay() {
    let h = harness();
    let api = MockCalendarApi::new();
    api.seed_external(external("Docket call", 1));
    api.seed_external(external("Mediation", 2));
    h.cursors.put(h.practice.id, "primary", "sync-0");
    h.repo.fail_saves_for_title("Mediation", DocketError::Database("disk I/O error".into()));

    let err = h.reconciler.pull(&api, &h.practice).await.unwrap_err();

    assert!(matches!(err, DocketError::Database(_)), "got {err:?}");
    assert_eq!(h.cursors.token(h.practice.id, "primary").as_deref(), Some("sync-0"));

    h.repo.clear_save_failures();
    let outcome = h.reconciler.pull(&api, &h.practice).await.unwrap();

    assert_eq!(outcome.fetched, 2);
    assert_eq!(outcome.created, 1);
    assert_eq!(h.repo.titles(), vec!["Docket call".to_string(), "Mediation".to_string()]);
    assert_ne!(h.cursors.token(h.practice.id, "primary").as_deref(), Some("sync-0"));
}
