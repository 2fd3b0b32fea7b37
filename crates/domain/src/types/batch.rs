//! Outcomes of pull passes, push passes and whole batch runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{DocketError, ErrorKind};

/// Result of one Pull Reconciler pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullOutcome {
    /// Remote events received across all pages
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Events that could not be mapped or matched
    pub skipped: usize,
    /// Pass ran without a cursor
    pub full_sync: bool,
    /// Provider rejected the stored cursor during this pass
    pub cursor_reset: bool,
}

impl PullOutcome {
    pub const fn changed(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// A single event the Push Writer could not reconcile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFailure {
    pub event_id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
}

impl PushFailure {
    pub fn new(event_id: Uuid, error: &DocketError) -> Self {
        Self { event_id, kind: error.kind(), message: error.message().to_string() }
    }
}

/// Result of pushing a matter's pending events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failures: Vec<PushFailure>,
}

impl PushOutcome {
    pub const fn synced(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// Per-matter result captured by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatterSyncOutcome {
    pub matter_id: Uuid,
    pub practice_id: Uuid,
    pub push: PushOutcome,
}

/// Error entry in a batch summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub practice_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matter_id: Option<Uuid>,
    pub kind: ErrorKind,
    pub message: String,
}

impl BatchError {
    pub fn new(practice_id: Uuid, matter_id: Option<Uuid>, error: &DocketError) -> Self {
        Self { practice_id, matter_id, kind: error.kind(), message: error.message().to_string() }
    }
}

/// Aggregate result of one batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub practices_processed: usize,
    pub matters_processed: usize,
    /// Matters not pushed because their practice's pull pass failed
    #[serde(default)]
    pub matters_skipped: usize,
    pub total_synced: usize,
    pub total_skipped: usize,
    pub errors: Vec<BatchError>,
}

impl BatchSummary {
    pub const fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            practices_processed: 0,
            matters_processed: 0,
            matters_skipped: 0,
            total_synced: 0,
            total_skipped: 0,
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, practice_id: Uuid, matter_id: Option<Uuid>, error: &DocketError) {
        self.errors.push(BatchError::new(practice_id, matter_id, error));
    }

    pub fn absorb_pull(&mut self, outcome: &PullOutcome) {
        self.total_synced += outcome.changed();
        self.total_skipped += outcome.skipped;
    }

    /// Count a matter's push; individual event failures become error entries
    pub fn absorb_push(&mut self, practice_id: Uuid, matter_id: Uuid, outcome: &PushOutcome) {
        self.total_synced += outcome.synced();
        self.total_skipped += outcome.failures.len();
        for failure in &outcome.failures {
            self.errors.push(BatchError {
                practice_id,
                matter_id: Some(matter_id),
                kind: failure.kind,
                message: format!("event {}: {}", failure.event_id, failure.message),
            });
        }
    }

    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = Some(finished_at);
    }
}
