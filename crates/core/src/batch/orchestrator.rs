//! Batch Orchestrator
//!
//! Fans a sync run out across every practice with a credential and every
//! eligible matter inside it. Work within a practice is sequential: one pull
//! pass first, then each matter's pending pushes, paced by the practice's
//! provider rate limit. Failures are recorded in the summary and never abort
//! the run. An authentication failure ends the practice early, and a failed
//! pull skips the practice's pushes for this run.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use docketsync_common::{Clock, RateLimiter, SystemClock};
use docketsync_domain::constants::provider_rate_limit_key;
use docketsync_domain::{
    BatchSummary, DocketError, Matter, Practice, Result, SyncConfig,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::calendar::{PullReconciler, PushWriter};
use crate::practice_ports::PracticeDirectory;
use crate::provider_ports::ProviderClientFactory;

/// Pacing knobs for a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Pause between consecutive matters of a practice
    pub inter_item_delay: Duration,
    /// Longest total wait for one rate limiter slot
    pub max_rate_limit_wait: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for BatchOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            inter_item_delay: config.inter_item_delay(),
            max_rate_limit_wait: config.max_rate_limit_wait(),
        }
    }
}

pub struct BatchOrchestrator<C: Clock = SystemClock> {
    directory: Arc<dyn PracticeDirectory>,
    factory: Arc<dyn ProviderClientFactory>,
    pull: Arc<PullReconciler>,
    push: Arc<PushWriter>,
    limiter: Arc<RateLimiter<C>>,
    options: BatchOptions,
}

impl<C: Clock> BatchOrchestrator<C> {
    pub fn new(
        directory: Arc<dyn PracticeDirectory>,
        factory: Arc<dyn ProviderClientFactory>,
        pull: Arc<PullReconciler>,
        push: Arc<PushWriter>,
        limiter: Arc<RateLimiter<C>>,
    ) -> Self {
        Self { directory, factory, pull, push, limiter, options: BatchOptions::default() }
    }

    #[must_use]
    pub const fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Sync every eligible matter of every practice with a credential.
    ///
    /// Only a failure to enumerate practices is returned as an error.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<BatchSummary> {
        let mut summary = BatchSummary::started(Utc::now());
        let practices = self.directory.list_practices_with_credentials().await?;
        info!(practices = practices.len(), "batch sync started");

        for practice in &practices {
            self.run_practice(practice, None, &mut summary).await;
        }

        summary.finish(Utc::now());
        info!(
            practices = summary.practices_processed,
            matters = summary.matters_processed,
            matters_skipped = summary.matters_skipped,
            synced = summary.total_synced,
            skipped = summary.total_skipped,
            errors = summary.errors.len(),
            "batch sync finished"
        );
        Ok(summary)
    }

    /// Sync a single matter on demand.
    ///
    /// # Errors
    /// `NotFound` for an unknown matter or practice, `Authentication` when
    /// the practice has no credential. Provider failures are reported in the
    /// summary like a regular run.
    #[instrument(skip(self))]
    pub async fn run_for_matter(&self, matter_id: Uuid) -> Result<BatchSummary> {
        let matter = self
            .directory
            .get_matter(matter_id)
            .await?
            .ok_or_else(|| DocketError::NotFound(format!("matter {matter_id}")))?;
        let practice = self
            .directory
            .get_practice(matter.practice_id)
            .await?
            .ok_or_else(|| DocketError::NotFound(format!("practice {}", matter.practice_id)))?;
        if !practice.has_credential() {
            return Err(DocketError::Authentication(format!(
                "practice {} has no provider credential",
                practice.id
            )));
        }

        let mut summary = BatchSummary::started(Utc::now());
        self.run_practice(&practice, Some(&matter), &mut summary).await;
        summary.finish(Utc::now());
        Ok(summary)
    }

    async fn run_practice(
        &self,
        practice: &Practice,
        only: Option<&Matter>,
        summary: &mut BatchSummary,
    ) {
        let Some(token) = practice.refresh_token.as_ref() else {
            debug!(practice_id = %practice.id, "practice has no credential, skipping");
            return;
        };
        summary.practices_processed += 1;

        let clients = match self.factory.connect(token).await {
            Ok(clients) => clients,
            Err(err) => {
                warn!(practice_id = %practice.id, error = %err, "could not connect provider clients, skipping practice");
                summary.record_error(practice.id, None, &err);
                return;
            }
        };
        let key = provider_rate_limit_key(&practice.id);

        let pulled = match self.wait_for_slot(&key).await {
            Ok(()) => self.pull.pull(clients.calendar.as_ref(), practice).await,
            Err(err) => Err(err),
        };
        let pull_failed = match pulled {
            Ok(outcome) => {
                summary.absorb_pull(&outcome);
                false
            }
            Err(err) => {
                warn!(practice_id = %practice.id, error = %err, "pull pass failed");
                summary.record_error(practice.id, None, &err);
                if err.is_authentication() {
                    return;
                }
                true
            }
        };

        let matters = match only {
            Some(matter) => vec![matter.clone()],
            None => match self.directory.list_eligible_matters(practice.id).await {
                Ok(matters) => matters,
                Err(err) => {
                    warn!(practice_id = %practice.id, error = %err, "could not list matters");
                    summary.record_error(practice.id, None, &err);
                    return;
                }
            },
        };

        // Pushes only run against a reconciled calendar.
        if pull_failed {
            warn!(practice_id = %practice.id, matters = matters.len(), "skipping pushes until the next pull succeeds");
            summary.matters_skipped += matters.len();
            return;
        }

        for (index, matter) in matters.iter().enumerate() {
            if index > 0 && !self.options.inter_item_delay.is_zero() {
                tokio::time::sleep(self.options.inter_item_delay).await;
            }
            summary.matters_processed += 1;

            if let Err(err) = self.wait_for_slot(&key).await {
                warn!(practice_id = %practice.id, matter_id = %matter.id, error = %err, "rate limit wait exhausted");
                summary.record_error(practice.id, Some(matter.id), &err);
                continue;
            }

            match self.push.push_pending(clients.calendar.as_ref(), &practice.calendar_id, matter.id).await {
                Ok(outcome) => summary.absorb_push(practice.id, matter.id, &outcome),
                Err(err) => {
                    warn!(practice_id = %practice.id, matter_id = %matter.id, error = %err, "matter push failed");
                    summary.record_error(practice.id, Some(matter.id), &err);
                    if err.is_authentication() {
                        warn!(practice_id = %practice.id, "credential rejected, skipping remaining matters");
                        break;
                    }
                }
            }
        }
    }

    /// Block until the limiter admits `key`, up to `max_rate_limit_wait`.
    async fn wait_for_slot(&self, key: &str) -> Result<()> {
        let mut waited = Duration::ZERO;
        loop {
            let decision = self.limiter.check(key);
            if decision.allowed {
                return Ok(());
            }
            let remaining = self.options.max_rate_limit_wait.saturating_sub(waited);
            if remaining.is_zero() {
                return Err(DocketError::Transient(format!(
                    "provider rate limit still exhausted after {}ms",
                    waited.as_millis()
                )));
            }
            let pause = decision.retry_after.min(remaining).max(Duration::from_millis(1));
            debug!(
                key,
                pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
                "waiting for rate limit window"
            );
            tokio::time::sleep(pause).await;
            waited += pause;
        }
    }
}
