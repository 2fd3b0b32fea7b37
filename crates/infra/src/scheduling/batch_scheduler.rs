//! Cron trigger for the batch sync.
//!
//! Wraps a [`BatchJob`] in a `tokio-cron-scheduler` job. Every run is bounded
//! by `job_timeout`, and a tick that fires while the previous run is still in
//! flight is skipped. Lifecycle is explicit: `start` spawns a monitor task
//! tied to a cancellation token, `stop` shuts the scheduler down and joins it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use docketsync_common::Clock;
use docketsync_core::batch::BatchOrchestrator;
use docketsync_domain::{Result, SyncConfig};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Work executed on every cron tick.
#[async_trait]
pub trait BatchJob: Send + Sync {
    async fn run(&self) -> Result<()>;
}

#[async_trait]
impl<C: Clock + 'static> BatchJob for BatchOrchestrator<C> {
    async fn run(&self) -> Result<()> {
        let summary = BatchOrchestrator::run(self).await?;
        if !summary.errors.is_empty() {
            warn!(errors = summary.errors.len(), "scheduled batch finished with errors");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BatchSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    pub job_timeout: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    pub join_timeout: Duration,
}

impl Default for BatchSchedulerConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for BatchSchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            cron_expression: config.cron_expression.clone(),
            job_timeout: Duration::from_secs(config.job_timeout_secs),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

pub struct BatchScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    config: BatchSchedulerConfig,
    job_id: Uuid,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    job: Arc<dyn BatchJob>,
    in_flight: Arc<AtomicBool>,
}

impl BatchScheduler {
    /// Create the scheduler and register the job. Fails with
    /// `JobRegistrationFailed` for an invalid cron expression.
    pub async fn new(config: BatchSchedulerConfig, job: Arc<dyn BatchJob>) -> SchedulerResult<Self> {
        let raw_scheduler =
            JobScheduler::new().await.map_err(|source| SchedulerError::CreationFailed { source })?;

        let mut scheduler = Self {
            scheduler: Arc::new(RwLock::new(raw_scheduler)),
            config,
            job_id: Uuid::nil(),
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            job,
            in_flight: Arc::new(AtomicBool::new(false)),
        };

        scheduler.job_id = scheduler.register_batch_job().await?;
        Ok(scheduler)
    }

    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, async move {
            let guard = scheduler.write().await;
            guard.start().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?
        .map_err(|source| SchedulerError::StartFailed { source })?;

        let cancel = self.cancellation.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            cancel.cancelled().await;
            debug!("batch scheduler monitor cancelled");
        }));

        info!("batch scheduler started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let scheduler = self.scheduler.clone();
        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move {
            let mut guard = scheduler.write().await;
            guard.shutdown().await
        })
        .await
        .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?
        .map_err(|source| SchedulerError::StopFailed { source })?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("batch scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.monitor_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    async fn register_batch_job(&mut self) -> SchedulerResult<Uuid> {
        if self.job_id != Uuid::nil() {
            return Ok(self.job_id);
        }

        let job = self.job.clone();
        let in_flight = self.in_flight.clone();
        let job_timeout = self.config.job_timeout;

        let definition = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let job = job.clone();
            let in_flight = in_flight.clone();

            Box::pin(async move {
                if in_flight.swap(true, Ordering::SeqCst) {
                    warn!("previous batch run still in progress; skipping tick");
                    return;
                }
                let started = Instant::now();

                match tokio::time::timeout(job_timeout, job.run()).await {
                    Ok(Ok(())) => {
                        info!(
                            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                            "scheduled batch finished"
                        );
                    }
                    Ok(Err(err)) => {
                        error!(kind = %err.kind(), error = %err, "scheduled batch failed");
                    }
                    Err(_) => {
                        warn!(timeout_secs = job_timeout.as_secs(), "scheduled batch timed out");
                    }
                }

                in_flight.store(false, Ordering::SeqCst);
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = definition.guid();
        let scheduler = self.scheduler.write().await;
        scheduler
            .add(definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(cron = %self.config.cron_expression, %job_id, "registered batch job");
        Ok(job_id)
    }
}

impl Drop for BatchScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("BatchScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use docketsync_domain::DocketError;

    use super::*;

    struct CountingJob {
        runs: AtomicUsize,
        delay: Duration,
    }

    impl CountingJob {
        fn new(delay: Duration) -> Self {
            Self { runs: AtomicUsize::new(0), delay }
        }

        fn run_count(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BatchJob for CountingJob {
        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(())
        }
    }

    fn fast_config() -> BatchSchedulerConfig {
        BatchSchedulerConfig {
            cron_expression: "*/1 * * * * *".into(),
            job_timeout: Duration::from_secs(5),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_job() {
        let job = Arc::new(CountingJob::new(Duration::ZERO));
        let mut scheduler = BatchScheduler::new(fast_config(), job.clone()).await.expect("created");

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert!(job.run_count() >= 1);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_run_is_not_overlapped() {
        let job = Arc::new(CountingJob::new(Duration::from_millis(3500)));
        let mut scheduler = BatchScheduler::new(fast_config(), job.clone()).await.expect("created");

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_millis(3000)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert_eq!(job.run_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let job = Arc::new(CountingJob::new(Duration::ZERO));
        let mut scheduler = BatchScheduler::new(fast_config(), job).await.expect("created");

        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_without_start_is_rejected() {
        let job = Arc::new(CountingJob::new(Duration::ZERO));
        let mut scheduler = BatchScheduler::new(fast_config(), job).await.expect("created");
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn invalid_cron_is_a_registration_error() {
        let job = Arc::new(CountingJob::new(Duration::ZERO));
        let config = BatchSchedulerConfig { cron_expression: "every so often".into(), ..fast_config() };
        let err = BatchScheduler::new(config, job).await.err().expect("rejected");
        assert!(matches!(err, SchedulerError::JobRegistrationFailed { .. }));
        assert!(matches!(DocketError::from(err), DocketError::Config(_)));
    }
}
