//! Application context
//!
//! Wires the infra adapters into the core services once at startup. Handlers
//! reach everything through a shared `Arc<AppContext>`.

use std::sync::Arc;
use std::time::Duration;

use docketsync_common::{RateLimiter, RateLimiterConfig};
use docketsync_core::{
    BatchOptions, BatchOrchestrator, CalendarEventRepository, DocumentFiler, FolderProvisioner,
    MatterStorageService, PracticeDirectory, ProviderClientFactory, PullReconciler, PushWriter,
    SyncCursorManager,
};
use docketsync_domain::{Config, DocketError, Result};
use docketsync_infra::{
    DbManager, GoogleClientFactory, HttpClient, SqliteCalendarEventRepository,
    SqliteDocumentRepository, SqliteFolderRecordRepository, SqlitePracticeDirectory,
    SqliteSyncCursorStore,
};
use sha2::{Digest, Sha256};
use tracing::info;

type SecretDigest = [u8; 32];

pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub storage: Arc<MatterStorageService>,
    pub trigger_limiter: RateLimiter,
    cron_secret: Option<SecretDigest>,
}

impl AppContext {
    /// Open the database, run migrations and build the service graph.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let http = HttpClient::builder().timeout(config.sync.request_timeout()).build()?;
        let factory: Arc<dyn ProviderClientFactory> =
            Arc::new(GoogleClientFactory::new(http, config.google.clone()));
        let directory: Arc<dyn PracticeDirectory> =
            Arc::new(SqlitePracticeDirectory::new(db.clone()));
        let events: Arc<dyn CalendarEventRepository> =
            Arc::new(SqliteCalendarEventRepository::new(db.clone()));

        let cursors = SyncCursorManager::new(Arc::new(SqliteSyncCursorStore::new(db.clone())));
        let pull = Arc::new(
            PullReconciler::new(events.clone(), cursors).with_lookback_days(config.sync.lookback_days),
        );
        let push = Arc::new(
            PushWriter::new(events).with_dedupe_before_create(config.sync.dedupe_before_create),
        );
        let provider_limiter = Arc::new(RateLimiter::new(limiter_config(
            config.sync.rate_limit_max_requests,
            config.sync.rate_limit_window(),
        )?));
        let orchestrator = Arc::new(
            BatchOrchestrator::new(directory.clone(), factory.clone(), pull, push, provider_limiter)
                .with_options(BatchOptions::from(&config.sync)),
        );

        let provisioner = Arc::new(FolderProvisioner::new(
            Arc::new(SqliteFolderRecordRepository::new(db.clone())),
            config.google.root_folder_id.clone(),
        ));
        let filer =
            DocumentFiler::new(provisioner.clone(), Arc::new(SqliteDocumentRepository::new(db.clone())));
        let storage = Arc::new(MatterStorageService::new(directory, factory, provisioner, filer));

        let trigger_limiter = RateLimiter::new(limiter_config(
            config.server.trigger_rate_limit_max,
            Duration::from_secs(config.server.trigger_rate_limit_window_secs),
        )?);

        let cron_secret = config
            .server
            .cron_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
            .map(digest);

        info!(
            db_path = %config.database.path,
            trigger_secret_configured = cron_secret.is_some(),
            "application context ready"
        );

        Ok(Self { config, db, orchestrator, storage, trigger_limiter, cron_secret })
    }

    /// Compare a presented bearer token with the configured secret.
    ///
    /// Returns `None` when no secret is configured.
    pub fn verify_secret(&self, presented: &str) -> Option<bool> {
        self.cron_secret.map(|expected| digest(presented) == expected)
    }

    pub const fn secret_configured(&self) -> bool {
        self.cron_secret.is_some()
    }

    /// Start purging expired trigger rate limit windows once per window.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_background(&self) {
        let interval = Duration::from_secs(self.config.server.trigger_rate_limit_window_secs);
        self.trigger_limiter.start_sweeper(interval);
        info!(interval_secs = interval.as_secs(), "trigger rate limit sweeper started");
    }

    /// Stop background tasks started by [`AppContext::start_background`].
    pub fn shutdown(&self) {
        self.trigger_limiter.shutdown();
    }
}

fn limiter_config(max_requests: u32, window: Duration) -> Result<RateLimiterConfig> {
    RateLimiterConfig::builder()
        .max_requests(max_requests)
        .window(window)
        .build()
        .map_err(|err| DocketError::Config(err.to_string()))
}

fn digest(secret: &str) -> SecretDigest {
    Sha256::digest(secret.as_bytes()).into()
}
