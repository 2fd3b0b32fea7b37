use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use docketsync_api::logging::{self, LogFormat};
use docketsync_api::AppContext;
use docketsync_infra::{config, BatchScheduler, BatchSchedulerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(LogFormat::from_env())?;

    let config = config::load().context("loading configuration")?;
    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address))?;
    let scheduler_config = BatchSchedulerConfig::from(&config.sync);
    let scheduler_enabled = config.sync.scheduler_enabled;

    let ctx = Arc::new(AppContext::new(config).context("building application context")?);

    let mut scheduler = if scheduler_enabled {
        let mut scheduler = BatchScheduler::new(scheduler_config, ctx.orchestrator.clone()).await?;
        scheduler.start().await?;
        info!(job_id = %scheduler.job_id(), "batch scheduler enabled");
        Some(scheduler)
    } else {
        info!("batch scheduler disabled; waiting for external triggers");
        None
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        signal.cancel();
    });

    docketsync_api::serve(addr, ctx, shutdown).await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.stop().await?;
    }
    info!("docketsync stopped");
    Ok(())
}
