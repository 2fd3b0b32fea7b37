use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Extension, Router};
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::routes;

pub fn router(ctx: Arc<AppContext>) -> Router {
    routes::router().layer(Extension(ctx))
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests.
///
/// The context's background tasks run for the lifetime of the server.
#[tracing::instrument(level = "info", skip_all, fields(%addr))]
pub async fn serve(
    addr: SocketAddr,
    ctx: Arc<AppContext>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "http server listening");

    ctx.start_background();
    let app = router(ctx.clone());
    let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;
    ctx.shutdown();
    served?;
    Ok(())
}
