//! JSON-over-HTTP boundary for the tracking service

pub mod actor;
pub mod responses;
pub mod routes;

use anyhow::Result;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

pub use actor::{RequestActor, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
pub use responses::ApiError;
pub use routes::{router, AppState};

/// Serve the API on `listener` until `shutdown` resolves, then let in-flight
/// requests finish.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("HistoPath Tracker API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("HTTP server stopped");
    Ok(())
}
