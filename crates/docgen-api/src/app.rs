//! Application builder and HTTP server loop.

use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use docgen_core::error::{AppError, ErrorKind};
use docgen_core::result::AppResult;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serve `state` until `shutdown` flips to `true`.
///
/// In-flight requests get `shutdown_grace_seconds` to finish.
pub async fn serve(state: AppState, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, format!("Failed to bind {addr}"), e)
        })?;
    info!(addr = %addr, "HTTP server listening");

    let app = build_app(state);
    let mut drain = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown.wait_for(|stop| *stop).await;
        info!("HTTP server shutting down");
    });

    tokio::select! {
        result = server => result.map_err(AppError::from),
        _ = async {
            let _ = drain.wait_for(|stop| *stop).await;
            tokio::time::sleep(grace).await;
        } => {
            info!("Grace period elapsed, dropping open connections");
            Ok(())
        }
    }
}
