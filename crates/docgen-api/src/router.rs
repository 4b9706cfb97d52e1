//! Route definitions for the Docgen HTTP API.
//!
//! Resource routes are mounted under `/api`; health checks stay at the
//! root so load balancers can reach them without the prefix.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    let api_routes = Router::new()
        .merge(generation_routes())
        .merge(operation_routes())
        .merge(thesis_routes())
        .merge(job_routes());

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::build_cors_layer(&state.config.server.cors))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Generation intake and status
fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/generations", post(handlers::generation::create_generation))
        .route("/generations/status", get(handlers::generation::get_status))
}

/// Provider operation checks
fn operation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/operations/status",
            post(handlers::operations::check_operation),
        )
        .route("/operations/poll", post(handlers::operations::poll_operation))
}

/// Versions, derived artifacts and passage search
fn thesis_routes() -> Router<AppState> {
    Router::new()
        .route("/theses/rollback", post(handlers::theses::rollback))
        .route("/theses/{id}/versions", get(handlers::theses::list_versions))
        .route("/theses/quiz", post(handlers::theses::request_quiz))
        .route(
            "/theses/search-queries",
            post(handlers::theses::request_search_queries),
        )
        .route("/theses/passages", post(handlers::theses::search_passages))
}

/// Queue inspection
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/stats", get(handlers::jobs::queue_stats))
        .route("/jobs/{queue}/{id}", get(handlers::jobs::get_job))
}

/// Health check endpoints
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/ready", get(handlers::health::ready))
}
