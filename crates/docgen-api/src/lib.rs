//! # docgen-api
//!
//! HTTP API layer for Docgen built on Axum.
//!
//! Provides the generation, status, operation, thesis and job endpoints,
//! middleware (CORS, request logging), extractors, DTOs and the mapping
//! from [`docgen_core::AppError`] to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
