//! # docgen-database
//!
//! The job record store. Store traits for generation status, thesis
//! artifacts, and passage search, with PostgreSQL repositories and
//! in-memory implementations selected by `database.backend`.

pub mod connection;
mod error;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{PassageIndex, StatusStore, Stores, ThesisStore};
