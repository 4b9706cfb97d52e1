//! # docgen-core
//!
//! Core crate for Docgen. Contains the layered configuration schema,
//! typed identifiers, the message-broker abstraction used by the job
//! queue, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Docgen crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
