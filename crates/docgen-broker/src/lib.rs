//! # docgen-broker
//!
//! Message broker implementations behind the job queue. Supports two modes:
//!
//! - **redis**: shared broker for multiple worker processes, using the
//!   [redis](https://crates.io/crates/redis) crate with a lazily opened,
//!   auto-reconnecting connection
//! - **memory**: in-process broker for tests and single-process development
//!
//! The backend is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::BrokerManager;
