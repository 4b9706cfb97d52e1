//! Core traits defined in `docgen-core` and implemented by other crates.

pub mod broker;

pub use broker::{FinishedSet, QueueBroker, QueueCounts};
