//! In-memory broker backend.

pub mod store;

pub use store::MemoryQueueBroker;
