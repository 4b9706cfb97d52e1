//! Background job processing for Docgen.
//!
//! This crate provides:
//! - The durable job queue (retry, backoff and retention over a broker)
//! - A worker runner that claims jobs and executes them concurrently
//! - A job executor that dispatches jobs to the handler for their kind
//! - A cron scheduler for stalled-job recovery and queue statistics
//! - The generation, quiz and search query job handlers

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{EnqueueRequest, FailOutcome, JobQueue, QueueStats, StallRecovery};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
