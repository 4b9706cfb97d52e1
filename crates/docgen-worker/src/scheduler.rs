//! Cron scheduler for queue maintenance.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use docgen_core::config::WorkerConfig;
use docgen_core::error::AppError;

use crate::executor::JobExecutor;
use crate::queue::JobQueue;

/// Cron-based scheduler for periodic queue maintenance.
pub struct CronScheduler {
    /// The underlying job scheduler.
    scheduler: JobScheduler,
    /// Queue being maintained.
    queue: Arc<JobQueue>,
    /// Notified when recovery fails a job terminally.
    executor: Arc<JobExecutor>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler.
    pub async fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            queue,
            executor,
        })
    }

    /// Register the maintenance tasks configured in `config`.
    pub async fn register_default_tasks(&self, config: &WorkerConfig) -> Result<(), AppError> {
        self.register_stall_recovery(&config.recovery_cron).await?;
        self.register_queue_stats(&config.stats_cron).await?;

        info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        info!("Cron scheduler started");
        Ok(())
    }

    /// Shut the scheduler down.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        info!("Cron scheduler shut down");
        Ok(())
    }

    /// Stalled job recovery: re-queue active jobs whose worker died.
    async fn register_stall_recovery(&self, schedule: &str) -> Result<(), AppError> {
        let queue = Arc::clone(&self.queue);
        let executor = Arc::clone(&self.executor);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            let executor = Arc::clone(&executor);
            Box::pin(async move {
                debug!("Running stalled job recovery");
                match queue.recover_stalled(Utc::now()).await {
                    Ok(recovery) => {
                        if recovery.requeued > 0 {
                            info!(recovered = recovery.requeued, "Stalled jobs re-queued");
                        }
                        for job in &recovery.failed {
                            let reason = job.last_error.as_deref().unwrap_or("Worker stalled");
                            if let Err(e) = executor.terminal_failure(job, reason).await {
                                error!(job_id = %job.id, "Failed to settle stalled job: {}", e);
                            }
                        }
                    }
                    Err(e) => error!("Stalled job recovery failed: {}", e),
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid stall recovery schedule '{schedule}': {e}"))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add stall recovery schedule: {e}"))
        })?;

        info!("Registered: stall_recovery ({})", schedule);
        Ok(())
    }

    /// Queue statistics: log list sizes of every queue.
    async fn register_queue_stats(&self, schedule: &str) -> Result<(), AppError> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                match queue.stats().await {
                    Ok(stats) => {
                        for q in stats.queues {
                            info!(
                                queue = %q.name,
                                waiting = q.counts.waiting,
                                active = q.counts.active,
                                delayed = q.counts.delayed,
                                completed = q.counts.completed,
                                failed = q.counts.failed,
                                "Queue statistics"
                            );
                        }
                    }
                    Err(e) => error!("Failed to collect queue statistics: {}", e),
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid queue stats schedule '{schedule}': {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add queue stats schedule: {e}")))?;

        info!("Registered: queue_stats ({})", schedule);
        Ok(())
    }
}
