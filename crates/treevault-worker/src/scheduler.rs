//! Cron scheduler for periodic maintenance tasks.

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use treevault_core::config::TrashConfig;
use treevault_core::error::AppError;

use crate::jobs::TrashPurgeJob;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Trash purge job
    purge: TrashPurgeJob,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(purge: TrashPurgeJob) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, purge })
    }

    /// Register all default scheduled tasks
    pub async fn register_default_tasks(&self, trash: &TrashConfig) -> Result<(), AppError> {
        self.register_trash_purge(&trash.purge_schedule).await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Trash purge on `schedule` (six-field cron, seconds first)
    async fn register_trash_purge(&self, schedule: &str) -> Result<(), AppError> {
        let purge = self.purge.clone();
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let purge = purge.clone();
            Box::pin(async move {
                if let Err(e) = purge.run(Utc::now()).await {
                    tracing::error!(job = TrashPurgeJob::NAME, error = %e, "Trash purge failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid trash purge schedule '{schedule}': {e}"
            ))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add trash_purge schedule: {e}"))
        })?;

        tracing::info!(schedule, "Registered: trash_purge");
        Ok(())
    }
}
