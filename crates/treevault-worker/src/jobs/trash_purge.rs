//! Hard-deletes trashed resources whose retention has elapsed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use treevault_core::result::AppResult;
use treevault_service::trash::{PurgeReport, TrashEngine};

/// Runs [`TrashEngine::purge_expired`], one run at a time.
#[derive(Debug, Clone)]
pub struct TrashPurgeJob {
    /// Trash engine
    engine: TrashEngine,
    /// Held while a run is in progress
    running: Arc<Mutex<()>>,
}

impl TrashPurgeJob {
    /// Name the job is registered under
    pub const NAME: &'static str = "trash_purge";

    /// Create a new purge job
    pub fn new(engine: TrashEngine) -> Self {
        Self {
            engine,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Purge everything expired as of `now`.
    ///
    /// Returns `None` without doing anything when the previous run has not
    /// finished yet.
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<Option<PurgeReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::warn!(job = Self::NAME, "Previous run still in progress, skipping");
            return Ok(None);
        };

        tracing::info!(job = Self::NAME, "Running trash purge");
        let report = self.engine.purge_expired(now).await?;
        tracing::info!(
            job = Self::NAME,
            files = report.files,
            folders = report.folders,
            "Trash purge finished"
        );
        Ok(Some(report))
    }
}
