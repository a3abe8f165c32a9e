//! Trash retention and purge configuration.

use serde::{Deserialize, Serialize};

/// Smallest accepted retention period.
pub const MIN_RETENTION_DAYS: u32 = 1;

/// Largest accepted retention period.
pub const MAX_RETENTION_DAYS: u32 = 90;

/// Trash configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// Days a trashed resource is kept before the scheduled purge removes it.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Rows processed per purge chunk.
    #[serde(default = "default_purge_chunk_size")]
    pub purge_chunk_size: u32,
    /// Cron expression (with seconds) for the scheduled purge.
    #[serde(default = "default_purge_schedule")]
    pub purge_schedule: String,
}

impl TrashConfig {
    /// Retention in days, clamped to `[1, 90]`.
    pub fn effective_retention_days(&self) -> u32 {
        self.retention_days
            .clamp(MIN_RETENTION_DAYS, MAX_RETENTION_DAYS)
    }

    /// Chunk size, never zero.
    pub fn effective_chunk_size(&self) -> u32 {
        self.purge_chunk_size.max(1)
    }
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            purge_chunk_size: default_purge_chunk_size(),
            purge_schedule: default_purge_schedule(),
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

fn default_purge_chunk_size() -> u32 {
    200
}

fn default_purge_schedule() -> String {
    "0 0 * * * *".to_string()
}
