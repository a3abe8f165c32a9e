//! Object storage collaborator configuration.

use serde::{Deserialize, Serialize};

/// Object storage configuration.
///
/// TreeVault never reads or writes object bodies; it only removes objects
/// whose file rows have been purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root path for the local object store.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Attempts per object before the janitor gives up and logs.
    #[serde(default = "default_delete_max_attempts")]
    pub delete_max_attempts: u32,
    /// Base delay between delete attempts, doubled after each failure.
    #[serde(default = "default_delete_retry_delay")]
    pub delete_retry_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            delete_max_attempts: default_delete_max_attempts(),
            delete_retry_delay_ms: default_delete_retry_delay(),
        }
    }
}

fn default_root_path() -> String {
    "./data/objects".to_string()
}

fn default_delete_max_attempts() -> u32 {
    5
}

fn default_delete_retry_delay() -> u64 {
    500
}
