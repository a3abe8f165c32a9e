//! Space reclamation after hard deletes.
//!
//! Runs only once the deleting transaction has committed. Quota is
//! released once per deleted file, by its size. A stored object is handed
//! to the janitor when no remaining file row references its checksum.
//! Neither step can fail the caller: the rows are already gone.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use treevault_core::traits::QuotaLedger;
use treevault_core::types::UserId;
use treevault_database::store::TreeStore;
use treevault_entity::file::File;
use treevault_storage::janitor::StorageJanitor;

/// Releases quota and stored objects of hard-deleted files.
#[derive(Debug, Clone)]
pub struct Reclaimer {
    store: Arc<dyn TreeStore>,
    quota: Arc<dyn QuotaLedger>,
    janitor: StorageJanitor,
}

impl Reclaimer {
    /// Creates a new reclaimer.
    pub fn new(store: Arc<dyn TreeStore>, quota: Arc<dyn QuotaLedger>, janitor: StorageJanitor) -> Self {
        Self {
            store,
            quota,
            janitor,
        }
    }

    /// Reclaim the space of `files`. Callers pass only the rows their own
    /// changeset deleted, so each file is released once.
    pub async fn reclaim(&self, files: &[File]) {
        if files.is_empty() {
            return;
        }

        let mut per_owner: BTreeMap<UserId, i64> = BTreeMap::new();
        for file in files {
            *per_owner.entry(file.owner_id).or_default() += file.size_bytes;
        }
        for (owner, bytes) in per_owner {
            if let Err(e) = self.quota.decrement(owner, bytes).await {
                warn!(user_id = %owner, bytes, error = %e, "Failed to release quota");
            }
        }

        let keys: BTreeSet<&str> = files.iter().map(|f| f.storage_key()).collect();
        for key in keys {
            match self.store.count_files_with_checksum(key).await {
                Ok(0) => self.janitor.enqueue(key),
                Ok(remaining) => {
                    debug!(key, remaining, "Object still referenced, keeping it");
                }
                Err(e) => {
                    warn!(key, error = %e, "Failed to count object references, keeping it");
                }
            }
        }
    }
}
