//! In-process object store for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use treevault_core::result::AppResult;
use treevault_core::traits::ObjectStore;
use treevault_core::AppError;

#[derive(Debug, Default)]
struct InnerState {
    objects: HashSet<String>,
    deleted: Vec<String>,
    /// Remaining injected failures per key.
    failures: HashMap<String, u32>,
}

/// Object store holding keys in memory and recording every deletion.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an object was uploaded under `key`.
    pub async fn put(&self, key: &str) {
        self.state.lock().await.objects.insert(key.to_string());
    }

    /// Whether an object exists under `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.state.lock().await.objects.contains(key)
    }

    /// Keys passed to successful `delete_object` calls, in order.
    pub async fn deleted_keys(&self) -> Vec<String> {
        self.state.lock().await.deleted.clone()
    }

    /// Make the next `times` deletions of `key` fail.
    pub async fn fail_next(&self, key: &str, times: u32) {
        self.state
            .lock()
            .await
            .failures
            .insert(key.to_string(), times);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(remaining) = state.failures.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AppError::storage(format!("Injected failure deleting {key}")));
            }
        }
        state.objects.remove(key);
        state.deleted.push(key.to_string());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
