//! Background deletion of stored objects.
//!
//! Hard-deleting a file commits the database change first and hands the
//! object key to the janitor. Deletions run on a dedicated task with
//! bounded retries; a failure is logged and never reaches the caller, so
//! storage trouble cannot roll back a committed purge.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use treevault_core::config::StorageConfig;
use treevault_core::error::ErrorKind;
use treevault_core::traits::ObjectStore;

enum Job {
    Delete(String),
    Flush(oneshot::Sender<()>),
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delete(key) => f.debug_tuple("Delete").field(key).finish(),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

/// Retry policy for a single deletion.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff: base, 2×base, 4×base, …
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Handle for enqueueing object deletions.
#[derive(Debug, Clone)]
pub struct StorageJanitor {
    tx: mpsc::UnboundedSender<Job>,
}

impl StorageJanitor {
    /// Spawn the deletion task and return a handle to it.
    ///
    /// The task ends once every handle has been dropped and the queue is
    /// drained.
    pub fn spawn(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> (Self, JoinHandle<()>) {
        let policy = RetryPolicy {
            max_attempts: config.delete_max_attempts.max(1),
            base_delay: Duration::from_millis(config.delete_retry_delay_ms),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(store, policy, rx));
        (Self { tx }, handle)
    }

    /// Queue the object stored under `key` for deletion.
    pub fn enqueue(&self, key: impl Into<String>) {
        let key = key.into();
        if self.tx.send(Job::Delete(key.clone())).is_err() {
            warn!(key = %key, "Storage janitor stopped, object deletion dropped");
        }
    }

    /// Wait until every deletion queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run(
    store: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
    mut rx: mpsc::UnboundedReceiver<Job>,
) {
    info!(provider = store.provider_type(), "Storage janitor started");
    while let Some(job) = rx.recv().await {
        match job {
            Job::Delete(key) => delete_with_retry(store.as_ref(), policy, &key).await,
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    info!("Storage janitor stopped");
}

async fn delete_with_retry(store: &dyn ObjectStore, policy: RetryPolicy, key: &str) {
    for attempt in 1..=policy.max_attempts {
        match store.delete_object(key).await {
            Ok(()) => {
                debug!(key, attempt, "Object deleted");
                return;
            }
            Err(e) if e.is(ErrorKind::NotFound) => {
                debug!(key, "Object already gone");
                return;
            }
            Err(e) if attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    key,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Object deletion failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(
                    key,
                    attempts = policy.max_attempts,
                    error = %e,
                    "Giving up on object deletion"
                );
            }
        }
    }
}
