//! Quota accounting collaborator trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;

/// Per-user storage usage accounting.
///
/// Incremented when a file is registered and decremented when a file row is
/// hard-deleted (force-delete or purge). Moving a file to the trash does not
/// free quota.
#[async_trait]
pub trait QuotaLedger: Send + Sync + std::fmt::Debug + 'static {
    /// Add `bytes` to the user's usage.
    async fn increment(&self, user_id: UserId, bytes: i64) -> AppResult<()>;

    /// Subtract `bytes` from the user's usage (never below zero).
    async fn decrement(&self, user_id: UserId, bytes: i64) -> AppResult<()>;

    /// Current usage in bytes.
    async fn usage(&self, user_id: UserId) -> AppResult<i64>;
}
