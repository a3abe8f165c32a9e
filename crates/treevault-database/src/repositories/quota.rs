//! Per-user storage usage ledger backed by `quota_usage`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use treevault_core::result::AppResult;
use treevault_core::traits::QuotaLedger;
use treevault_core::types::UserId;

use super::{read_error, write_error};

/// Postgres implementation of [`QuotaLedger`].
#[derive(Debug, Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    /// Create a new quota repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaLedger for QuotaRepository {
    async fn increment(&self, user_id: UserId, bytes: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO quota_usage (user_id, used_bytes) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE \
             SET used_bytes = quota_usage.used_bytes + EXCLUDED.used_bytes, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(write_error("Failed to increment quota"))?;
        debug!(user_id = %user_id, bytes, "Quota incremented");
        Ok(())
    }

    async fn decrement(&self, user_id: UserId, bytes: i64) -> AppResult<()> {
        sqlx::query(
            "UPDATE quota_usage SET used_bytes = GREATEST(used_bytes - $2, 0), \
             updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(write_error("Failed to decrement quota"))?;
        debug!(user_id = %user_id, bytes, "Quota decremented");
        Ok(())
    }

    async fn usage(&self, user_id: UserId) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT used_bytes FROM quota_usage WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map(|v| v.unwrap_or(0))
            .map_err(read_error("Failed to read quota usage"))
    }
}
