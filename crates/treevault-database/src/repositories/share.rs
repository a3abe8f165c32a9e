//! Share repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use treevault_core::result::AppResult;
use treevault_core::types::ShareId;
use treevault_core::AppError;
use treevault_entity::share::{Share, SharePermission, ShareTarget, UpsertShare};

use super::{read_error, write_error};

/// Repository for user shares and guest links.
#[derive(Debug, Clone)]
pub struct ShareRepository {
    pool: PgPool,
}

impl ShareRepository {
    /// Create a new share repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the share for (target, sharer, recipient), or update the
    /// existing one in place.
    pub async fn upsert(&self, data: &UpsertShare) -> AppResult<Share> {
        let (file_id, folder_id) = data.target.to_columns();
        sqlx::query_as::<_, Share>(
            "INSERT INTO shares (id, file_id, folder_id, shared_by, recipient_id, token_hash, \
             permission, expires_at, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT ON CONSTRAINT shares_target_sharer_recipient_key DO UPDATE SET \
             token_hash = EXCLUDED.token_hash, permission = EXCLUDED.permission, \
             expires_at = EXCLUDED.expires_at, notes = EXCLUDED.notes, updated_at = NOW() \
             RETURNING *",
        )
        .bind(ShareId::new())
        .bind(file_id)
        .bind(folder_id)
        .bind(data.shared_by)
        .bind(data.recipient_id)
        .bind(&data.token_hash)
        .bind(data.permission)
        .bind(data.expires_at)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error("Failed to upsert share"))
    }

    /// Find a share by ID.
    pub async fn find_by_id(&self, id: ShareId) -> AppResult<Option<Share>> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("Failed to find share"))
    }

    /// Find a guest link by token hash.
    pub async fn find_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Share>> {
        sqlx::query_as::<_, Share>("SELECT * FROM shares WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("Failed to find share by token"))
    }

    /// Every share on a resource, newest first.
    pub async fn find_by_target(&self, target: ShareTarget) -> AppResult<Vec<Share>> {
        let (file_id, folder_id) = target.to_columns();
        sqlx::query_as::<_, Share>(
            "SELECT * FROM shares \
             WHERE file_id IS NOT DISTINCT FROM $1 AND folder_id IS NOT DISTINCT FROM $2 \
             ORDER BY created_at DESC",
        )
        .bind(file_id)
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("Failed to list shares"))
    }

    /// Change permission, expiry, and notes.
    pub async fn update(
        &self,
        id: ShareId,
        permission: SharePermission,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<Share> {
        sqlx::query_as::<_, Share>(
            "UPDATE shares SET permission = $2, expires_at = $3, notes = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(permission)
        .bind(expires_at)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_error("Failed to update share"))?
        .ok_or_else(|| AppError::not_found(format!("Share {id} not found")))
    }

    /// Delete a share.
    pub async fn delete(&self, id: ShareId) -> AppResult<bool> {
        sqlx::query("DELETE FROM shares WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected() > 0)
            .map_err(write_error("Failed to delete share"))
    }
}
