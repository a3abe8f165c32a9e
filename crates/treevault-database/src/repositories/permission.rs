//! The three reads behind a permission context.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use treevault_core::result::AppResult;
use treevault_core::types::UserId;
use treevault_entity::share::{FileShareGrant, FolderShareGrant};

use super::read_error;

/// Repository for role permissions and share grants of one user.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinct permission slugs granted through any of the user's roles.
    pub async fn find_slugs(&self, user: UserId) -> AppResult<HashSet<String>> {
        let slugs = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT p.slug FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN user_roles ur ON ur.role_id = rp.role_id \
             WHERE ur.user_id = $1",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("Failed to load role permissions"))?;
        Ok(slugs.into_iter().collect())
    }

    /// Direct file shares targeting the user that have not expired at `now`.
    pub async fn find_file_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileShareGrant>> {
        sqlx::query_as::<_, FileShareGrant>(
            "SELECT file_id, permission FROM shares \
             WHERE recipient_id = $1 AND file_id IS NOT NULL \
             AND (expires_at IS NULL OR expires_at > $2)",
        )
        .bind(user)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("Failed to load file shares"))
    }

    /// Folder shares targeting the user that have not expired at `now`,
    /// joined with the shared folder's path. Shares on trashed folders are
    /// skipped.
    pub async fn find_folder_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FolderShareGrant>> {
        sqlx::query_as::<_, FolderShareGrant>(
            "SELECT s.folder_id, f.path, s.permission FROM shares s \
             JOIN folders f ON f.id = s.folder_id \
             WHERE s.recipient_id = $1 AND f.deleted_at IS NULL \
             AND (s.expires_at IS NULL OR s.expires_at > $2)",
        )
        .bind(user)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("Failed to load folder shares"))
    }
}
