//! File repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use treevault_core::result::AppResult;
use treevault_core::types::{FileId, FolderId, UserId};
use treevault_core::AppError;
use treevault_entity::file::{File, NewFile};
use treevault_entity::lifecycle::ResourceState;

use super::{read_error, write_error};

/// Repository for file rows.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a file by ID.
    pub async fn find_by_id(&self, id: FileId) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("Failed to find file"))
    }

    /// Find several files by ID.
    pub async fn find_by_ids(&self, ids: &[FileId]) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("Failed to find files"))
    }

    /// Every file directly inside one of the given folders.
    pub async fn find_in_folders(&self, folders: &[FolderId]) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE folder_id = ANY($1)")
            .bind(folders)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("Failed to list files in folders"))
    }

    /// Whether the owner already uses `name` in `folder`, trashed rows included.
    pub async fn name_taken(
        &self,
        owner: UserId,
        folder: Option<FolderId>,
        name: &str,
        exclude: Option<FileId>,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM files \
             WHERE owner_id = $1 AND folder_id IS NOT DISTINCT FROM $2 AND name = $3 \
             AND ($4::UUID IS NULL OR id <> $4))",
        )
        .bind(owner)
        .bind(folder)
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(read_error("Failed to check file name"))
    }

    /// Number of rows pointing at the same stored object.
    pub async fn count_by_checksum(&self, checksum: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM files WHERE checksum = $1")
            .bind(checksum)
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("Failed to count files by checksum"))
    }

    /// Trashed files past their purge date, oldest first.
    pub async fn find_expired(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE purge_at <= $1 ORDER BY purge_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("Failed to find expired files"))
    }

    /// Insert a file row.
    pub async fn insert(conn: &mut PgConnection, data: &NewFile) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "INSERT INTO files (id, name, folder_id, owner_id, size_bytes, mime_type, checksum) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(FileId::new())
        .bind(&data.name)
        .bind(data.folder_id)
        .bind(data.owner_id)
        .bind(data.size_bytes)
        .bind(&data.mime_type)
        .bind(&data.checksum)
        .fetch_one(&mut *conn)
        .await
        .map_err(write_error("Failed to create file"))
    }

    /// Re-parent a file and bump its version.
    pub async fn move_to(
        conn: &mut PgConnection,
        id: FileId,
        folder_id: Option<FolderId>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE files SET folder_id = $2, version = version + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(folder_id)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to move file"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("File {id} not found")));
        }
        Ok(())
    }

    /// Rename a file and bump its version.
    pub async fn rename(conn: &mut PgConnection, id: FileId, name: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE files SET name = $2, version = version + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to rename file"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("File {id} not found")));
        }
        Ok(())
    }

    /// Set the lifecycle columns of several files and bump their versions.
    pub async fn set_state(
        conn: &mut PgConnection,
        ids: &[FileId],
        state: &ResourceState,
    ) -> AppResult<()> {
        let (deleted_at, deleted_by, purge_at, cascade) = state.to_columns();
        sqlx::query(
            "UPDATE files SET deleted_at = $2, deleted_by = $3, purge_at = $4, \
             trash_cascade = $5, version = version + 1, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(deleted_at)
        .bind(deleted_by)
        .bind(purge_at)
        .bind(cascade)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to update file state"))?;
        Ok(())
    }

    /// Hard-delete file rows in one statement.
    ///
    /// Returns the ids this statement removed; rows already deleted by a
    /// concurrent transaction are not included.
    pub async fn delete(conn: &mut PgConnection, ids: &[FileId]) -> AppResult<Vec<FileId>> {
        sqlx::query_scalar::<_, FileId>("DELETE FROM files WHERE id = ANY($1) RETURNING id")
            .bind(ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(write_error("Failed to delete files"))
    }
}
