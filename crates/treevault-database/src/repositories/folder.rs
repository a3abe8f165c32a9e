//! Folder repository implementation.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use treevault_core::result::AppResult;
use treevault_core::types::{FolderId, UserId};
use treevault_core::AppError;
use treevault_entity::folder::{Folder, MaterializedPath, NewFolder};
use treevault_entity::lifecycle::ResourceState;

use super::{read_error, write_error};

/// Repository for folder rows and materialized paths.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a folder by key.
    pub async fn find_by_id(&self, id: FolderId) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("Failed to find folder"))
    }

    /// Find several folders by key.
    pub async fn find_by_ids(&self, ids: &[FolderId]) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ANY($1) ORDER BY path")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("Failed to find folders"))
    }

    /// Keys of the direct children of the given folders.
    pub async fn find_child_ids(&self, parents: &[FolderId]) -> AppResult<Vec<FolderId>> {
        sqlx::query_scalar::<_, FolderId>("SELECT id FROM folders WHERE parent_id = ANY($1)")
            .bind(parents)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("Failed to list child folders"))
    }

    /// Whether the owner already uses `name` under `parent`, trashed rows included.
    pub async fn name_taken(
        &self,
        owner: UserId,
        parent: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND name = $3 \
             AND ($4::BIGINT IS NULL OR id <> $4))",
        )
        .bind(owner)
        .bind(parent)
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(read_error("Failed to check folder name"))
    }

    /// Trashed folders past their purge date, ancestors before descendants.
    pub async fn find_expired(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE purge_at <= $1 \
             ORDER BY length(path) ASC, purge_at ASC LIMIT $2",
        )
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("Failed to find expired folders"))
    }

    /// Current path of a folder, locking the row until the transaction ends.
    pub async fn lock_path(
        conn: &mut PgConnection,
        id: FolderId,
    ) -> AppResult<Option<MaterializedPath>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT path FROM folders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(read_error("Failed to read folder path"))?;
        raw.map(|p| MaterializedPath::parse(&p)).transpose()
    }

    /// Insert a folder whose path is known before the row exists.
    ///
    /// The key is drawn from the identity sequence first so the path can be
    /// written by the insert itself.
    pub async fn insert(conn: &mut PgConnection, data: &NewFolder) -> AppResult<Folder> {
        let id: FolderId =
            sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('folders', 'id'))")
                .fetch_one(&mut *conn)
                .await
                .map_err(read_error("Failed to allocate folder key"))?;

        let parent_path = match data.parent_id {
            Some(parent_id) => Some(Self::lock_path(conn, parent_id).await?.ok_or_else(|| {
                AppError::not_found(format!("Parent folder {parent_id} not found"))
            })?),
            None => None,
        };
        let path = MaterializedPath::compute(parent_path.as_ref(), id);

        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (id, public_id, name, parent_id, owner_id, path) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(id)
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(data.parent_id)
        .bind(data.owner_id)
        .bind(path.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(write_error("Failed to create folder"))
    }

    /// Rename a folder.
    pub async fn rename(conn: &mut PgConnection, id: FolderId, name: &str) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE folders SET name = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(name)
                .execute(&mut *conn)
                .await
                .map_err(write_error("Failed to rename folder"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Folder {id} not found")));
        }
        Ok(())
    }

    /// Re-parent a folder and rewrite its subtree's paths with one prefix
    /// replacement.
    pub async fn relocate(
        conn: &mut PgConnection,
        id: FolderId,
        parent_id: Option<FolderId>,
    ) -> AppResult<()> {
        let old_path = Self::lock_path(conn, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        let parent_path = match parent_id {
            Some(parent_id) => Some(Self::lock_path(conn, parent_id).await?.ok_or_else(|| {
                AppError::not_found(format!("Target folder {parent_id} not found"))
            })?),
            None => None,
        };
        let new_path = MaterializedPath::compute(parent_path.as_ref(), id);

        sqlx::query(
            "UPDATE folders SET parent_id = $2, path = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(parent_id)
        .bind(new_path.as_str())
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to move folder"))?;

        sqlx::query(
            "UPDATE folders SET path = $2 || substr(path, length($1) + 1), updated_at = NOW() \
             WHERE path LIKE $1 || '%' AND id <> $3",
        )
        .bind(old_path.as_str())
        .bind(new_path.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to rewrite descendant paths"))?;

        Ok(())
    }

    /// Set the lifecycle columns of several folders.
    pub async fn set_state(
        conn: &mut PgConnection,
        ids: &[FolderId],
        state: &ResourceState,
    ) -> AppResult<()> {
        let (deleted_at, deleted_by, purge_at, cascade) = state.to_columns();
        sqlx::query(
            "UPDATE folders SET deleted_at = $2, deleted_by = $3, purge_at = $4, \
             trash_cascade = $5, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(deleted_at)
        .bind(deleted_by)
        .bind(purge_at)
        .bind(cascade)
        .execute(&mut *conn)
        .await
        .map_err(write_error("Failed to update folder state"))?;
        Ok(())
    }

    /// Hard-delete folder rows in one statement.
    ///
    /// Returns the ids this statement removed; rows already deleted by a
    /// concurrent transaction are not included.
    pub async fn delete(conn: &mut PgConnection, ids: &[FolderId]) -> AppResult<Vec<FolderId>> {
        sqlx::query_scalar::<_, FolderId>("DELETE FROM folders WHERE id = ANY($1) RETURNING id")
            .bind(ids)
            .fetch_all(&mut *conn)
            .await
            .map_err(write_error("Failed to delete folders"))
    }
}
