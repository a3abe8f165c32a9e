//! [`TreeStore`] and [`ShareStore`] over PostgreSQL.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use tracing::debug;

use treevault_core::error::{AppError, ErrorKind};
use treevault_core::result::AppResult;
use treevault_core::types::{FileId, FolderId, ShareId, UserId};
use treevault_entity::event::{NewSyncEvent, SyncAction, SyncEvent};
use treevault_entity::file::{File, NewFile};
use treevault_entity::folder::{Folder, NewFolder};
use treevault_entity::permission::ResourceType;
use treevault_entity::share::{
    FileShareGrant, FolderShareGrant, Share, SharePermission, ShareTarget, UpsertShare,
};

use super::{Applied, Changeset, Mutation, ShareStore, TreeStore};
use crate::repositories::{
    FileRepository, FolderRepository, PermissionRepository, ShareRepository, SyncEventRepository,
};

/// Store backed by the sqlx repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    folders: FolderRepository,
    files: FileRepository,
    shares: ShareRepository,
    permissions: PermissionRepository,
    events: SyncEventRepository,
}

impl PgStore {
    /// Build every repository over one pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            folders: FolderRepository::new(pool.clone()),
            files: FileRepository::new(pool.clone()),
            shares: ShareRepository::new(pool.clone()),
            permissions: PermissionRepository::new(pool.clone()),
            events: SyncEventRepository::new(pool.clone()),
            pool,
        }
    }

    async fn begin(&self) -> AppResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })
    }
}

async fn commit(tx: sqlx::Transaction<'static, sqlx::Postgres>) -> AppResult<()> {
    tx.commit()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e))
}

#[async_trait]
impl TreeStore for PgStore {
    async fn find_folder(&self, id: FolderId) -> AppResult<Option<Folder>> {
        self.folders.find_by_id(id).await
    }

    async fn find_folders(&self, ids: &[FolderId]) -> AppResult<Vec<Folder>> {
        self.folders.find_by_ids(ids).await
    }

    async fn find_child_folder_ids(&self, parents: &[FolderId]) -> AppResult<Vec<FolderId>> {
        self.folders.find_child_ids(parents).await
    }

    async fn folder_name_taken(
        &self,
        owner: UserId,
        parent: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> AppResult<bool> {
        self.folders.name_taken(owner, parent, name, exclude).await
    }

    async fn create_folder(&self, data: &NewFolder, actor: UserId) -> AppResult<Folder> {
        let mut tx = self.begin().await?;
        let folder = FolderRepository::insert(&mut tx, data).await?;
        SyncEventRepository::insert(
            &mut tx,
            &NewSyncEvent::folder(
                actor,
                SyncAction::Create,
                folder.id,
                json!({ "name": folder.name, "parent_id": folder.parent_id, "path": folder.path }),
            ),
        )
        .await?;
        commit(tx).await?;
        Ok(folder)
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<File>> {
        self.files.find_by_id(id).await
    }

    async fn find_files(&self, ids: &[FileId]) -> AppResult<Vec<File>> {
        self.files.find_by_ids(ids).await
    }

    async fn find_files_in_folders(&self, folders: &[FolderId]) -> AppResult<Vec<File>> {
        self.files.find_in_folders(folders).await
    }

    async fn file_name_taken(
        &self,
        owner: UserId,
        folder: Option<FolderId>,
        name: &str,
        exclude: Option<FileId>,
    ) -> AppResult<bool> {
        self.files.name_taken(owner, folder, name, exclude).await
    }

    async fn create_file(&self, data: &NewFile, actor: UserId) -> AppResult<File> {
        let mut tx = self.begin().await?;
        let file = FileRepository::insert(&mut tx, data).await?;
        SyncEventRepository::insert(
            &mut tx,
            &NewSyncEvent::file(
                actor,
                SyncAction::Create,
                file.id,
                json!({ "name": file.name, "folder_id": file.folder_id, "size": file.size_bytes }),
            ),
        )
        .await?;
        commit(tx).await?;
        Ok(file)
    }

    async fn count_files_with_checksum(&self, checksum: &str) -> AppResult<i64> {
        self.files.count_by_checksum(checksum).await
    }

    async fn find_expired_files(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<File>> {
        self.files.find_expired(now, limit).await
    }

    async fn find_expired_folders(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> AppResult<Vec<Folder>> {
        self.folders.find_expired(now, limit).await
    }

    async fn apply(&self, changeset: Changeset) -> AppResult<Applied> {
        let mut applied = Applied::default();
        if changeset.is_empty() {
            return Ok(applied);
        }
        let count = changeset.len();
        let mut tx = self.begin().await?;

        for mutation in changeset {
            match mutation {
                Mutation::MoveFile { file_id, folder_id } => {
                    FileRepository::move_to(&mut tx, file_id, folder_id).await?
                }
                Mutation::RenameFile { file_id, name } => {
                    FileRepository::rename(&mut tx, file_id, &name).await?
                }
                Mutation::RenameFolder { folder_id, name } => {
                    FolderRepository::rename(&mut tx, folder_id, &name).await?
                }
                Mutation::MoveFolder {
                    folder_id,
                    parent_id,
                } => FolderRepository::relocate(&mut tx, folder_id, parent_id).await?,
                Mutation::SetFolderState { ids, state } => {
                    FolderRepository::set_state(&mut tx, &ids, &state).await?
                }
                Mutation::SetFileState { ids, state } => {
                    FileRepository::set_state(&mut tx, &ids, &state).await?
                }
                Mutation::DeleteFiles(ids) => {
                    let deleted = FileRepository::delete(&mut tx, &ids).await?;
                    applied.deleted_files.extend(deleted);
                }
                Mutation::DeleteFolders(ids) => {
                    let deleted = FolderRepository::delete(&mut tx, &ids).await?;
                    applied.deleted_folders.extend(deleted);
                }
                Mutation::RecordEvent(event) => SyncEventRepository::insert(&mut tx, &event).await?,
            }
        }

        commit(tx).await?;
        debug!(
            mutations = count,
            deleted_files = applied.deleted_files.len(),
            deleted_folders = applied.deleted_folders.len(),
            "Changeset committed"
        );
        Ok(applied)
    }

    async fn find_events(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
    ) -> AppResult<Vec<SyncEvent>> {
        self.events.find_by_resource(resource_type, resource_id).await
    }
}

#[async_trait]
impl ShareStore for PgStore {
    async fn find_permission_slugs(&self, user: UserId) -> AppResult<HashSet<String>> {
        self.permissions.find_slugs(user).await
    }

    async fn find_file_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileShareGrant>> {
        self.permissions.find_file_grants(user, now).await
    }

    async fn find_folder_grants(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FolderShareGrant>> {
        self.permissions.find_folder_grants(user, now).await
    }

    async fn upsert_share(&self, data: &UpsertShare) -> AppResult<Share> {
        self.shares.upsert(data).await
    }

    async fn find_share(&self, id: ShareId) -> AppResult<Option<Share>> {
        self.shares.find_by_id(id).await
    }

    async fn find_share_by_token_hash(&self, token_hash: &str) -> AppResult<Option<Share>> {
        self.shares.find_by_token_hash(token_hash).await
    }

    async fn find_shares_for_target(&self, target: ShareTarget) -> AppResult<Vec<Share>> {
        self.shares.find_by_target(target).await
    }

    async fn update_share(
        &self,
        id: ShareId,
        permission: SharePermission,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> AppResult<Share> {
        self.shares.update(id, permission, expires_at, notes).await
    }

    async fn delete_share(&self, id: ShareId) -> AppResult<bool> {
        self.shares.delete(id).await
    }
}
