//! The trash state machine.
//!
//! ```text
//! Active ──soft_delete──▶ Trashed ──restore──▶ Active
//!                            │
//!                            └──force_delete / purge_expired──▶ Purged
//! ```
//!
//! Every transition writes its row updates and one sync event per affected
//! resource in a single changeset. Bulk soft-delete validates every item
//! before writing anything. Soft-delete and restore never touch
//! quota; hard deletes release it once the rows are gone.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use treevault_auth::{FilePolicy, FolderPolicy};
use treevault_core::AppError;
use treevault_core::config::TrashConfig;
use treevault_core::result::AppResult;
use treevault_core::traits::QuotaLedger;
use treevault_core::types::{FileId, FolderId, UserId};
use treevault_database::store::{Changeset, Mutation, TreeStore};
use treevault_entity::event::{NewSyncEvent, SyncAction};
use treevault_entity::file::File;
use treevault_entity::folder::{Folder, MaterializedPath};
use treevault_entity::lifecycle::{ResourceState, TrashMarker};
use treevault_storage::janitor::StorageJanitor;

use super::reclaim::Reclaimer;
use crate::context::RequestContext;
use crate::folder::{PathTree, Subtree};

/// One entry of a soft-delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum TrashItem {
    /// A file.
    File(FileId),
    /// A folder with every active item below it.
    Folder(FolderId),
}

/// Outcome of one purge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PurgeReport {
    /// File rows deleted.
    pub files: usize,
    /// Folder rows deleted.
    pub folders: usize,
}

/// Soft-delete, restore, force-delete, and scheduled purge.
#[derive(Debug, Clone)]
pub struct TrashEngine {
    store: Arc<dyn TreeStore>,
    tree: PathTree,
    reclaimer: Reclaimer,
    retention_days: u32,
    chunk_size: u32,
}

impl TrashEngine {
    /// Creates a new trash engine.
    pub fn new(
        store: Arc<dyn TreeStore>,
        quota: Arc<dyn QuotaLedger>,
        janitor: StorageJanitor,
        config: &TrashConfig,
    ) -> Self {
        Self {
            tree: PathTree::new(Arc::clone(&store)),
            reclaimer: Reclaimer::new(Arc::clone(&store), quota, janitor),
            store,
            retention_days: config.effective_retention_days(),
            chunk_size: config.effective_chunk_size(),
        }
    }

    /// Days a trashed resource is kept.
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Moves a file to the trash.
    pub async fn soft_delete_file(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
    ) -> AppResult<TrashMarker> {
        self.soft_delete_many(ctx, &[TrashItem::File(file_id)])
            .await
    }

    /// Moves a folder and every active item below it to the trash.
    pub async fn soft_delete_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<TrashMarker> {
        self.soft_delete_many(ctx, &[TrashItem::Folder(folder_id)])
            .await
    }

    /// Moves every item to the trash, all or nothing.
    ///
    /// Phase 1 loads every item, checks the delete policy and the trash
    /// state, and collects folder subtrees. Items lying below a folder of the
    /// same batch are covered by that folder. Phase 2 writes one changeset in
    /// which everything shares a single marker, which is how restore later
    /// finds the same set again.
    pub async fn soft_delete_many(
        &self,
        ctx: &RequestContext,
        items: &[TrashItem],
    ) -> AppResult<TrashMarker> {
        if items.is_empty() {
            return Err(AppError::invalid_field("items", "Nothing to delete"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = items.iter().find(|item| !seen.insert(**item)) {
            return Err(AppError::invalid_field(
                "items",
                format!("{dup:?} appears more than once"),
            ));
        }

        let mut files: Vec<(File, Option<MaterializedPath>)> = Vec::new();
        let mut folders: Vec<Folder> = Vec::new();
        for item in items {
            match *item {
                TrashItem::File(id) => {
                    let file = self.find_file(id).await?;
                    let folder_path = self.tree.folder_path_of(&file).await?;
                    FilePolicy::new(&ctx.permissions).delete(&file, folder_path.as_ref())?;
                    if file.is_trashed() {
                        return Err(AppError::validation(format!(
                            "File {id} is already in the trash"
                        )));
                    }
                    files.push((file, folder_path));
                }
                TrashItem::Folder(id) => {
                    let folder = self.find_folder(id).await?;
                    FolderPolicy::new(&ctx.permissions).delete(&folder)?;
                    if folder.is_trashed() {
                        return Err(AppError::validation(format!(
                            "Folder {id} is already in the trash"
                        )));
                    }
                    folders.push(folder);
                }
            }
        }

        let roots: Vec<MaterializedPath> = folders.iter().map(|f| f.path.clone()).collect();
        folders.retain(|f| !roots.iter().any(|root| f.path.is_strict_descendant_of(root)));
        files.retain(|(_, path)| {
            !path
                .as_ref()
                .is_some_and(|p| roots.iter().any(|root| p.is_descendant_or_self(root)))
        });

        let marker = self.marker_for(ctx);
        let mut folder_ids: Vec<FolderId> = Vec::new();
        let mut file_ids: Vec<FileId> = Vec::new();
        let mut events: Vec<NewSyncEvent> = Vec::new();

        for folder in folders {
            let root_id = folder.id;
            let subtree = self.tree.load_subtree(folder).await?;
            let metadata = json!({ "purge_at": marker.purge_at, "cascade_root": root_id });
            for f in subtree.folders.iter().filter(|f| f.state.is_active()) {
                folder_ids.push(f.id);
                events.push(NewSyncEvent::folder(
                    ctx.user_id,
                    SyncAction::Delete,
                    f.id,
                    metadata.clone(),
                ));
            }
            for f in subtree.files.iter().filter(|f| f.state.is_active()) {
                file_ids.push(f.id);
                events.push(NewSyncEvent::file(
                    ctx.user_id,
                    SyncAction::Delete,
                    f.id,
                    metadata.clone(),
                ));
            }
        }
        for (file, _) in &files {
            file_ids.push(file.id);
            events.push(NewSyncEvent::file(
                ctx.user_id,
                SyncAction::Delete,
                file.id,
                json!({ "purge_at": marker.purge_at }),
            ));
        }

        let state = ResourceState::Trashed(marker);
        let mut changeset = Changeset::new();
        if !folder_ids.is_empty() {
            changeset.push(Mutation::SetFolderState {
                ids: folder_ids.clone(),
                state,
            });
        }
        if !file_ids.is_empty() {
            changeset.push(Mutation::SetFileState {
                ids: file_ids.clone(),
                state,
            });
        }
        for event in events {
            changeset.record(event);
        }
        self.store.apply(changeset).await?;

        info!(
            user_id = %ctx.user_id,
            items = items.len(),
            folders = folder_ids.len(),
            files = file_ids.len(),
            purge_at = %marker.purge_at,
            "Items trashed"
        );
        Ok(marker)
    }

    /// Restores a trashed file.
    pub async fn restore_file(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<File> {
        let file = self.find_file(file_id).await?;
        FilePolicy::new(&ctx.permissions).restore(&file)?;
        if !file.is_trashed() {
            return Err(AppError::validation(format!("File {file_id} is not in the trash")));
        }
        if let Some(parent_id) = file.folder_id {
            self.ensure_parent_active(parent_id).await?;
        }

        let mut changeset = Changeset::new();
        changeset
            .push(Mutation::SetFileState {
                ids: vec![file_id],
                state: ResourceState::Active,
            })
            .record(NewSyncEvent::file(
                ctx.user_id,
                SyncAction::Restore,
                file_id,
                json!({ "folder_id": file.folder_id }),
            ));
        self.store.apply(changeset).await?;

        info!(user_id = %ctx.user_id, file_id = %file_id, "File restored");
        self.find_file(file_id).await
    }

    /// Restores a trashed folder together with the items trashed in the
    /// same cascade. Items trashed separately stay in the trash.
    pub async fn restore_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<Folder> {
        let folder = self.find_folder(folder_id).await?;
        FolderPolicy::new(&ctx.permissions).restore(&folder)?;
        let Some(marker) = folder.state.trash_marker().copied() else {
            return Err(AppError::validation(format!(
                "Folder {folder_id} is not in the trash"
            )));
        };
        if let Some(parent_id) = folder.parent_id {
            self.ensure_parent_active(parent_id).await?;
        }

        let same_cascade =
            |state: &ResourceState| state.trash_marker().is_some_and(|m| m.same_cascade(&marker));
        let subtree = self.tree.load_subtree(folder).await?;
        let folder_ids: Vec<FolderId> = subtree
            .folders
            .iter()
            .filter(|f| same_cascade(&f.state))
            .map(|f| f.id)
            .collect();
        let file_ids: Vec<FileId> = subtree
            .files
            .iter()
            .filter(|f| same_cascade(&f.state))
            .map(|f| f.id)
            .collect();

        let mut changeset = Changeset::new();
        changeset.push(Mutation::SetFolderState {
            ids: folder_ids.clone(),
            state: ResourceState::Active,
        });
        if !file_ids.is_empty() {
            changeset.push(Mutation::SetFileState {
                ids: file_ids.clone(),
                state: ResourceState::Active,
            });
        }
        let metadata = json!({ "cascade_root": folder_id });
        for id in &folder_ids {
            changeset.record(NewSyncEvent::folder(
                ctx.user_id,
                SyncAction::Restore,
                *id,
                metadata.clone(),
            ));
        }
        for id in &file_ids {
            changeset.record(NewSyncEvent::file(
                ctx.user_id,
                SyncAction::Restore,
                *id,
                metadata.clone(),
            ));
        }
        self.store.apply(changeset).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            folders = folder_ids.len(),
            files = file_ids.len(),
            "Folder restored"
        );
        self.find_folder(folder_id).await
    }

    /// Hard-deletes a trashed file and releases its space.
    ///
    /// Returns [`ResourceState::Purged`], the file's final state.
    pub async fn force_delete_file(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
    ) -> AppResult<ResourceState> {
        let file = self.find_file(file_id).await?;
        FilePolicy::new(&ctx.permissions).force_delete(&file)?;
        if !file.is_trashed() {
            return Err(AppError::validation(format!(
                "File {file_id} must be in the trash before it can be deleted permanently"
            )));
        }

        let mut changeset = Changeset::new();
        changeset.push(Mutation::DeleteFiles(vec![file_id]));
        changeset.record(Self::purge_event(ctx.user_id, &file));
        let applied = self.store.apply(changeset).await?;
        if !applied.deleted_file(file_id) {
            debug!(file_id = %file_id, "File already deleted by a concurrent request");
            return Err(AppError::not_found(format!("File {file_id} not found")));
        }
        self.reclaimer.reclaim(std::slice::from_ref(&file)).await;

        info!(user_id = %ctx.user_id, file_id = %file_id, size = file.size_bytes, "File deleted permanently");
        Ok(ResourceState::Purged)
    }

    /// Hard-deletes a trashed folder with its whole subtree.
    ///
    /// Returns [`ResourceState::Purged`], the folder's final state.
    pub async fn force_delete_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
    ) -> AppResult<ResourceState> {
        let folder = self.find_folder(folder_id).await?;
        FolderPolicy::new(&ctx.permissions).force_delete(&folder)?;
        if !folder.is_trashed() {
            return Err(AppError::validation(format!(
                "Folder {folder_id} must be in the trash before it can be deleted permanently"
            )));
        }

        let subtree = self.tree.load_subtree(folder).await?;
        let deleted = self.delete_subtree(subtree, Some(ctx.user_id)).await?;
        if deleted.folders == 0 {
            debug!(folder_id = %folder_id, "Folder already deleted by a concurrent request");
            return Err(AppError::not_found(format!("Folder {folder_id} not found")));
        }

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            folders = deleted.folders,
            files = deleted.files,
            "Folder deleted permanently"
        );
        Ok(ResourceState::Purged)
    }

    /// Hard-deletes everything whose retention ended at or before `now`.
    ///
    /// Works in chunks: expired files first, then expired folders with
    /// their subtrees, shallowest first. Events are attributed to owners.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<PurgeReport> {
        let mut report = PurgeReport::default();

        loop {
            let files = self.store.find_expired_files(now, self.chunk_size).await?;
            if files.is_empty() {
                break;
            }
            let mut changeset = Changeset::new();
            changeset.push(Mutation::DeleteFiles(files.iter().map(|f| f.id).collect()));
            for file in &files {
                changeset.record(Self::purge_event(file.owner_id, file));
            }
            let applied = self.store.apply(changeset).await?;
            let deleted: Vec<File> = files
                .into_iter()
                .filter(|f| applied.deleted_file(f.id))
                .collect();
            self.reclaimer.reclaim(&deleted).await;

            report.files += deleted.len();
            debug!(chunk = deleted.len(), "Purged expired files");
        }

        loop {
            let folders = self.store.find_expired_folders(now, self.chunk_size).await?;
            if folders.is_empty() {
                break;
            }
            let mut removed: HashSet<FolderId> = HashSet::new();
            for folder in folders {
                if removed.contains(&folder.id) {
                    continue;
                }
                let subtree = self.tree.load_subtree(folder).await?;
                removed.extend(subtree.folder_ids());
                let deleted = self.delete_subtree(subtree, None).await?;
                report.files += deleted.files;
                report.folders += deleted.folders;
            }
        }

        if report != PurgeReport::default() {
            info!(files = report.files, folders = report.folders, "Trash purge completed");
        } else {
            debug!("Trash purge found nothing to delete");
        }
        Ok(report)
    }

    /// Delete a subtree's rows in one changeset, then release the space of
    /// the files this changeset removed. Events go to `actor`, or to each
    /// resource's owner when None.
    async fn delete_subtree(
        &self,
        subtree: Subtree,
        actor: Option<UserId>,
    ) -> AppResult<PurgeReport> {
        let Subtree { folders, files } = subtree;
        let mut changeset = Changeset::new();
        if !files.is_empty() {
            changeset.push(Mutation::DeleteFiles(files.iter().map(|f| f.id).collect()));
        }
        changeset.push(Mutation::DeleteFolders(folders.iter().map(|f| f.id).collect()));
        for file in &files {
            changeset.record(Self::purge_event(actor.unwrap_or(file.owner_id), file));
        }
        for folder in &folders {
            changeset.record(NewSyncEvent::folder(
                actor.unwrap_or(folder.owner_id),
                SyncAction::Purge,
                folder.id,
                json!({ "path": folder.path }),
            ));
        }
        let applied = self.store.apply(changeset).await?;
        let deleted: Vec<File> = files
            .into_iter()
            .filter(|f| applied.deleted_file(f.id))
            .collect();
        self.reclaimer.reclaim(&deleted).await;
        Ok(PurgeReport {
            files: deleted.len(),
            folders: applied.deleted_folders.len(),
        })
    }

    fn purge_event(user_id: UserId, file: &File) -> NewSyncEvent {
        NewSyncEvent::file(
            user_id,
            SyncAction::Purge,
            file.id,
            json!({ "size": file.size_bytes, "checksum": file.checksum }),
        )
    }

    fn marker_for(&self, ctx: &RequestContext) -> TrashMarker {
        TrashMarker::new(ctx.user_id, ctx.request_time, self.retention_days)
    }

    async fn ensure_parent_active(&self, parent_id: FolderId) -> AppResult<()> {
        let parent = self.find_folder(parent_id).await?;
        if parent.is_trashed() {
            return Err(AppError::conflict(format!(
                "Parent folder {parent_id} is in the trash; restore it first"
            )));
        }
        Ok(())
    }

    async fn find_file(&self, file_id: FileId) -> AppResult<File> {
        self.store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    async fn find_folder(&self, folder_id: FolderId) -> AppResult<Folder> {
        self.store
            .find_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }
}
