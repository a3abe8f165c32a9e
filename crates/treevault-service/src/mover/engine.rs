//! Two-phase move of files and folders.
//!
//! Phase 1 loads and validates every item without writing: existence,
//! policy, trash state, self/descendant moves, name collisions (against
//! existing siblings and within the batch), and the subtree boundary. Any
//! failure rejects the whole batch. Phase 2 applies one changeset, so the
//! moves, the subtree path rewrites, and the `move` events commit together.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use treevault_auth::{FilePolicy, FolderPolicy};
use treevault_core::AppError;
use treevault_core::result::AppResult;
use treevault_core::types::{FileId, FolderId, UserId};
use treevault_database::store::{Changeset, Mutation, TreeStore};
use treevault_entity::event::{NewSyncEvent, SyncAction};
use treevault_entity::file::File;
use treevault_entity::folder::{Folder, MaterializedPath};
use treevault_entity::permission::ResourceType;

use super::boundary::assert_subtree_boundary;
use crate::context::RequestContext;
use crate::folder::PathTree;
use crate::naming::name_taken;

/// One entry of a move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum MoveItem {
    /// A file.
    File(FileId),
    /// A folder with its whole subtree.
    Folder(FolderId),
}

/// Result of a move request.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MoveReport {
    /// Items that changed parent.
    pub moved: Vec<MoveItem>,
    /// Items already in the target folder.
    pub unchanged: Vec<MoveItem>,
}

/// The validated destination.
struct Destination {
    id: Option<FolderId>,
    path: Option<MaterializedPath>,
}

/// Moves files and folders.
#[derive(Debug, Clone)]
pub struct MoveEngine {
    store: Arc<dyn TreeStore>,
    tree: PathTree,
}

impl MoveEngine {
    /// Creates a new move engine.
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self {
            tree: PathTree::new(Arc::clone(&store)),
            store,
        }
    }

    /// Moves a file into `target` (None for the root).
    pub async fn move_file(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        target: Option<FolderId>,
    ) -> AppResult<File> {
        self.move_many(ctx, &[MoveItem::File(file_id)], target)
            .await?;
        self.store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    /// Moves a folder and its subtree into `target` (None for the root).
    pub async fn move_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        target: Option<FolderId>,
    ) -> AppResult<Folder> {
        self.move_many(ctx, &[MoveItem::Folder(folder_id)], target)
            .await?;
        self.store
            .find_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    /// Moves every item into `target`, all or nothing.
    pub async fn move_many(
        &self,
        ctx: &RequestContext,
        items: &[MoveItem],
        target: Option<FolderId>,
    ) -> AppResult<MoveReport> {
        let destination = self.resolve_destination(ctx, target).await?;

        let mut seen = HashSet::new();
        if let Some(dup) = items.iter().find(|item| !seen.insert(**item)) {
            return Err(AppError::invalid_field(
                "items",
                format!("{dup:?} appears more than once"),
            ));
        }

        let mut report = MoveReport::default();
        let mut changeset = Changeset::new();
        let mut claimed: HashSet<(ResourceType, UserId, String)> = HashSet::new();

        for item in items {
            let planned = match *item {
                MoveItem::File(id) => {
                    self.plan_file(ctx, id, &destination, &mut claimed, &mut changeset)
                        .await?
                }
                MoveItem::Folder(id) => {
                    self.plan_folder(ctx, id, &destination, &mut claimed, &mut changeset)
                        .await?
                }
            };
            if planned {
                report.moved.push(*item);
            } else {
                report.unchanged.push(*item);
            }
        }

        if report.moved.is_empty() {
            debug!(user_id = %ctx.user_id, "Every item already in target, nothing to move");
            return Ok(report);
        }

        self.store.apply(changeset).await?;

        info!(
            user_id = %ctx.user_id,
            target = ?destination.id,
            moved = report.moved.len(),
            unchanged = report.unchanged.len(),
            "Items moved"
        );

        Ok(report)
    }

    async fn resolve_destination(
        &self,
        ctx: &RequestContext,
        target: Option<FolderId>,
    ) -> AppResult<Destination> {
        let Some(target_id) = target else {
            return Ok(Destination {
                id: None,
                path: None,
            });
        };

        let folder = self
            .store
            .find_folder(target_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {target_id} not found")))?;
        FolderPolicy::new(&ctx.permissions).update(&folder)?;
        if folder.is_trashed() {
            return Err(AppError::invalid_field(
                "target",
                format!("Folder {target_id} is in the trash"),
            ));
        }

        Ok(Destination {
            id: Some(folder.id),
            path: Some(folder.path),
        })
    }

    /// Validate one file and queue its move. Returns false for a no-op.
    async fn plan_file(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        destination: &Destination,
        claimed: &mut HashSet<(ResourceType, UserId, String)>,
        changeset: &mut Changeset,
    ) -> AppResult<bool> {
        let file = self
            .store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        let source_path = self.tree.folder_path_of(&file).await?;
        FilePolicy::new(&ctx.permissions).update(&file, source_path.as_ref())?;

        if file.is_trashed() {
            return Err(AppError::validation(format!("File {file_id} is in the trash")));
        }
        if file.folder_id == destination.id {
            return Ok(false);
        }

        assert_subtree_boundary(
            &ctx.permissions,
            file.owner_id,
            source_path.as_ref(),
            destination.path.as_ref(),
        )?;

        if self
            .store
            .file_name_taken(file.owner_id, destination.id, &file.name, Some(file.id))
            .await?
            || !claimed.insert((ResourceType::File, file.owner_id, file.name.clone()))
        {
            return Err(name_taken(&file.name));
        }

        changeset
            .push(Mutation::MoveFile {
                file_id,
                folder_id: destination.id,
            })
            .record(NewSyncEvent::file(
                ctx.user_id,
                SyncAction::Move,
                file_id,
                json!({
                    "from": file.folder_id,
                    "to": destination.id,
                    "name": file.name,
                    "version": file.version + 1,
                }),
            ));
        Ok(true)
    }

    /// Validate one folder and queue its move. Returns false for a no-op.
    async fn plan_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        destination: &Destination,
        claimed: &mut HashSet<(ResourceType, UserId, String)>,
        changeset: &mut Changeset,
    ) -> AppResult<bool> {
        let folder = self
            .store
            .find_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
        FolderPolicy::new(&ctx.permissions).update(&folder)?;

        if folder.is_trashed() {
            return Err(AppError::validation(format!(
                "Folder {folder_id} is in the trash"
            )));
        }
        if destination
            .path
            .as_ref()
            .is_some_and(|target| target.is_descendant_or_self(&folder.path))
        {
            return Err(AppError::invalid_field(
                "target",
                "Cannot move a folder into itself or one of its descendants",
            ));
        }
        if folder.parent_id == destination.id {
            return Ok(false);
        }

        assert_subtree_boundary(
            &ctx.permissions,
            folder.owner_id,
            Some(&folder.path),
            destination.path.as_ref(),
        )?;

        if self
            .store
            .folder_name_taken(folder.owner_id, destination.id, &folder.name, Some(folder.id))
            .await?
            || !claimed.insert((ResourceType::Folder, folder.owner_id, folder.name.clone()))
        {
            return Err(name_taken(&folder.name));
        }

        let new_path = MaterializedPath::compute(destination.path.as_ref(), folder.id);
        changeset
            .push(Mutation::MoveFolder {
                folder_id,
                parent_id: destination.id,
            })
            .record(NewSyncEvent::folder(
                ctx.user_id,
                SyncAction::Move,
                folder_id,
                json!({
                    "from": folder.parent_id,
                    "to": destination.id,
                    "old_path": folder.path,
                    "new_path": new_path,
                }),
            ));
        Ok(true)
    }
}
