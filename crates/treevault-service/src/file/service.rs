//! File lifecycle operations with policy enforcement.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use treevault_auth::{FilePolicy, FolderPolicy};
use treevault_core::AppError;
use treevault_core::result::AppResult;
use treevault_core::traits::QuotaLedger;
use treevault_core::types::{FileId, FolderId};
use treevault_database::store::{Changeset, Mutation, TreeStore};
use treevault_entity::event::{NewSyncEvent, SyncAction};
use treevault_entity::file::{File, NewFile};

use crate::context::RequestContext;
use crate::folder::PathTree;
use crate::naming::{name_taken, validate_name};

/// Registers uploaded files, renames them, and reads them.
#[derive(Debug, Clone)]
pub struct FileService {
    /// Tree store.
    store: Arc<dyn TreeStore>,
    /// Tree queries (folder paths for inherited shares).
    tree: PathTree,
    /// Per-user storage accounting.
    quota: Arc<dyn QuotaLedger>,
}

/// A completed upload to register in the tree.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterFileRequest {
    /// Destination folder (None for the root).
    pub folder_id: Option<FolderId>,
    /// File name.
    pub name: String,
    /// Size of the stored object in bytes.
    pub size_bytes: i64,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// Content address of the stored object.
    pub checksum: String,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(store: Arc<dyn TreeStore>, quota: Arc<dyn QuotaLedger>) -> Self {
        Self {
            tree: PathTree::new(Arc::clone(&store)),
            store,
            quota,
        }
    }

    /// Gets a file the user may see.
    pub async fn get_file(&self, ctx: &RequestContext, file_id: FileId) -> AppResult<File> {
        let file = self.find(file_id).await?;
        let folder_path = self.tree.folder_path_of(&file).await?;
        FilePolicy::new(&ctx.permissions).view(&file, folder_path.as_ref())?;
        Ok(file)
    }

    /// Records a finished upload and charges its size to the owner's quota.
    ///
    /// The file belongs to the owner of its folder (the acting user at the
    /// root), so uploads through a share count against the sharer.
    pub async fn register_file(
        &self,
        ctx: &RequestContext,
        req: RegisterFileRequest,
    ) -> AppResult<File> {
        let name = validate_name(&req.name)?;
        if req.size_bytes < 0 {
            return Err(AppError::invalid_field(
                "size_bytes",
                "File size cannot be negative",
            ));
        }
        if req.checksum.trim().is_empty() {
            return Err(AppError::invalid_field("checksum", "Checksum is required"));
        }

        let owner_id = match req.folder_id {
            Some(folder_id) => {
                let folder = self
                    .store
                    .find_folder(folder_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
                FolderPolicy::new(&ctx.permissions).update(&folder)?;
                if folder.is_trashed() {
                    return Err(AppError::invalid_field(
                        "folder_id",
                        format!("Folder {folder_id} is in the trash"),
                    ));
                }
                folder.owner_id
            }
            None => ctx.user_id,
        };

        if self
            .store
            .file_name_taken(owner_id, req.folder_id, &name, None)
            .await?
        {
            return Err(name_taken(&name));
        }

        let file = self
            .store
            .create_file(
                &NewFile {
                    folder_id: req.folder_id,
                    name,
                    owner_id,
                    size_bytes: req.size_bytes,
                    mime_type: req.mime_type,
                    checksum: req.checksum,
                },
                ctx.user_id,
            )
            .await?;

        // The row is committed; a ledger failure must not hide it.
        if let Err(e) = self.quota.increment(file.owner_id, file.size_bytes).await {
            warn!(
                user_id = %file.owner_id,
                file_id = %file.id,
                bytes = file.size_bytes,
                error = %e,
                "Failed to charge quota for new file"
            );
        }

        info!(
            user_id = %ctx.user_id,
            owner_id = %file.owner_id,
            file_id = %file.id,
            folder_id = ?file.folder_id,
            size = file.size_bytes,
            "File registered"
        );

        Ok(file)
    }

    /// Renames a file and bumps its version.
    pub async fn rename_file(
        &self,
        ctx: &RequestContext,
        file_id: FileId,
        new_name: &str,
    ) -> AppResult<File> {
        let file = self.find(file_id).await?;
        let folder_path = self.tree.folder_path_of(&file).await?;
        FilePolicy::new(&ctx.permissions).update(&file, folder_path.as_ref())?;
        if file.is_trashed() {
            return Err(AppError::validation(format!("File {file_id} is in the trash")));
        }

        let name = validate_name(new_name)?;
        if name == file.name {
            debug!(file_id = %file_id, "Rename to the same name, nothing to do");
            return Ok(file);
        }
        if self
            .store
            .file_name_taken(file.owner_id, file.folder_id, &name, Some(file.id))
            .await?
        {
            return Err(name_taken(&name));
        }

        let mut changeset = Changeset::new();
        changeset
            .push(Mutation::RenameFile {
                file_id,
                name: name.clone(),
            })
            .record(NewSyncEvent::file(
                ctx.user_id,
                SyncAction::Rename,
                file_id,
                json!({ "from": file.name, "to": name, "version": file.version + 1 }),
            ));
        self.store.apply(changeset).await?;

        info!(user_id = %ctx.user_id, file_id = %file_id, name = %name, "File renamed");

        self.find(file_id).await
    }

    async fn find(&self, file_id: FileId) -> AppResult<File> {
        self.store
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }
}
