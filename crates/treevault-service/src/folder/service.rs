//! Folder lifecycle operations with policy enforcement.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use treevault_auth::FolderPolicy;
use treevault_core::AppError;
use treevault_core::result::AppResult;
use treevault_core::types::FolderId;
use treevault_database::store::{Changeset, Mutation, TreeStore};
use treevault_entity::event::{NewSyncEvent, SyncAction};
use treevault_entity::folder::{Folder, NewFolder};

use crate::context::RequestContext;
use crate::naming::{name_taken, validate_name};

/// Creates, renames, and reads folders.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Tree store.
    store: Arc<dyn TreeStore>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Gets a folder the user may see.
    pub async fn get_folder(&self, ctx: &RequestContext, folder_id: FolderId) -> AppResult<Folder> {
        let folder = self.find(folder_id).await?;
        FolderPolicy::new(&ctx.permissions).view(&folder)?;
        Ok(folder)
    }

    /// Creates a folder under `parent_id`, or at the root when None.
    ///
    /// A folder created inside another folder belongs to that folder's
    /// owner, also when a share editor creates it. Root folders belong to
    /// the acting user.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        name: &str,
        parent_id: Option<FolderId>,
    ) -> AppResult<Folder> {
        let name = validate_name(name)?;

        let owner_id = match parent_id {
            Some(parent_id) => {
                let parent = self.find(parent_id).await?;
                FolderPolicy::new(&ctx.permissions).update(&parent)?;
                if parent.is_trashed() {
                    return Err(AppError::invalid_field(
                        "parent_id",
                        format!("Folder {parent_id} is in the trash"),
                    ));
                }
                parent.owner_id
            }
            None => ctx.user_id,
        };

        if self
            .store
            .folder_name_taken(owner_id, parent_id, &name, None)
            .await?
        {
            return Err(name_taken(&name));
        }

        let folder = self
            .store
            .create_folder(
                &NewFolder {
                    name,
                    parent_id,
                    owner_id,
                },
                ctx.user_id,
            )
            .await?;

        info!(
            user_id = %ctx.user_id,
            owner_id = %folder.owner_id,
            folder_id = %folder.id,
            path = %folder.path,
            "Folder created"
        );

        Ok(folder)
    }

    /// Renames a folder. Its path does not change.
    pub async fn rename_folder(
        &self,
        ctx: &RequestContext,
        folder_id: FolderId,
        new_name: &str,
    ) -> AppResult<Folder> {
        let folder = self.find(folder_id).await?;
        FolderPolicy::new(&ctx.permissions).update(&folder)?;
        if folder.is_trashed() {
            return Err(AppError::validation(format!(
                "Folder {folder_id} is in the trash"
            )));
        }

        let name = validate_name(new_name)?;
        if name == folder.name {
            debug!(folder_id = %folder_id, "Rename to the same name, nothing to do");
            return Ok(folder);
        }
        if self
            .store
            .folder_name_taken(folder.owner_id, folder.parent_id, &name, Some(folder.id))
            .await?
        {
            return Err(name_taken(&name));
        }

        let mut changeset = Changeset::new();
        changeset
            .push(Mutation::RenameFolder {
                folder_id,
                name: name.clone(),
            })
            .record(NewSyncEvent::folder(
                ctx.user_id,
                SyncAction::Rename,
                folder_id,
                json!({ "from": folder.name, "to": name }),
            ));
        self.store.apply(changeset).await?;

        info!(user_id = %ctx.user_id, folder_id = %folder_id, name = %name, "Folder renamed");

        self.find(folder_id).await
    }

    async fn find(&self, folder_id: FolderId) -> AppResult<Folder> {
        self.store
            .find_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }
}
