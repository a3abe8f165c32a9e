//! Folder policy.

use treevault_core::result::AppResult;
use treevault_entity::folder::Folder;
use treevault_entity::permission::SystemPermission;

use super::{denied, hidden};
use crate::context::PermissionContext;

/// Maps folder actions onto permission context queries.
#[derive(Debug, Clone, Copy)]
pub struct FolderPolicy<'a> {
    ctx: &'a PermissionContext,
}

impl<'a> FolderPolicy<'a> {
    /// Creates a policy over the request's context.
    pub fn new(ctx: &'a PermissionContext) -> Self {
        Self { ctx }
    }

    /// Whether the user may see the folder.
    pub fn can_view(&self, folder: &Folder) -> bool {
        self.ctx.can_view_folder(folder)
    }

    /// Whether the user may rename, move, or add content to the folder.
    pub fn can_update(&self, folder: &Folder) -> bool {
        self.ctx.can_edit_folder(folder)
    }

    /// Whether the user may move the folder to the trash.
    pub fn can_delete(&self, folder: &Folder) -> bool {
        self.ctx.has(SystemPermission::DeleteAny) || self.ctx.can_edit_folder(folder)
    }

    /// Whether the user may restore the folder.
    pub fn can_restore(&self, folder: &Folder) -> bool {
        self.ctx.has(SystemPermission::RestoreAny) || self.ctx.owns(folder.owner_id)
    }

    /// Whether the user may hard-delete the folder.
    pub fn can_force_delete(&self, folder: &Folder) -> bool {
        self.ctx.has(SystemPermission::ForceDeleteAny) || self.ctx.owns(folder.owner_id)
    }

    /// Require view access.
    pub fn view(&self, folder: &Folder) -> AppResult<()> {
        if self.can_view(folder) {
            Ok(())
        } else {
            Err(hidden("Folder", folder.id))
        }
    }

    /// Require edit access.
    pub fn update(&self, folder: &Folder) -> AppResult<()> {
        self.view(folder)?;
        if self.can_update(folder) {
            Ok(())
        } else {
            Err(denied("modify", "folder", folder.id))
        }
    }

    /// Require permission to trash the folder.
    pub fn delete(&self, folder: &Folder) -> AppResult<()> {
        if self.can_delete(folder) {
            return Ok(());
        }
        self.view(folder)?;
        Err(denied("delete", "folder", folder.id))
    }

    /// Require permission to restore the folder.
    pub fn restore(&self, folder: &Folder) -> AppResult<()> {
        if self.can_restore(folder) {
            Ok(())
        } else {
            Err(hidden("Folder", folder.id))
        }
    }

    /// Require permission to hard-delete the folder.
    pub fn force_delete(&self, folder: &Folder) -> AppResult<()> {
        if self.can_force_delete(folder) {
            Ok(())
        } else {
            Err(hidden("Folder", folder.id))
        }
    }
}
