//! File policy.

use treevault_core::result::AppResult;
use treevault_entity::file::File;
use treevault_entity::folder::MaterializedPath;
use treevault_entity::permission::SystemPermission;

use super::{denied, hidden};
use crate::context::PermissionContext;

/// Maps file actions onto permission context queries.
#[derive(Debug, Clone, Copy)]
pub struct FilePolicy<'a> {
    ctx: &'a PermissionContext,
}

impl<'a> FilePolicy<'a> {
    /// Creates a policy over the request's context.
    pub fn new(ctx: &'a PermissionContext) -> Self {
        Self { ctx }
    }

    /// Whether the user may see the file.
    pub fn can_view(&self, file: &File, folder_path: Option<&MaterializedPath>) -> bool {
        self.ctx.can_view_file(file, folder_path)
    }

    /// Whether the user may rename or move the file.
    pub fn can_update(&self, file: &File, folder_path: Option<&MaterializedPath>) -> bool {
        self.ctx.can_edit_file(file, folder_path)
    }

    /// Whether the user may move the file to the trash.
    pub fn can_delete(&self, file: &File, folder_path: Option<&MaterializedPath>) -> bool {
        self.ctx.has(SystemPermission::DeleteAny) || self.ctx.can_edit_file(file, folder_path)
    }

    /// Whether the user may restore the file from the trash.
    pub fn can_restore(&self, file: &File) -> bool {
        self.ctx.has(SystemPermission::RestoreAny) || self.ctx.owns(file.owner_id)
    }

    /// Whether the user may hard-delete the file.
    pub fn can_force_delete(&self, file: &File) -> bool {
        self.ctx.has(SystemPermission::ForceDeleteAny) || self.ctx.owns(file.owner_id)
    }

    /// Require view access.
    pub fn view(&self, file: &File, folder_path: Option<&MaterializedPath>) -> AppResult<()> {
        if self.can_view(file, folder_path) {
            Ok(())
        } else {
            Err(hidden("File", file.id))
        }
    }

    /// Require edit access.
    pub fn update(&self, file: &File, folder_path: Option<&MaterializedPath>) -> AppResult<()> {
        self.view(file, folder_path)?;
        if self.can_update(file, folder_path) {
            Ok(())
        } else {
            Err(denied("modify", "file", file.id))
        }
    }

    /// Require permission to trash the file.
    pub fn delete(&self, file: &File, folder_path: Option<&MaterializedPath>) -> AppResult<()> {
        if self.can_delete(file, folder_path) {
            return Ok(());
        }
        self.view(file, folder_path)?;
        Err(denied("delete", "file", file.id))
    }

    /// Require permission to restore the file.
    pub fn restore(&self, file: &File) -> AppResult<()> {
        if self.can_restore(file) {
            Ok(())
        } else {
            Err(hidden("File", file.id))
        }
    }

    /// Require permission to hard-delete the file.
    pub fn force_delete(&self, file: &File) -> AppResult<()> {
        if self.can_force_delete(file) {
            Ok(())
        } else {
            Err(hidden("File", file.id))
        }
    }
}
