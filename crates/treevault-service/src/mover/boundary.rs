//! Subtree boundary for shared editors.
//!
//! Someone who can edit another user's content only through a folder share
//! must keep that content inside the shared subtree. Otherwise an editor
//! could pull files out of the owner's tree into a place the owner never
//! shared.

use treevault_auth::PermissionContext;
use treevault_core::AppError;
use treevault_core::result::AppResult;
use treevault_core::types::UserId;
use treevault_entity::folder::MaterializedPath;
use treevault_entity::permission::SystemPermission;

/// Check that moving an item owned by `owner_id` from `source_path` into
/// `target_path` stays inside the subtree the user was granted.
///
/// `source_path` is the folder's own path for a folder and the containing
/// folder's path for a file (None at the root). `target_path` is None for
/// a move to the root.
pub fn assert_subtree_boundary(
    ctx: &PermissionContext,
    owner_id: UserId,
    source_path: Option<&MaterializedPath>,
    target_path: Option<&MaterializedPath>,
) -> AppResult<()> {
    if ctx.owns(owner_id) || ctx.has(SystemPermission::EditAny) {
        return Ok(());
    }

    let Some(target_path) = target_path else {
        return Err(AppError::forbidden(
            "Only the owner can move items to the root",
        ));
    };

    let Some(root) = source_path.and_then(|p| ctx.edit_subtree_root(p)) else {
        return Err(AppError::forbidden(
            "Moving requires edit access through a shared folder",
        ));
    };

    if !target_path.is_descendant_or_self(&root.path) {
        return Err(AppError::forbidden(format!(
            "Target is outside the shared folder {}",
            root.folder_id
        )));
    }

    Ok(())
}
