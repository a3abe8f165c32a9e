//! The permission context consulted by every authorization check of a request.
//!
//! Resolution order for a file or folder, first match wins:
//! 1. System permission: `view-any` / `edit-any` (`edit-any` implies view).
//! 2. Ownership.
//! 3. A direct share on the exact resource at or above the requested level.
//! 4. A folder share whose folder contains the resource, at or above the
//!    requested level.
//! 5. Deny.
//!
//! The context is built once and performs no I/O afterwards.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use treevault_core::types::{FileId, UserId};
use treevault_entity::file::File;
use treevault_entity::folder::{Folder, MaterializedPath};
use treevault_entity::permission::SystemPermission;
use treevault_entity::share::{FileShareGrant, FolderShareGrant, SharePermission};

/// Which rule granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSource {
    /// A role-granted system permission.
    System,
    /// The user owns the resource.
    Owner,
    /// A share on the resource itself.
    DirectShare,
    /// A share on a folder above the resource.
    InheritedShare,
}

/// Immutable snapshot of what one user may do.
#[derive(Debug, Clone)]
pub struct PermissionContext {
    user_id: UserId,
    slugs: HashSet<String>,
    file_shares: HashMap<FileId, SharePermission>,
    folder_shares: Vec<FolderShareGrant>,
}

impl PermissionContext {
    /// Assemble a context from the three loaded data sets.
    ///
    /// Several grants on the same file collapse to the most permissive one.
    pub fn new(
        user_id: UserId,
        slugs: HashSet<String>,
        file_grants: Vec<FileShareGrant>,
        folder_grants: Vec<FolderShareGrant>,
    ) -> Self {
        let mut file_shares: HashMap<FileId, SharePermission> = HashMap::new();
        for grant in file_grants {
            file_shares
                .entry(grant.file_id)
                .and_modify(|p| *p = (*p).max(grant.permission))
                .or_insert(grant.permission);
        }
        Self {
            user_id,
            slugs,
            file_shares,
            folder_shares: folder_grants,
        }
    }

    /// A context with no roles and no shares.
    pub fn empty(user_id: UserId) -> Self {
        Self::new(user_id, HashSet::new(), Vec::new(), Vec::new())
    }

    /// The user this context belongs to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Whether the user holds the permission slug through a role.
    pub fn has_permission(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    /// Typed form of [`has_permission`](Self::has_permission).
    pub fn has(&self, permission: SystemPermission) -> bool {
        self.has_permission(permission.as_str())
    }

    /// Whether the user owns a resource owned by `owner`.
    pub fn owns(&self, owner: UserId) -> bool {
        self.user_id == owner
    }

    /// Folder shares loaded for the user.
    pub fn folder_shares(&self) -> &[FolderShareGrant] {
        &self.folder_shares
    }

    /// Whether the user may see the file. `folder_path` is the path of the
    /// folder holding it (None for a file at the root).
    pub fn can_view_file(&self, file: &File, folder_path: Option<&MaterializedPath>) -> bool {
        self.file_access(file, folder_path, SharePermission::View)
            .is_some()
    }

    /// Whether the user may modify the file.
    pub fn can_edit_file(&self, file: &File, folder_path: Option<&MaterializedPath>) -> bool {
        self.file_access(file, folder_path, SharePermission::Edit)
            .is_some()
    }

    /// Whether the user may see the folder.
    pub fn can_view_folder(&self, folder: &Folder) -> bool {
        self.folder_access(folder, SharePermission::View).is_some()
    }

    /// Whether the user may modify the folder and its content.
    pub fn can_edit_folder(&self, folder: &Folder) -> bool {
        self.folder_access(folder, SharePermission::Edit).is_some()
    }

    /// Why the user may access the file at `required`, if they may.
    pub fn file_access(
        &self,
        file: &File,
        folder_path: Option<&MaterializedPath>,
        required: SharePermission,
    ) -> Option<AccessSource> {
        if self.system_grants(required) {
            return Some(AccessSource::System);
        }
        if self.owns(file.owner_id) {
            return Some(AccessSource::Owner);
        }
        if self
            .file_shares
            .get(&file.id)
            .is_some_and(|p| p.satisfies(required))
        {
            return Some(AccessSource::DirectShare);
        }
        let path = folder_path?;
        self.best_share(|grant| path.is_descendant_or_self(&grant.path))
            .filter(|p| p.satisfies(required))
            .map(|_| AccessSource::InheritedShare)
    }

    /// Why the user may access the folder at `required`, if they may.
    pub fn folder_access(
        &self,
        folder: &Folder,
        required: SharePermission,
    ) -> Option<AccessSource> {
        if self.system_grants(required) {
            return Some(AccessSource::System);
        }
        if self.owns(folder.owner_id) {
            return Some(AccessSource::Owner);
        }
        if self
            .best_share(|grant| grant.folder_id == folder.id)
            .is_some_and(|p| p.satisfies(required))
        {
            return Some(AccessSource::DirectShare);
        }
        self.best_share(|grant| folder.path.is_strict_descendant_of(&grant.path))
            .filter(|p| p.satisfies(required))
            .map(|_| AccessSource::InheritedShare)
    }

    /// The highest folder granting the user `edit` that contains `path`.
    ///
    /// Non-owners may only move resources within this subtree.
    pub fn edit_subtree_root(&self, path: &MaterializedPath) -> Option<&FolderShareGrant> {
        self.folder_shares
            .iter()
            .filter(|g| g.permission == SharePermission::Edit)
            .filter(|g| path.is_descendant_or_self(&g.path))
            .min_by_key(|g| g.path.depth())
    }

    fn system_grants(&self, required: SharePermission) -> bool {
        match required {
            SharePermission::View => {
                self.has(SystemPermission::ViewAny) || self.has(SystemPermission::EditAny)
            }
            SharePermission::Edit => self.has(SystemPermission::EditAny),
        }
    }

    /// Most permissive matching folder share. Stops at the first `edit`.
    fn best_share(&self, matches: impl Fn(&FolderShareGrant) -> bool) -> Option<SharePermission> {
        let mut best = None;
        for grant in self.folder_shares.iter().filter(|g| matches(*g)) {
            if grant.permission == SharePermission::Edit {
                return Some(SharePermission::Edit);
            }
            best = Some(grant.permission);
        }
        best
    }
}
