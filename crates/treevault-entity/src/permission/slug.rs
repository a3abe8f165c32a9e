//! Role-granted, system-wide permission slugs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A system-wide permission reachable through a user's roles.
///
/// Stored as slugs in the `permissions` table. Unknown slugs loaded from
/// the database are kept verbatim in the permission context; these are the
/// ones the tree core consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemPermission {
    /// See every file and folder.
    ViewAny,
    /// Edit and move every file and folder, without subtree bounds.
    EditAny,
    /// Trash any file or folder.
    DeleteAny,
    /// Restore any trashed file or folder.
    RestoreAny,
    /// Hard-delete any trashed file or folder.
    ForceDeleteAny,
    /// Create and manage shares on resources the user does not own.
    ShareAny,
}

impl SystemPermission {
    /// The stored slug.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewAny => "view-any",
            Self::EditAny => "edit-any",
            Self::DeleteAny => "delete-any",
            Self::RestoreAny => "restore-any",
            Self::ForceDeleteAny => "force-delete-any",
            Self::ShareAny => "share-any",
        }
    }
}

impl fmt::Display for SystemPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemPermission {
    type Err = treevault_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view-any" => Ok(Self::ViewAny),
            "edit-any" => Ok(Self::EditAny),
            "delete-any" => Ok(Self::DeleteAny),
            "restore-any" => Ok(Self::RestoreAny),
            "force-delete-any" => Ok(Self::ForceDeleteAny),
            "share-any" => Ok(Self::ShareAny),
            _ => Err(treevault_core::AppError::invalid_field(
                "permission",
                format!("Unknown permission slug: '{s}'"),
            )),
        }
    }
}
