//! Share grants as loaded into a permission context.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use treevault_core::types::{FileId, FolderId};

use super::permission::SharePermission;
use crate::folder::path::MaterializedPath;

/// A non-expired share on one file targeting the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileShareGrant {
    /// The shared file.
    pub file_id: FileId,
    /// Permission granted.
    pub permission: SharePermission,
}

/// A non-expired share on a folder targeting the requesting user, joined
/// with the folder's materialized path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderShareGrant {
    /// The shared folder.
    pub folder_id: FolderId,
    /// Path of the shared folder.
    pub path: MaterializedPath,
    /// Permission granted.
    pub permission: SharePermission,
}

impl<'r> FromRow<'r, PgRow> for FolderShareGrant {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let raw_path: String = row.try_get("path")?;
        let path = MaterializedPath::parse(&raw_path).map_err(|e| sqlx::Error::ColumnDecode {
            index: "path".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            folder_id: row.try_get("folder_id")?,
            path,
            permission: row.try_get("permission")?,
        })
    }
}
